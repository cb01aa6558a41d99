//! Identity persistence on top of [`melange_storage::Storage`].

use crate::{errors::*, traits::IdentityPersistence, types::*};
use async_trait::async_trait;
use melange_crypto::{unwrap_identity_keys, wrap_identity_keys, Identity};
use melange_storage::{
    BatchExt, Storage, StorageError, CF_ALIASES, CF_ALIASES_BY_IDENTITY, CF_IDENTITIES,
    CF_IDENTITIES_BY_ADDRESS, CF_SETTINGS,
};
use std::sync::Arc;
use tracing::info;
use zeroize::Zeroizing;

/// Persists identities, aliases and the active pointer
///
/// Identity secret keys are stored wrapped under a key derived from the
/// service master key.
pub struct StoragePersistence<S: Storage> {
    storage: Arc<S>,
    service_master_key: Zeroizing<[u8; 32]>,
}

impl<S: Storage> StoragePersistence<S> {
    pub fn new(storage: Arc<S>, service_master_key: [u8; 32]) -> Self {
        Self {
            storage,
            service_master_key: Zeroizing::new(service_master_key),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

#[async_trait]
impl<S: Storage + 'static> IdentityPersistence for StoragePersistence<S> {
    async fn persist(&self, record: IdentityRecord, identity: Identity) -> Result<RecordHandle> {
        use PersistenceStage::IdentityInsert;

        if record.address != identity.address() {
            return Err(ProvisioningError::persistence(
                IdentityInsert,
                "record address does not match identity",
            ));
        }

        // Early refusal; the conditional commit below is what enforces insert-once
        let exists = self
            .storage
            .exists(CF_IDENTITIES_BY_ADDRESS, &record.address)
            .await
            .map_err(|e| ProvisioningError::persistence(IdentityInsert, e))?;
        if exists {
            return Err(ProvisioningError::persistence(
                IdentityInsert,
                format!("identity {} already persisted", record.address),
            ));
        }

        let wrapped_keys = wrap_identity_keys(&self.service_master_key, &identity)
            .map_err(|e| ProvisioningError::persistence(IdentityInsert, e))?;

        let handle = RecordHandle::new();
        let stored = StoredIdentity {
            handle,
            record,
            wrapped_keys,
        };

        let address = &stored.record.address;
        let insert_failed = |e: StorageError| match e {
            StorageError::Conflict { .. } => ProvisioningError::persistence(
                IdentityInsert,
                format!("identity {} already persisted", address),
            ),
            other => ProvisioningError::persistence(IdentityInsert, other),
        };

        let mut batch = self.storage.batch();
        batch
            .require_absent(CF_IDENTITIES_BY_ADDRESS, address)
            .map_err(insert_failed)?;
        batch
            .put(CF_IDENTITIES, &handle, &stored)
            .map_err(insert_failed)?;
        batch
            .put(CF_IDENTITIES_BY_ADDRESS, address, &handle)
            .map_err(insert_failed)?;
        batch.commit().await.map_err(insert_failed)?;

        info!(address = %stored.record.address, %handle, "Identity persisted");
        Ok(handle)
    }

    async fn persist_alias(&self, alias: AliasRecord) -> Result<RecordHandle> {
        use PersistenceStage::AliasInsert;

        let identity_exists = self
            .storage
            .exists(CF_IDENTITIES, &alias.identity_ref)
            .await
            .map_err(|e| ProvisioningError::persistence(AliasInsert, e))?;
        if !identity_exists {
            return Err(ProvisioningError::persistence(
                AliasInsert,
                format!("referenced identity {} is not persisted", alias.identity_ref),
            ));
        }

        let handle = RecordHandle::new();
        let index_key = (alias.identity_ref, handle);

        let insert_failed = |e: StorageError| ProvisioningError::persistence(AliasInsert, e);

        let mut batch = self.storage.batch();
        batch.put(CF_ALIASES, &handle, &alias).map_err(insert_failed)?;
        batch
            .put(CF_ALIASES_BY_IDENTITY, &index_key, &handle)
            .map_err(insert_failed)?;
        batch.commit().await.map_err(insert_failed)?;

        info!(identity = %alias.identity_ref, %handle, "Alias persisted");
        Ok(handle)
    }

    async fn set_active(&self, address: &str) -> Result<()> {
        self.storage
            .put(CF_SETTINGS, &ACTIVE_IDENTITY_KEY, &address)
            .await
            .map_err(|e| ProvisioningError::persistence(PersistenceStage::ActivePointerWrite, e))?;

        info!(%address, "Active identity set");
        Ok(())
    }

    async fn active(&self) -> Result<Option<String>> {
        Ok(self.storage.get(CF_SETTINGS, &ACTIVE_IDENTITY_KEY).await?)
    }

    async fn identity_by_address(&self, address: &str) -> Result<Option<StoredIdentity>> {
        let handle: Option<RecordHandle> =
            self.storage.get(CF_IDENTITIES_BY_ADDRESS, &address).await?;

        match handle {
            Some(handle) => Ok(self.storage.get(CF_IDENTITIES, &handle).await?),
            None => Ok(None),
        }
    }

    async fn aliases_for(&self, identity: RecordHandle) -> Result<Vec<AliasRecord>> {
        let index: Vec<(Vec<u8>, RecordHandle)> = self
            .storage
            .get_by_prefix(CF_ALIASES_BY_IDENTITY, &identity)
            .await?;

        let mut aliases = Vec::with_capacity(index.len());
        for (_, alias_handle) in index {
            if let Some(alias) = self.storage.get(CF_ALIASES, &alias_handle).await? {
                aliases.push(alias);
            }
        }

        Ok(aliases)
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Identity>> {
        let Some(stored) = self.identity_by_address(address).await? else {
            return Ok(None);
        };

        let identity =
            unwrap_identity_keys(&self.service_master_key, address, &stored.wrapped_keys)?;
        Ok(Some(identity))
    }
}
