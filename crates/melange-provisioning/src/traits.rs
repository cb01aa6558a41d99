//! Provisioning component traits.
//!
//! The workflow only talks to these seams, so each remote system and the store
//! can be swapped for a recording double in tests.

use crate::{errors::*, types::*};
use async_trait::async_trait;
use melange_crypto::Identity;

/// Produces fresh identities
pub trait KeyMaterialGenerator: Send + Sync {
    /// Generate a new identity with independent key material
    fn generate(&self) -> Result<Identity>;
}

/// Key generator backed by the OS CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsKeyGenerator;

impl KeyMaterialGenerator for OsKeyGenerator {
    fn generate(&self) -> Result<Identity> {
        Identity::generate().map_err(|e| ProvisioningError::KeyGeneration(e.to_string()))
    }
}

/// Resolves short server/tracker references to verified endpoints
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn resolve(&self, kind: EndpointKind, reference: &str) -> Result<EndpointDescriptor>;
}

/// Registration handshake with an application server
#[async_trait]
pub trait ServerRegistrar: Send + Sync {
    /// Register `identity` with `server`, sending `attributes`
    async fn register(
        &self,
        identity: &Identity,
        server: &EndpointDescriptor,
        attributes: &Attributes,
    ) -> Result<()>;
}

/// Alias registration with tracker services
#[async_trait]
pub trait TrackerRegistrar: Send + Sync {
    /// Claim `alias` for `identity` on each tracker in order
    ///
    /// The first failing tracker aborts the remaining ones.
    async fn register_alias(
        &self,
        identity: &Identity,
        trackers: &[String],
        alias: &str,
    ) -> Result<()>;
}

/// Durable store for provisioned identities
#[async_trait]
pub trait IdentityPersistence: Send + Sync {
    /// Insert the identity row; fails if the address is already persisted
    async fn persist(&self, record: IdentityRecord, identity: Identity) -> Result<RecordHandle>;

    /// Insert an alias row; fails unless `identity_ref` names a persisted identity
    async fn persist_alias(&self, alias: AliasRecord) -> Result<RecordHandle>;

    /// Point the active identity slot at `address`
    ///
    /// The slot holds one address and is overwritten unconditionally. When
    /// runs overlap, the last run to reach this step wins; no lock orders them.
    async fn set_active(&self, address: &str) -> Result<()>;

    /// Address of the active identity, if any
    async fn active(&self) -> Result<Option<String>>;

    async fn identity_by_address(&self, address: &str) -> Result<Option<StoredIdentity>>;

    async fn aliases_for(&self, identity: RecordHandle) -> Result<Vec<AliasRecord>>;

    /// Rebuild a persisted identity including its secret keys
    async fn load_identity(&self, address: &str) -> Result<Option<Identity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_generator_yields_independent_identities() {
        let generator = OsKeyGenerator;
        let a = generator.generate().unwrap();
        let b = generator.generate().unwrap();
        assert_ne!(a.address(), b.address());
        assert_ne!(a.encryption_public_key(), b.encryption_public_key());
    }
}
