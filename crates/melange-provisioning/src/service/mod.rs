//! Provisioning workflow.

use crate::{errors::*, state::ProvisioningState, traits::*, types::*};
use melange_crypto::{current_timestamp, hash_for_log};
use std::sync::Arc;
use tracing::{debug, error, info};

#[cfg(test)]
mod tests;

/// Decode a provisioning request body
///
/// An empty (or all whitespace) body is the empty request. Anything else must
/// be a JSON object; unknown fields are ignored.
pub fn decode_request(body: &[u8]) -> Result<ProvisioningRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProvisioningRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| ProvisioningError::Decoding(e.to_string()))
}

/// Drives one provisioning run through its fixed sequence of steps
pub struct ProvisioningService<K, D, R, T, P>
where
    K: KeyMaterialGenerator,
    D: DirectoryLookup,
    R: ServerRegistrar,
    T: TrackerRegistrar,
    P: IdentityPersistence,
{
    keys: Arc<K>,
    directory: Arc<D>,
    server_registrar: Arc<R>,
    tracker_registrar: Arc<T>,
    persistence: Arc<P>,
}

impl<K, D, R, T, P> ProvisioningService<K, D, R, T, P>
where
    K: KeyMaterialGenerator,
    D: DirectoryLookup,
    R: ServerRegistrar,
    T: TrackerRegistrar,
    P: IdentityPersistence,
{
    pub fn new(
        keys: Arc<K>,
        directory: Arc<D>,
        server_registrar: Arc<R>,
        tracker_registrar: Arc<T>,
        persistence: Arc<P>,
    ) -> Self {
        Self {
            keys,
            directory,
            server_registrar,
            tracker_registrar,
            persistence,
        }
    }

    pub fn persistence(&self) -> &Arc<P> {
        &self.persistence
    }

    /// Decode `body` and run the workflow on it
    pub async fn provision_from_body(
        &self,
        body: &[u8],
    ) -> std::result::Result<ProvisioningOutcome, ProvisioningFailure> {
        match decode_request(body) {
            Ok(request) => self.provision(request).await,
            Err(error) => Err(Self::failed(ProvisioningState::Start, error)),
        }
    }

    /// Run the workflow for an already decoded request
    pub async fn provision(
        &self,
        request: ProvisioningRequest,
    ) -> std::result::Result<ProvisioningOutcome, ProvisioningFailure> {
        info!(
            server = %request.server,
            tracker = %request.tracker,
            alias = %hash_for_log(&request.alias),
            "Provisioning identity"
        );

        let mut state = ProvisioningState::Start;
        match self.run(request, &mut state).await {
            Ok(outcome) => {
                info!(address = %outcome.address, "Identity provisioned");
                Ok(outcome)
            }
            Err(error) => Err(Self::failed(state, error)),
        }
    }

    fn failed(state: ProvisioningState, error: ProvisioningError) -> ProvisioningFailure {
        error!(%state, %error, "Provisioning failed");
        ProvisioningFailure { state, error }
    }

    async fn run(
        &self,
        request: ProvisioningRequest,
        state: &mut ProvisioningState,
    ) -> Result<ProvisioningOutcome> {
        let identity = self.keys.generate()?;
        advance(state);

        // Both references resolve before either remote is contacted
        let server = self
            .directory
            .resolve(EndpointKind::Server, &request.server)
            .await?;
        let tracker = self
            .directory
            .resolve(EndpointKind::Tracker, &request.tracker)
            .await?;

        self.server_registrar
            .register(&identity, &server, &request.attributes())
            .await?;
        advance(state);

        self.tracker_registrar
            .register_alias(&identity, std::slice::from_ref(&tracker.url), &request.alias)
            .await?;
        advance(state);

        let created_at = current_timestamp();
        let address = identity.address().to_string();
        let record = IdentityRecord {
            address: address.clone(),
            nickname: request.nickname,
            server_url: server.url,
            server_encryption_key: server.encryption_key,
            server_fingerprint: server.fingerprint,
            signing_public_key: identity.signing_public_key(),
            encryption_public_key: identity.encryption_public_key(),
            created_at,
        };

        let identity_handle = self.persistence.persist(record, identity).await?;
        advance(state);

        let alias = AliasRecord {
            identity_ref: identity_handle,
            location: tracker.url,
            alias: request.alias,
            created_at,
        };
        let alias_handle = self.persistence.persist_alias(alias).await?;
        advance(state);

        self.persistence.set_active(&address).await?;
        advance(state);

        advance(state);
        debug_assert!(state.is_complete());

        Ok(ProvisioningOutcome {
            address,
            identity_handle,
            alias_handle,
        })
    }
}

fn advance(state: &mut ProvisioningState) {
    if let Some(next) = state.next() {
        debug!(from = %state, to = %next, "Provisioning state transition");
        *state = next;
    }
}
