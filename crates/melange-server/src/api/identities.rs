use axum::{body::Bytes, extract::State, response::Json};
use melange_provisioning::IdentityPersistence;
use serde::Serialize;
use std::sync::Arc;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub error: bool,
}

#[derive(Debug, Serialize)]
pub struct AliasResponse {
    pub alias: String,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentIdentityResponse {
    pub address: String,
    pub nickname: String,
    pub server: String,
    pub server_fingerprint: String,
    pub aliases: Vec<AliasResponse>,
    pub created_at: u64,
}

/// Provision a new identity
///
/// The body is optional. Every failure answers with the same generic 500;
/// the failing state and cause are only logged.
pub async fn provision_identity(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ProvisionResponse>, ApiError> {
    state
        .provisioning
        .provision_from_body(&body)
        .await
        .map_err(|_| ApiError::ProvisioningFailed)?;

    Ok(Json(ProvisionResponse { error: false }))
}

/// Describe the active identity
pub async fn current_identity(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentIdentityResponse>, ApiError> {
    let persistence = state.provisioning.persistence();

    let address = persistence
        .active()
        .await?
        .ok_or_else(|| ApiError::NotFound("No active identity".to_string()))?;

    let stored = persistence
        .identity_by_address(&address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Identity {} not found", address)))?;

    let aliases = persistence
        .aliases_for(stored.handle)
        .await?
        .into_iter()
        .map(|alias| AliasResponse {
            alias: alias.alias,
            location: alias.location,
        })
        .collect();

    Ok(Json(CurrentIdentityResponse {
        address: stored.record.address,
        nickname: stored.record.nickname,
        server: stored.record.server_url,
        server_fingerprint: stored.record.server_fingerprint,
        aliases,
        created_at: stored.record.created_at,
    }))
}
