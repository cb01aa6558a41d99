use axum::{extract::State, http::StatusCode, response::Json};
use melange_accounts::{Accounts, CreateUserRequest, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            name: user.name,
        }
    }
}

/// Register a local account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let user = state.accounts.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Password login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user = state
        .accounts
        .authenticate(&request.username, &request.password)
        .await?;
    Ok(Json(user.into()))
}
