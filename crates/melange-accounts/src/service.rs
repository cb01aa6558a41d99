//! Accounts service implementation.

use crate::{errors::*, traits::Accounts, types::*, validation::validate_create_user};
use async_trait::async_trait;
use melange_crypto::{
    current_timestamp, generate_salt, hash_for_log, hash_password, verify_password,
};
use melange_storage::{BatchExt, Storage, StorageError, CF_USERS, CF_USERS_BY_USERNAME};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Well-formed hash verified against when the username is unknown, so both
/// failure paths cost one Argon2 verification
const DUMMY_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=65536,t=3,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Accounts service backed by [`Storage`]
pub struct AccountService<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> AccountService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: Storage + 'static> Accounts for AccountService<S> {
    async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        validate_create_user(&request)?;

        // Fast path only; the conditional commit below decides races
        if self
            .storage
            .exists(CF_USERS_BY_USERNAME, &request.username)
            .await?
        {
            return Err(AccountError::UsernameTaken);
        }

        let salt = generate_salt();
        let password_hash = hash_password(request.password.as_bytes(), &salt)
            .map_err(|e| AccountError::PasswordHash(e.to_string()))?;

        let user = User {
            user_id: Uuid::new_v4(),
            username: request.username,
            name: request.name,
            password_hash,
            created_at: current_timestamp(),
        };

        let mut batch = self.storage.batch();
        batch.require_absent(CF_USERS_BY_USERNAME, &user.username)?;
        batch.put(CF_USERS, &user.user_id, &user)?;
        batch.put(CF_USERS_BY_USERNAME, &user.username, &user.user_id)?;
        batch.commit().await.map_err(|e| match e {
            StorageError::Conflict { .. } => AccountError::UsernameTaken,
            other => AccountError::Storage(other),
        })?;

        info!(
            user_id = %user.user_id,
            username = %hash_for_log(&user.username),
            "User created"
        );
        Ok(user)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let user_id: Option<Uuid> = self.storage.get(CF_USERS_BY_USERNAME, &username).await?;
        let user: Option<User> = match user_id {
            Some(user_id) => self.storage.get(CF_USERS, &user_id).await?,
            None => None,
        };

        let Some(user) = user else {
            let _ = verify_password(password.as_bytes(), DUMMY_PASSWORD_HASH);
            warn!(username = %hash_for_log(username), "Login for unknown user");
            return Err(AccountError::AuthenticationFailed);
        };

        if verify_password(password.as_bytes(), &user.password_hash).is_err() {
            warn!(user_id = %user.user_id, "Login with wrong password");
            return Err(AccountError::AuthenticationFailed);
        }

        info!(user_id = %user.user_id, "User authenticated");
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.storage.get(CF_USERS, &user_id).await?)
    }
}
