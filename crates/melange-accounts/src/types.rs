//! Account type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: u64,
}

/// Registration request
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub username: String,
    pub name: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
