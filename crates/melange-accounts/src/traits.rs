//! Accounts trait definition.

use crate::{errors::Result, types::*};
use async_trait::async_trait;
use uuid::Uuid;

/// Local accounts subsystem
#[async_trait]
pub trait Accounts: Send + Sync {
    /// Register a new user
    async fn create_user(&self, request: CreateUserRequest) -> Result<User>;

    /// Check a username/password pair
    ///
    /// Unknown users and wrong passwords fail the same way.
    async fn authenticate(&self, username: &str, password: &str) -> Result<User>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;
}
