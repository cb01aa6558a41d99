//! Account error types.

use thiserror::Error;

/// Account errors
#[derive(Debug, Error)]
pub enum AccountError {
    /// Registration input rejected
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Username already registered
    #[error("Username already taken")]
    UsernameTaken,

    /// Unknown username or wrong password
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] melange_storage::StorageError),
}

/// Result type for account operations
pub type Result<T> = std::result::Result<T, AccountError>;
