//! Cryptographic error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key material has wrong length: expected {expected} bytes, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Signature does not verify")]
    BadSignature,

    #[error("Sealing failed: {0}")]
    Seal(String),

    /// Authentication tag did not verify
    #[error("Opening sealed data failed: {0}")]
    Open(String),

    /// Unwrapped keys derive a different address than the one they were stored under
    #[error("Unwrapped key material does not belong to {address}")]
    KeyMismatch { address: String },

    #[error("System entropy unavailable: {0}")]
    Entropy(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Malformed password hash")]
    MalformedPasswordHash,

    #[error("Key derivation failed")]
    KeyDerivation,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
