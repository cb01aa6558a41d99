//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Error reported by RocksDB
    #[error("Database error: {0}")]
    Database(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    /// Stored bytes no longer match the record layout
    #[error("Failed to decode record: {0}")]
    Decode(String),

    /// A conditional batch found its key already present
    #[error("Key already present in {cf}")]
    Conflict { cf: String },

    #[error("Unknown column family: {0}")]
    UnknownColumnFamily(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;
