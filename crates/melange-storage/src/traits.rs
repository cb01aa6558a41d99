//! Storage trait definitions.

use crate::errors::{Result, StorageError};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Storage interface for key-value operations
///
/// Abstracts the underlying implementation (RocksDB) so services can be
/// tested against other backends.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family
    ///
    /// `Ok(Some(value))` if the key exists, `Ok(None)` if not found
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Put a key-value pair into a column family
    async fn put<K, V>(&self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync;

    /// Check if a key exists in a column family
    async fn exists<K>(&self, cf: &str, key: &K) -> Result<bool>
    where
        K: Serialize + Send + Sync;

    /// Get all values whose serialized key starts with the serialized prefix
    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned;

    /// Create a new batch for atomic multi-row writes
    fn batch(&self) -> Box<dyn Batch>;
}

/// Batch interface for atomic operations
///
/// Works with pre-serialized bytes to stay object safe; use [`BatchExt`] for
/// typed keys and values. Batches are used within a single task, so only
/// `Send` is required.
#[async_trait]
pub trait Batch: Send {
    /// Put a pre-serialized key-value pair in the batch
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Make the commit conditional on `key` being absent from `cf`
    fn require_absent_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()>;

    /// Commit the batch atomically
    ///
    /// Fails with [`StorageError::Conflict`] and writes nothing when a key
    /// registered with `require_absent_raw` is present. The check and the
    /// write are one step with respect to other commits on the same store.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Drop the batch without committing
    fn rollback(self: Box<Self>);
}

/// Type-safe helpers on top of [`Batch`]
pub trait BatchExt: Batch {
    /// Put a key-value pair in the batch
    fn put<K, V>(&mut self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize,
        V: Serialize,
    {
        let key_bytes = serialize_key(key)?;
        let value_bytes = serialize_value(value)?;
        self.put_raw(cf, key_bytes, value_bytes)
    }

    /// Insert-once guard: the commit fails if `key` already exists in `cf`
    fn require_absent<K: Serialize>(&mut self, cf: &str, key: &K) -> Result<()> {
        let key_bytes = serialize_key(key)?;
        self.require_absent_raw(cf, key_bytes)
    }
}

impl<T: Batch + ?Sized> BatchExt for T {}

/// Serialize a key with the storage encoding
pub fn serialize_key<K: Serialize>(key: &K) -> Result<Vec<u8>> {
    bincode::serialize(key).map_err(|e| StorageError::Encode(e.to_string()))
}

pub(crate) fn serialize_value<V: Serialize>(value: &V) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StorageError::Encode(e.to_string()))
}

pub(crate) fn deserialize_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Decode(e.to_string()))
}
