//! RocksDB storage implementation.

use crate::{
    column_families::all_column_families,
    errors::{Result, StorageError},
    traits::{deserialize_value, serialize_key, serialize_value, Batch, Storage},
};
use async_trait::async_trait;
use rocksdb::{Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tempfile::TempDir;
use tracing::debug;

/// RocksDB storage implementation
pub struct RocksDbStorage {
    db: Arc<DB>,
    // Serializes batch commits so conditional batches check and write as one step
    commit_lock: Arc<Mutex<()>>,
    // Keeps a throwaway database directory alive for as long as the handle.
    _temp_dir: Option<TempDir>,
}

impl RocksDbStorage {
    /// Open RocksDB database at the specified path
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, &path, all_column_families())
            .map_err(|e| StorageError::Database(e.to_string()))?;

        debug!("Opened RocksDB at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
            _temp_dir: None,
        })
    }

    /// Open a database in a fresh temporary directory
    ///
    /// The directory is removed when the storage is dropped. Public for use in
    /// other crates' test modules.
    pub fn open_test() -> Result<Self> {
        let temp_dir = TempDir::new().map_err(|e| StorageError::Database(e.to_string()))?;
        let mut storage = Self::open(temp_dir.path())?;
        storage._temp_dir = Some(temp_dir);
        Ok(storage)
    }

    fn cf_handle(&self, cf: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))
    }
}

#[async_trait]
impl Storage for RocksDbStorage {
    async fn get<K, V>(&self, cf: &str, key: &K) -> Result<Option<V>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;

        let result = self
            .db
            .get_cf(cf_handle, &key_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        match result {
            Some(bytes) => Ok(Some(deserialize_value(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put<K, V>(&self, cf: &str, key: &K, value: &V) -> Result<()>
    where
        K: Serialize + Send + Sync,
        V: Serialize + Send + Sync,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;
        let value_bytes = serialize_value(value)?;

        self.db
            .put_cf(cf_handle, &key_bytes, &value_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(())
    }

    async fn exists<K>(&self, cf: &str, key: &K) -> Result<bool>
    where
        K: Serialize + Send + Sync,
    {
        let cf_handle = self.cf_handle(cf)?;
        let key_bytes = serialize_key(key)?;

        let result = self
            .db
            .get_pinned_cf(cf_handle, &key_bytes)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        Ok(result.is_some())
    }

    async fn get_by_prefix<K, V>(&self, cf: &str, prefix: &K) -> Result<Vec<(Vec<u8>, V)>>
    where
        K: Serialize + Send + Sync,
        V: DeserializeOwned,
    {
        let cf_handle = self.cf_handle(cf)?;
        let prefix_bytes = serialize_key(prefix)?;

        let mut results = Vec::new();

        // Seek to the prefix; works without a configured prefix extractor
        let iter = self.db.iterator_cf(
            cf_handle,
            rocksdb::IteratorMode::From(&prefix_bytes, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, value) = item.map_err(|e| StorageError::Database(e.to_string()))?;

            if !key.starts_with(&prefix_bytes) {
                // Keys are sorted, nothing further can match
                break;
            }
            results.push((key.to_vec(), deserialize_value(&value)?));
        }

        Ok(results)
    }

    fn batch(&self) -> Box<dyn Batch> {
        Box::new(RocksDbBatch {
            db: Arc::clone(&self.db),
            commit_lock: Arc::clone(&self.commit_lock),
            write_batch: WriteBatch::default(),
            absent: Vec::new(),
        })
    }
}

/// RocksDB batch implementation
pub struct RocksDbBatch {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
    write_batch: WriteBatch,
    /// (column family, key) pairs that must not exist at commit time
    absent: Vec<(String, Vec<u8>)>,
}

impl RocksDbBatch {
    fn check_absent(&self) -> Result<()> {
        for (cf, key) in &self.absent {
            let cf_handle = self
                .db
                .cf_handle(cf)
                .ok_or_else(|| StorageError::UnknownColumnFamily(cf.clone()))?;
            let existing = self
                .db
                .get_pinned_cf(cf_handle, key)
                .map_err(|e| StorageError::Database(e.to_string()))?;
            if existing.is_some() {
                return Err(StorageError::Conflict { cf: cf.clone() });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Batch for RocksDbBatch {
    fn put_raw(&mut self, cf: &str, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let cf_handle = self
            .db
            .cf_handle(cf)
            .ok_or_else(|| StorageError::UnknownColumnFamily(cf.to_string()))?;

        self.write_batch.put_cf(cf_handle, &key, &value);

        Ok(())
    }

    fn require_absent_raw(&mut self, cf: &str, key: Vec<u8>) -> Result<()> {
        if self.db.cf_handle(cf).is_none() {
            return Err(StorageError::UnknownColumnFamily(cf.to_string()));
        }
        self.absent.push((cf.to_string(), key));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let batch = *self;
        {
            let _guard = batch
                .commit_lock
                .lock()
                .map_err(|_| StorageError::Database("commit lock poisoned".to_string()))?;

            batch.check_absent()?;
            batch
                .db
                .write(batch.write_batch)
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }

        debug!("Batch committed successfully");
        Ok(())
    }

    fn rollback(self: Box<Self>) {
        debug!("Batch rolled back");
    }
}
