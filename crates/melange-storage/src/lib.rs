//! # melange-storage
//!
//! Storage abstraction layer for melange using RocksDB.
//!
//! Records are grouped in column families; keys and values are `bincode`
//! encoded. Multi-row writes go through [`Batch`] so they land atomically.

#![warn(clippy::all)]

pub mod column_families;
pub mod errors;
pub mod rocksdb_impl;
pub mod traits;

pub use column_families::*;
pub use errors::{Result, StorageError};
pub use rocksdb_impl::RocksDbStorage;
pub use traits::{Batch, BatchExt, Storage};
