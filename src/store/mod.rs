//! Product storage module
//!
//! A single table of product records keyed by `productId`:
//! - `ProductStore` trait describing the storage collaborator
//! - `RedbStore` backed by an embedded redb file
//! - `MemoryStore` kept in process memory
//!
//! Both backends scan in key order and page with an exclusive start key.

mod error;
mod memory;
mod redb;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use self::redb::RedbStore;
pub use traits::{ProductStore, Record, ScanPage};

use crate::config::{StorageBackend, StorageConfig};
use std::path::Path;
use std::sync::Arc;

/// Attribute holding the record key
pub const KEY_ATTRIBUTE: &str = "productId";

/// Open the backend selected by configuration
pub fn open(config: &StorageConfig) -> Result<Arc<dyn ProductStore>, StoreError> {
    match config.backend {
        StorageBackend::Redb => {
            let store = RedbStore::open(Path::new(&config.path), &config.table)?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Extract the string key from a record
pub fn record_key(record: &Record) -> Option<&str> {
    record.get(KEY_ATTRIBUTE).and_then(serde_json::Value::as_str)
}
