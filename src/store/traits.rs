use serde_json::{Map, Value};

use super::error::StoreError;

/// One stored product: attribute name to JSON value, insertion ordered
pub type Record = Map<String, Value>;

/// One page of a table scan
#[derive(Debug, Default)]
pub struct ScanPage {
    pub items: Vec<Record>,
    /// Key of the last record returned when more records remain
    pub last_evaluated_key: Option<String>,
}

/// `ProductStore` is the single-table key-value interface the accessors run against.
///
/// Records are keyed by their `productId` string attribute. Implementations own
/// durability and consistency for concurrent writers.
pub trait ProductStore: Send + Sync {
    /// Get a record by key. Returns None if the key does not exist.
    fn get(&self, product_id: &str) -> Result<Option<Record>, StoreError>;

    /// Scan up to `limit` records in key order, starting after `exclusive_start_key`.
    fn scan(
        &self,
        exclusive_start_key: Option<&str>,
        limit: usize,
    ) -> Result<ScanPage, StoreError>;

    /// Write a record, replacing any record with the same key.
    fn put(&self, record: &Record) -> Result<(), StoreError>;

    /// Set one attribute, creating the record when absent.
    /// Returns only the attributes that were written.
    fn update_attribute(
        &self,
        product_id: &str,
        name: &str,
        value: Value,
    ) -> Result<Record, StoreError>;

    /// Remove a record. Returns its prior state, if any.
    fn delete(&self, product_id: &str) -> Result<Option<Record>, StoreError>;
}
