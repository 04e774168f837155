use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use super::error::StoreError;
use super::traits::{ProductStore, Record, ScanPage};
use super::{record_key, KEY_ATTRIBUTE};

/// `MemoryStore` keeps the product table in a `BTreeMap`, so scans run in key order
/// exactly like the on-disk backend. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    table: RwLock<BTreeMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Record>>, StoreError> {
        self.table
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Record>>, StoreError> {
        self.table
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl ProductStore for MemoryStore {
    fn get(&self, product_id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.read()?.get(product_id).cloned())
    }

    fn scan(
        &self,
        exclusive_start_key: Option<&str>,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        let table = self.read()?;
        let lower = exclusive_start_key.map_or(Bound::Unbounded, Bound::Excluded);
        let mut iter = table.range::<str, _>((lower, Bound::Unbounded)).peekable();

        let mut page = ScanPage::default();
        while page.items.len() < limit.max(1) {
            match iter.next() {
                Some((_, record)) => page.items.push(record.clone()),
                None => break,
            }
        }
        if iter.peek().is_some() {
            page.last_evaluated_key = page
                .items
                .last()
                .and_then(record_key)
                .map(ToString::to_string);
        }
        Ok(page)
    }

    fn put(&self, record: &Record) -> Result<(), StoreError> {
        let key = record_key(record).ok_or(StoreError::MissingKey)?.to_string();
        self.write()?.insert(key, record.clone());
        Ok(())
    }

    fn update_attribute(
        &self,
        product_id: &str,
        name: &str,
        value: Value,
    ) -> Result<Record, StoreError> {
        let mut table = self.write()?;
        let record = table.entry(product_id.to_string()).or_insert_with(|| {
            let mut fresh = Record::new();
            fresh.insert(KEY_ATTRIBUTE.to_string(), Value::from(product_id));
            fresh
        });
        record.insert(name.to_string(), value.clone());

        let mut updated = Record::new();
        updated.insert(name.to_string(), value);
        Ok(updated)
    }

    fn delete(&self, product_id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.write()?.remove(product_id))
    }
}
