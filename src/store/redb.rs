use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde_json::Value;

use super::error::StoreError;
use super::traits::{ProductStore, Record, ScanPage};
use super::{record_key, KEY_ATTRIBUTE};

/// `RedbStore` keeps the product table in an embedded redb database file.
///
/// Each record is stored as JSON text under its `productId`, so a range scan
/// yields records in key order and a key doubles as the continuation token.
pub struct RedbStore {
    db: Arc<Database>,
    table: String,
}

impl RedbStore {
    /// Open or create a redb database at the given path with the named table.
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Storage(e.to_string()))?;
            }
        }

        let db = Database::create(path).map_err(|e| StoreError::Storage(e.to_string()))?;
        let store = Self {
            db: Arc::new(db),
            table: table.to_string(),
        };

        // Ensure the table exists so read transactions can open it.
        let write_txn = store
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let _table = write_txn
                .open_table(store.definition())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(store)
    }

    fn definition(&self) -> TableDefinition<'_, &'static str, &'static str> {
        TableDefinition::new(&self.table)
    }
}

fn decode(text: &str) -> Result<Record, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn encode(record: &Record) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl ProductStore for RedbStore {
    fn get(&self, product_id: &str) -> Result<Option<Record>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(self.definition())
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        match table.get(product_id) {
            Ok(Some(val)) => decode(val.value()).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Storage(e.to_string())),
        }
    }

    fn scan(
        &self,
        exclusive_start_key: Option<&str>,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(self.definition())
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let iter = match exclusive_start_key {
            Some(start) => table.range(start..),
            None => table.iter(),
        }
        .map_err(|e| StoreError::Storage(e.to_string()))?;

        let limit = limit.max(1);
        let mut page = ScanPage::default();
        for entry in iter {
            let entry = entry.map_err(|e| StoreError::Storage(e.to_string()))?;
            let key = entry.0.value();
            if Some(key) == exclusive_start_key {
                continue;
            }
            if page.items.len() == limit {
                // At least one more record remains past this page.
                page.last_evaluated_key = page
                    .items
                    .last()
                    .and_then(record_key)
                    .map(ToString::to_string);
                break;
            }
            page.items.push(decode(entry.1.value())?);
        }

        Ok(page)
    }

    fn put(&self, record: &Record) -> Result<(), StoreError> {
        let key = record_key(record).ok_or(StoreError::MissingKey)?;
        let text = encode(record)?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            table
                .insert(key, text.as_str())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(())
    }

    fn update_attribute(
        &self,
        product_id: &str,
        name: &str,
        value: Value,
    ) -> Result<Record, StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(|e| StoreError::Storage(e.to_string()))?;

            let existing = table
                .get(product_id)
                .map_err(|e| StoreError::Storage(e.to_string()))?
                .map(|val| val.value().to_string());

            let mut record = match existing {
                Some(text) => decode(&text)?,
                None => {
                    let mut fresh = Record::new();
                    fresh.insert(KEY_ATTRIBUTE.to_string(), Value::from(product_id));
                    fresh
                }
            };
            record.insert(name.to_string(), value.clone());

            let text = encode(&record)?;
            table
                .insert(product_id, text.as_str())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let mut updated = Record::new();
        updated.insert(name.to_string(), value);
        Ok(updated)
    }

    fn delete(&self, product_id: &str) -> Result<Option<Record>, StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let prior = {
            let mut table = write_txn
                .open_table(self.definition())
                .map_err(|e| StoreError::Storage(e.to_string()))?;
            // The access guard borrows `table`, so copy the text out before it drops.
            let removed = table
                .remove(product_id)
                .map_err(|e| StoreError::Storage(e.to_string()))?
                .map(|val| val.value().to_string());
            removed
        };
        write_txn
            .commit()
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        prior.as_deref().map(decode).transpose()
    }
}
