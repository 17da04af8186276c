use super::RecordStore;
use crate::error::{StorageError, StorageResult};
use piiseal_crypto::Record;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process record store, for tests and single-process tools.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<(String, String), Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Record>> {
        let records = self.records.read().map_err(|_| StorageError::Lock)?;
        Ok(records
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }

    fn put(&self, collection: &str, id: &str, record: &Record) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::Lock)?;
        records.insert((collection.to_string(), id.to_string()), record.clone());
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StorageResult<bool> {
        let mut records = self.records.write().map_err(|_| StorageError::Lock)?;
        Ok(records
            .remove(&(collection.to_string(), id.to_string()))
            .is_some())
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Record>> {
        let records = self.records.read().map_err(|_| StorageError::Lock)?;
        Ok(records
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|(_, record)| record.clone())
            .collect())
    }
}
