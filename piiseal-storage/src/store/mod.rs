//! The record-store collaborator: "read a mapping, write a mapping".
//!
//! Services only ever hand the store records whose PII fields have already
//! been through the encrypt path, so no implementation needs to know about
//! encryption.

mod duckdb_store;
mod memory;

pub use duckdb_store::DuckDbRecordStore;
pub use memory::MemoryRecordStore;

use crate::error::StorageResult;
use piiseal_crypto::Record;

/// Key-value persistence of records, addressed by `(collection, id)`.
pub trait RecordStore: Send + Sync {
    /// Fetch one record.
    fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Record>>;

    /// Insert or replace a record.
    fn put(&self, collection: &str, id: &str, record: &Record) -> StorageResult<()>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, collection: &str, id: &str) -> StorageResult<bool>;

    /// All records of a collection, ordered by id.
    fn list(&self, collection: &str) -> StorageResult<Vec<Record>>;
}
