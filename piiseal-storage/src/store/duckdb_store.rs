use super::RecordStore;
use crate::error::{StorageError, StorageResult};
use crate::open_duckdb_with_wal_recovery;
use duckdb::{Connection, params};
use piiseal_crypto::Record;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const DEFAULT_MEMORY_LIMIT: &str = "256MB";
const DEFAULT_THREADS: u32 = 2;

/// DuckDB-backed record store.
///
/// Records are kept as JSON text keyed by `(collection, id)`. PII fields
/// arrive here already in their `enc:v1:` form.
#[derive(Clone)]
pub struct DuckDbRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbRecordStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_duckdb_with_wal_recovery(path, DEFAULT_MEMORY_LIMIT, DEFAULT_THREADS)?;
        debug!("opened record store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Lock)
    }
}

fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            collection VARCHAR NOT NULL,
            id VARCHAR NOT NULL,
            data_json VARCHAR NOT NULL,
            PRIMARY KEY (collection, id)
        );
        "#,
    )?;
    Ok(())
}

impl RecordStore for DuckDbRecordStore {
    fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Record>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT data_json FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, collection: &str, id: &str, record: &Record) -> StorageResult<()> {
        let json = serde_json::to_string(record)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (collection, id, data_json) VALUES (?, ?, ?)",
            params![collection, id, json],
        )?;
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
            |row| row.get(0),
        )?;
        if existing == 0 {
            return Ok(false);
        }
        conn.execute(
            "DELETE FROM records WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;
        Ok(true)
    }

    fn list(&self, collection: &str) -> StorageResult<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT data_json FROM records WHERE collection = ? ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }
}
