//! Record storage and per-entity PII services for piiseal.
//!
//! # Architecture
//!
//! - A [`RecordStore`] persists plain key-value records and knows nothing
//!   about encryption
//! - Each entity type ([`User`], [`SpeakerProfile`], [`ReviewerProfile`])
//!   declares its PII fields once
//! - A [`PiiService`] runs every write through the encrypt path and every
//!   read through the decrypt path, so callers only ever see plaintext and
//!   the store only ever sees ciphertext

mod entities;
mod error;
mod service;
mod store;

pub use entities::{
    PiiEntity, ReviewerProfile, ReviewerProfileField, SpeakerProfile, SpeakerProfileField, User,
    UserField,
};
pub use error::{StorageError, StorageResult};
pub use service::{
    PiiService, ReviewerProfileService, RotationReport, SpeakerProfileService, UserService,
};
pub use store::{DuckDbRecordStore, MemoryRecordStore, RecordStore};

/// Open a DuckDB connection with stale WAL recovery and resource limits.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. An unclean shutdown can leave
/// a WAL file behind that prevents reopening.
pub fn open_duckdb_with_wal_recovery(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<duckdb::Connection> {
    let conn = match duckdb::Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                tracing::warn!(
                    "DuckDB open failed, removing stale WAL and retrying: {}",
                    wal_path.display()
                );
                if std::fs::remove_file(&wal_path).is_ok() {
                    let c = duckdb::Connection::open(path)?;
                    apply_resource_limits(&c, memory_limit, threads)?;
                    return Ok(c);
                }
            }
            return Err(first_err.into());
        }
    };
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit}'; PRAGMA threads={threads};"
    ))?;
    Ok(())
}
