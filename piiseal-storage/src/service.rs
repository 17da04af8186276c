//! Per-entity services that keep PII encrypted at rest.
//!
//! Every write goes through [`encrypt_pii_fields`] before it reaches the
//! store; every read goes through [`decrypt_pii_fields`] before it reaches
//! the caller.

use crate::entities::{PiiEntity, ReviewerProfile, SpeakerProfile, User};
use crate::error::{StorageError, StorageResult};
use crate::store::RecordStore;
use chrono::Utc;
use piiseal_crypto::{
    DecryptPolicy, FieldEncryptor, PiiField, Record, decrypt_pii_fields, encrypt_pii_fields,
    reencrypt_pii_fields,
};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ID: &str = "id";
const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";

pub type UserService = PiiService<User>;
pub type SpeakerProfileService = PiiService<SpeakerProfile>;
pub type ReviewerProfileService = PiiService<ReviewerProfile>;

/// Outcome of [`PiiService::rotate_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationReport {
    /// Records read from the collection.
    pub scanned: usize,
    /// Records written back.
    pub records: usize,
    /// PII fields re-encrypted across all records.
    pub fields: usize,
    /// Ids of records that could not be re-encrypted.
    pub failed: Vec<String>,
    /// Records skipped because they carry no string id.
    pub unidentified: usize,
}

/// CRUD over one entity collection with transparent PII encryption.
pub struct PiiService<E: PiiEntity> {
    store: Arc<dyn RecordStore>,
    encryptor: Arc<dyn FieldEncryptor>,
    policy: DecryptPolicy,
    _entity: PhantomData<fn() -> E>,
}

impl<E: PiiEntity> Clone for PiiService<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            encryptor: Arc::clone(&self.encryptor),
            policy: self.policy,
            _entity: PhantomData,
        }
    }
}

impl<E: PiiEntity> PiiService<E> {
    /// Creates a service with the best-effort decryption policy.
    pub fn new(store: Arc<dyn RecordStore>, encryptor: Arc<dyn FieldEncryptor>) -> Self {
        Self {
            store,
            encryptor,
            policy: DecryptPolicy::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_policy(mut self, policy: DecryptPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DecryptPolicy {
        self.policy
    }

    /// Stores a new record. An `id` is assigned when the record has none.
    pub fn create(&self, mut record: Record) -> StorageResult<Record> {
        let id = match record.get(ID) {
            None | Some(Value::Null) => uuid::Uuid::now_v7().to_string(),
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(other) => {
                return Err(StorageError::InvalidRecord(format!(
                    "{}: id must be a non-empty string, got {other}",
                    E::COLLECTION
                )));
            }
        };
        if self.store.get(E::COLLECTION, &id)?.is_some() {
            return Err(StorageError::AlreadyExists {
                collection: E::COLLECTION.to_string(),
                id,
            });
        }

        let now = Value::String(Utc::now().to_rfc3339());
        record.insert(ID.to_string(), Value::String(id.clone()));
        record.insert(CREATED_AT.to_string(), now.clone());
        record.insert(UPDATED_AT.to_string(), now);

        let stored = self.write(&id, record)?;
        debug!("created {}/{id}", E::COLLECTION);
        self.read(stored)
    }

    /// Merges `patch` into an existing record.
    ///
    /// Untouched PII fields keep their stored ciphertext.
    pub fn update(&self, id: &str, patch: Record) -> StorageResult<Record> {
        let mut record = self
            .store
            .get(E::COLLECTION, id)?
            .ok_or_else(|| StorageError::NotFound {
                collection: E::COLLECTION.to_string(),
                id: id.to_string(),
            })?;

        for (key, value) in patch {
            if key == ID || key == CREATED_AT {
                continue;
            }
            record.insert(key, value);
        }
        record.insert(UPDATED_AT.to_string(), Value::String(Utc::now().to_rfc3339()));

        let stored = self.write(id, record)?;
        debug!("updated {}/{id}", E::COLLECTION);
        self.read(stored)
    }

    /// Updates the record when it exists, otherwise creates it under `id`.
    pub fn upsert(&self, id: &str, mut record: Record) -> StorageResult<Record> {
        if self.store.get(E::COLLECTION, id)?.is_some() {
            return self.update(id, record);
        }
        record.insert(ID.to_string(), Value::String(id.to_string()));
        self.create(record)
    }

    pub fn find_by_id(&self, id: &str) -> StorageResult<Option<Record>> {
        self.store
            .get(E::COLLECTION, id)?
            .map(|record| self.read(record))
            .transpose()
    }

    pub fn find_all(&self) -> StorageResult<Vec<Record>> {
        self.store
            .list(E::COLLECTION)?
            .into_iter()
            .map(|record| self.read(record))
            .collect()
    }

    /// Records whose `field` equals `value`.
    ///
    /// Only non-PII fields can be matched: stored PII is ciphertext with a
    /// random salt, so equal plaintexts never compare equal.
    pub fn find_where(&self, field: &str, value: &Value) -> StorageResult<Vec<Record>> {
        if E::Field::ALL.iter().any(|f| f.name() == field) {
            return Err(StorageError::InvalidRecord(format!(
                "{}: PII field {field} cannot be queried",
                E::COLLECTION
            )));
        }
        self.store
            .list(E::COLLECTION)?
            .into_iter()
            .filter(|record| record.get(field) == Some(value))
            .map(|record| self.read(record))
            .collect()
    }

    pub fn delete(&self, id: &str) -> StorageResult<bool> {
        let deleted = self.store.delete(E::COLLECTION, id)?;
        if deleted {
            debug!("deleted {}/{id}", E::COLLECTION);
        }
        Ok(deleted)
    }

    /// Brings every PII field of the collection under the current key.
    ///
    /// Plaintext left over from a disabled period is encrypted as well.
    pub fn rotate_all(&self) -> StorageResult<RotationReport> {
        let mut report = RotationReport::default();
        for record in self.store.list(E::COLLECTION)? {
            report.scanned += 1;
            let id = match record_id(&record) {
                Ok(id) => id,
                Err(e) if self.policy == DecryptPolicy::BestEffort => {
                    warn!("{}: skipping record during rotation: {e}", E::COLLECTION);
                    report.unidentified += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let (rotated, changed) =
                match reencrypt_pii_fields(self.encryptor.as_ref(), record, E::Field::ALL) {
                    Ok(result) => result,
                    Err(e) if self.policy == DecryptPolicy::BestEffort => {
                        warn!("{}/{id}: rotation failed, record left as is: {e}", E::COLLECTION);
                        report.failed.push(id);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
            if changed > 0 {
                self.store.put(E::COLLECTION, &id, &rotated)?;
                report.records += 1;
                report.fields += changed;
            }
        }
        info!(
            "rotated {}: {} of {} records, {} fields, {} failed, {} without id",
            E::COLLECTION,
            report.records,
            report.scanned,
            report.fields,
            report.failed.len(),
            report.unidentified
        );
        Ok(report)
    }

    /// The record exactly as persisted, without decryption.
    pub fn raw(&self, id: &str) -> StorageResult<Option<Record>> {
        self.store.get(E::COLLECTION, id)
    }

    fn write(&self, id: &str, record: Record) -> StorageResult<Record> {
        let encrypted = encrypt_pii_fields(self.encryptor.as_ref(), record, E::Field::ALL)?;
        self.store.put(E::COLLECTION, id, &encrypted)?;
        Ok(encrypted)
    }

    fn read(&self, record: Record) -> StorageResult<Record> {
        Ok(decrypt_pii_fields(
            self.encryptor.as_ref(),
            record,
            E::Field::ALL,
            self.policy,
        )?)
    }
}

fn record_id(record: &Record) -> StorageResult<String> {
    match record.get(ID) {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(StorageError::InvalidRecord(
            "stored record has no string id".to_string(),
        )),
    }
}
