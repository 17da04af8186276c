//! PII field processing over key-value records.
//!
//! Each entity type declares its PII fields as a closed enum implementing
//! [`PiiField`], so a misspelt field name fails to compile instead of
//! silently skipping encryption.

use crate::codec::is_encrypted;
use crate::encryptor::FieldEncryptor;
use crate::error::CryptoResult;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A record as read from or written to the record store.
pub type Record = serde_json::Map<String, Value>;

/// Characters of a stored value included in decryption diagnostics.
const DIAGNOSTIC_PREFIX_LEN: usize = 16;

/// A PII field of some entity type.
pub trait PiiField: Copy + fmt::Debug + Send + Sync + 'static {
    /// Every field in the set, in declaration order.
    const ALL: &'static [Self];

    /// Key of the field in the record.
    fn name(self) -> &'static str;
}

/// What to do when a single PII field fails to decrypt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecryptPolicy {
    /// Log the failure and keep the stored (tagged) value.
    #[default]
    BestEffort,
    /// Abort with the first failure.
    FailClosed,
}

/// Encrypts every declared field holding a non-empty, not yet encrypted
/// string. Everything else passes through.
///
/// Idempotent: already-encrypted fields are left untouched, so applying it
/// twice gives the same record as applying it once.
pub fn encrypt_pii_fields<F: PiiField>(
    encryptor: &dyn FieldEncryptor,
    mut record: Record,
    fields: &[F],
) -> CryptoResult<Record> {
    if !encryptor.is_available() {
        return Ok(record);
    }
    for field in fields {
        let Some(Value::String(value)) = record.get_mut(field.name()) else {
            continue;
        };
        if value.is_empty() || is_encrypted(value) {
            continue;
        }
        *value = encryptor.encrypt_string(value)?;
    }
    Ok(record)
}

/// Decrypts every declared field that carries the encrypted tag.
///
/// Under [`DecryptPolicy::BestEffort`] a field that fails to decrypt keeps
/// its stored value and the failure is logged with the field name, a short
/// prefix of the stored value and whether a key is configured.
pub fn decrypt_pii_fields<F: PiiField>(
    encryptor: &dyn FieldEncryptor,
    mut record: Record,
    fields: &[F],
    policy: DecryptPolicy,
) -> CryptoResult<Record> {
    if !encryptor.is_available() {
        return Ok(record);
    }
    for field in fields {
        let Some(Value::String(value)) = record.get_mut(field.name()) else {
            continue;
        };
        if !is_encrypted(value) {
            continue;
        }
        match encryptor.decrypt_string(value) {
            Ok(plaintext) => *value = plaintext,
            Err(e) if policy == DecryptPolicy::BestEffort => {
                let prefix: String = value.chars().take(DIAGNOSTIC_PREFIX_LEN).collect();
                warn!(
                    field = field.name(),
                    value_prefix = %prefix,
                    key_configured = encryptor.key_configured(),
                    "failed to decrypt PII field, keeping stored value: {e}"
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(record)
}

/// Re-encrypts every declared string field under the encryptor's current
/// key. Returns the record and the number of fields that changed.
pub fn reencrypt_pii_fields<F: PiiField>(
    encryptor: &dyn FieldEncryptor,
    mut record: Record,
    fields: &[F],
) -> CryptoResult<(Record, usize)> {
    let mut changed = 0;
    if !encryptor.is_available() {
        return Ok((record, changed));
    }
    for field in fields {
        let Some(Value::String(value)) = record.get_mut(field.name()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let rotated = encryptor.reencrypt_string(value)?;
        if rotated != *value {
            *value = rotated;
            changed += 1;
        }
    }
    Ok((record, changed))
}
