//! Abstract encryption interface for PII field values.
//!
//! Consumers (the field processor, entity services) depend on
//! `Arc<dyn FieldEncryptor>` and never see the operator secret.
//! [`FieldCipher`](crate::FieldCipher) implements this trait; when PII
//! encryption is switched off, [`PassthroughEncryptor`] stands in.

use crate::field_cipher::FieldCipher;
use crate::config::EncryptionConfig;
use crate::error::CryptoResult;
use std::sync::Arc;

/// Trait for encrypting/decrypting single string values.
pub trait FieldEncryptor: Send + Sync {
    /// Encrypt `plaintext` to its tagged text form. Empty input passes
    /// through unchanged.
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<String>;

    /// Decrypt a tagged value. Untagged values pass through unchanged.
    fn decrypt_string(&self, value: &str) -> CryptoResult<String>;

    /// Bring `value` under the current key: decrypt with any accepted key,
    /// encrypt with the current one. Plaintext is simply encrypted.
    fn reencrypt_string(&self, value: &str) -> CryptoResult<String>;

    /// Whether encryption is active. False means writes and reads are
    /// passthrough.
    fn is_available(&self) -> bool;

    /// Whether an operator secret is loaded (reported in diagnostics).
    fn key_configured(&self) -> bool;
}

/// No-op encryptor used while PII encryption is disabled.
/// Values pass through unchanged in both directions.
pub struct PassthroughEncryptor;

impl FieldEncryptor for PassthroughEncryptor {
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<String> {
        Ok(plaintext.to_string())
    }

    fn decrypt_string(&self, value: &str) -> CryptoResult<String> {
        Ok(value.to_string())
    }

    fn reencrypt_string(&self, value: &str) -> CryptoResult<String> {
        Ok(value.to_string())
    }

    fn is_available(&self) -> bool {
        false
    }

    fn key_configured(&self) -> bool {
        false
    }
}

/// Picks the encryptor matching the config's feature flag.
pub fn encryptor_from_config(config: &EncryptionConfig) -> CryptoResult<Arc<dyn FieldEncryptor>> {
    if !config.enabled {
        return Ok(Arc::new(PassthroughEncryptor));
    }
    Ok(Arc::new(FieldCipher::from_config(config)?))
}
