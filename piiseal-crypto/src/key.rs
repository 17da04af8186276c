//! Operator secrets and PBKDF2 key derivation.
//!
//! Every symmetric encryption derives a fresh 256-bit key from the operator
//! secret and a random per-envelope salt. The derivation is deliberately
//! slow and is not cached: its cost is the price of resisting offline
//! guessing of the operator secret.

use crate::error::{CryptoError, CryptoResult};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of a derived key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of a per-envelope salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Minimum length, in characters, of an operator secret.
pub const MIN_SECRET_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 rounds used in production.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Operator-supplied secret that all PII keys are derived from.
///
/// Holds the primary secret with the optional federation license already
/// appended. The bytes are wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct OperatorSecret(Vec<u8>);

impl OperatorSecret {
    /// Validates `secret` and appends `license` as extra entropy.
    ///
    /// Fails with [`CryptoError::Configuration`] when the primary secret is
    /// shorter than [`MIN_SECRET_LEN`] characters. There is no weak-key
    /// fallback.
    pub fn new(secret: &str, license: Option<&str>) -> CryptoResult<Self> {
        let len = secret.chars().count();
        if len < MIN_SECRET_LEN {
            return Err(CryptoError::Configuration(format!(
                "operator secret must be at least {MIN_SECRET_LEN} characters (got {len})"
            )));
        }

        let mut material = Vec::with_capacity(secret.len() + license.map_or(0, str::len));
        material.extend_from_slice(secret.as_bytes());
        if let Some(license) = license.filter(|l| !l.is_empty()) {
            material.extend_from_slice(license.as_bytes());
        }
        Ok(Self(material))
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for OperatorSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperatorSecret(<redacted>)")
    }
}

/// Key derivation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    /// PBKDF2 round count.
    pub iterations: u32,
}

impl KdfParams {
    /// Parameters with a custom round count.
    ///
    /// Lower counts are only meant for tests and benchmarks; production
    /// deployments keep [`DEFAULT_ITERATIONS`].
    pub fn with_iterations(iterations: u32) -> CryptoResult<Self> {
        if iterations == 0 {
            return Err(CryptoError::Configuration(
                "KDF iteration count must be at least 1".to_string(),
            ));
        }
        Ok(Self { iterations })
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Random salt bound to a single envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A 256-bit symmetric key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derives a 32-byte key from the operator secret and a salt with
/// PBKDF2-HMAC-SHA256.
pub fn derive_key(secret: &OperatorSecret, salt: &Salt, params: &KdfParams) -> DerivedKey {
    let mut out = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), params.iterations, &mut *out);
    DerivedKey(*out)
}

/// Generates a random key that is never derived from a password.
///
/// Used for single-use hybrid envelope keys.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    OsRng.fill_bytes(&mut *bytes);
    DerivedKey(*bytes)
}
