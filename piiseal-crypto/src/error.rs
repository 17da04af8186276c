//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption layer.
///
/// The cipher and codec layers always surface these to the caller. Only the
/// PII field processor, under [`DecryptPolicy::BestEffort`], absorbs
/// per-field failures.
///
/// [`DecryptPolicy::BestEffort`]: crate::DecryptPolicy::BestEffort
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Operator secret missing or too short, or another invalid setting.
    #[error("encryption configuration error: {0}")]
    Configuration(String),

    /// PBKDF2 rejected its inputs.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The AEAD or RSA primitive failed while encrypting.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The GCM tag did not verify (tampering, corruption or wrong key).
    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailure,

    /// An encoded string or envelope does not have the expected structure.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// RSA-OAEP could not unwrap the symmetric key with the local private key.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// A public or private key could not be generated, parsed or encoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// JSON encoding of a wire artifact failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
