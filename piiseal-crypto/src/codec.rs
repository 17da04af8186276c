//! Text encoding of symmetric envelopes.
//!
//! ```text
//! enc:v1:<b64 salt>:<b64 iv>:<b64 authTag>:<b64 ciphertext>
//! ```
//!
//! The colon is outside the base64 alphabet, so splitting is unambiguous.
//! Anything that does not start with [`ENCRYPTED_PREFIX`] is plaintext.

use crate::cipher::{EncryptedEnvelope, NONCE_SIZE, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{SALT_SIZE, Salt};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Version tag that marks a stored value as ciphertext.
pub const ENCRYPTED_PREFIX: &str = "enc:v1:";

const DELIMITER: char = ':';

/// Returns true iff `value` carries the encrypted-value tag.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Serializes an envelope to its tagged text form.
pub fn encode(envelope: &EncryptedEnvelope) -> String {
    format!(
        "{ENCRYPTED_PREFIX}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
        STANDARD.encode(envelope.salt.as_bytes()),
        STANDARD.encode(envelope.iv),
        STANDARD.encode(envelope.auth_tag),
        STANDARD.encode(&envelope.ciphertext),
    )
}

/// Parses a tagged string back into an envelope.
///
/// Fails with [`CryptoError::MalformedEnvelope`] unless the value is
/// tagged and splits into exactly four non-empty base64 components of
/// the expected sizes.
pub fn decode(value: &str) -> CryptoResult<EncryptedEnvelope> {
    let body = value
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or_else(|| CryptoError::MalformedEnvelope("missing enc:v1 prefix".to_string()))?;

    let parts: Vec<&str> = body.split(DELIMITER).collect();
    let [salt, iv, tag, ciphertext] = parts.as_slice() else {
        return Err(CryptoError::MalformedEnvelope(format!(
            "expected 4 components, found {}",
            parts.len()
        )));
    };
    if [salt, iv, tag, ciphertext].iter().any(|p| p.is_empty()) {
        return Err(CryptoError::MalformedEnvelope(
            "empty envelope component".to_string(),
        ));
    }

    Ok(EncryptedEnvelope {
        salt: Salt::from_bytes(decode_fixed::<SALT_SIZE>("salt", salt)?),
        iv: decode_fixed::<NONCE_SIZE>("iv", iv)?,
        auth_tag: decode_fixed::<TAG_SIZE>("authTag", tag)?,
        ciphertext: decode_component("ciphertext", ciphertext)?,
    })
}

pub(crate) fn decode_component(name: &str, encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::MalformedEnvelope(format!("{name}: {e}")))
}

pub(crate) fn decode_fixed<const N: usize>(name: &str, encoded: &str) -> CryptoResult<[u8; N]> {
    let bytes = decode_component(name, encoded)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::MalformedEnvelope(format!(
            "{name}: expected {N} bytes, got {}",
            bytes.len()
        ))
    })
}
