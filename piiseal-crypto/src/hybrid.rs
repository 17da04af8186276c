//! Hybrid (RSA-OAEP + AES-256-GCM) envelopes for federation payloads.
//!
//! RSA-OAEP with SHA-256 can only carry about 190 bytes under a 2048-bit
//! modulus, so payloads are encrypted with a single-use random AES key and
//! only that key is RSA-encrypted for the recipient. The random key never
//! leaves this module in clear text.

use crate::cipher::{self, NONCE_SIZE, SealedData, TAG_SIZE};
use crate::codec::{decode_component, decode_fixed};
use crate::error::{CryptoError, CryptoResult};
use crate::field_cipher::FieldCipher;
use crate::key::{DerivedKey, KEY_SIZE, generate_random_key};
use crate::keypair::{load_private_key, parse_public_key};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Payload encrypted for the holder of an RSA public key.
///
/// This is the only artifact exchanged with a federated partner. All
/// components are standard base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridEnvelope {
    /// The single-use AES key, RSA-OAEP(SHA-256) encrypted.
    pub encrypted_key: String,
    pub iv: String,
    pub auth_tag: String,
    pub ciphertext: String,
}

impl HybridEnvelope {
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CryptoError::MalformedEnvelope(format!("hybrid envelope: {e}")))
    }
}

/// Encrypts `plaintext` for the holder of `recipient_public_key` (SPKI PEM).
pub fn hybrid_encrypt(plaintext: &str, recipient_public_key: &str) -> CryptoResult<HybridEnvelope> {
    let recipient = parse_public_key(recipient_public_key)?;

    let key = generate_random_key();
    let sealed = cipher::seal(&key, plaintext.as_bytes())?;
    let encrypted_key = recipient
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP key wrap failed: {e}")))?;

    Ok(HybridEnvelope {
        encrypted_key: STANDARD.encode(encrypted_key),
        iv: STANDARD.encode(sealed.iv),
        auth_tag: STANDARD.encode(sealed.auth_tag),
        ciphertext: STANDARD.encode(&sealed.ciphertext),
    })
}

/// Decrypts an envelope with the local (stored, encrypted) private key.
///
/// An RSA failure is [`CryptoError::KeyMismatch`]; a payload whose tag does
/// not verify is [`CryptoError::AuthenticationFailure`].
pub fn hybrid_decrypt(
    cipher: &FieldCipher,
    envelope: &HybridEnvelope,
    local_private_key: &str,
) -> CryptoResult<String> {
    let wrapped = decode_component("encryptedKey", &envelope.encrypted_key)?;
    let sealed = SealedData {
        iv: decode_fixed::<NONCE_SIZE>("iv", &envelope.iv)?,
        auth_tag: decode_fixed::<TAG_SIZE>("authTag", &envelope.auth_tag)?,
        ciphertext: decode_component("ciphertext", &envelope.ciphertext)?,
    };

    let private = load_private_key(cipher, local_private_key)?;
    let key_bytes = Zeroizing::new(
        private
            .decrypt(Oaep::new::<Sha256>(), &wrapped)
            .map_err(|e| CryptoError::KeyMismatch(format!("RSA-OAEP key unwrap failed: {e}")))?,
    );
    let key_array: [u8; KEY_SIZE] = key_bytes.as_slice().try_into().map_err(|_| {
        CryptoError::KeyMismatch(format!(
            "unwrapped key has {} bytes, expected {KEY_SIZE}",
            key_bytes.len()
        ))
    })?;
    let key = DerivedKey::from_bytes(key_array);

    let plaintext = cipher::open(&key, &sealed)?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::MalformedEnvelope("payload is not valid UTF-8".to_string()))
}
