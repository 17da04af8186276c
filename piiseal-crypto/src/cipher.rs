//! AES-256-GCM authenticated encryption.
//!
//! The tag is kept detached from the ciphertext so the envelope can carry
//! it as its own component.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KdfParams, OperatorSecret, Salt, derive_key};
use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;

/// Size of the GCM nonce (IV) in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Output of a single AES-256-GCM encryption under a known key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedData {
    pub iv: [u8; NONCE_SIZE],
    pub auth_tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Symmetric envelope for a password-derived key.
///
/// The salt travels with the ciphertext; only the operator secret is
/// secret. Constructed fresh on every [`encrypt`] call and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub salt: Salt,
    pub iv: [u8; NONCE_SIZE],
    pub auth_tag: [u8; TAG_SIZE],
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    fn sealed(&self) -> SealedData {
        SealedData {
            iv: self.iv,
            auth_tag: self.auth_tag,
            ciphertext: self.ciphertext.clone(),
        }
    }
}

/// Encrypts `plaintext` under `key` with a fresh random IV.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> CryptoResult<SealedData> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut iv = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut iv);

    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buf)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut auth_tag = [0u8; TAG_SIZE];
    auth_tag.copy_from_slice(tag.as_slice());

    Ok(SealedData {
        iv,
        auth_tag,
        ciphertext: buf,
    })
}

/// Decrypts and authenticates `sealed` under `key`.
///
/// Any tag mismatch is [`CryptoError::AuthenticationFailure`]; no partial
/// plaintext is ever returned.
pub fn open(key: &DerivedKey, sealed: &SealedData) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut buf = sealed.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&sealed.iv),
            b"",
            &mut buf,
            Tag::from_slice(&sealed.auth_tag),
        )
        .map_err(|_| CryptoError::AuthenticationFailure)?;
    Ok(buf)
}

/// Encrypts a string under a key derived from `secret` and a fresh salt.
pub fn encrypt(
    secret: &OperatorSecret,
    params: &KdfParams,
    plaintext: &str,
) -> CryptoResult<EncryptedEnvelope> {
    let salt = Salt::random();
    let key = derive_key(secret, &salt, params);
    let sealed = seal(&key, plaintext.as_bytes())?;

    Ok(EncryptedEnvelope {
        salt,
        iv: sealed.iv,
        auth_tag: sealed.auth_tag,
        ciphertext: sealed.ciphertext,
    })
}

/// Re-derives the key from the envelope's salt and decrypts it.
pub fn decrypt(
    secret: &OperatorSecret,
    params: &KdfParams,
    envelope: &EncryptedEnvelope,
) -> CryptoResult<String> {
    let key = derive_key(secret, &envelope.salt, params);
    let plaintext = open(&key, &envelope.sealed())?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::MalformedEnvelope("plaintext is not valid UTF-8".to_string()))
}
