//! RSA keypairs for federation.
//!
//! The private half is encrypted through the PII string codec the moment it
//! is exported, so the only clear-text copy lives briefly in memory while an
//! operation needs it.

use crate::encryptor::FieldEncryptor;
use crate::error::{CryptoError, CryptoResult};
use crate::field_cipher::FieldCipher;
use rand::rngs::OsRng;
use rsa::pkcs1v15::{SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Message signed by [`verify_key_pair`] to prove two halves belong together.
const KEYPAIR_PROBE: &[u8] = b"piiseal keypair verification probe";

/// Supported RSA modulus lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RsaModulus {
    #[default]
    Rsa2048,
    Rsa3072,
    Rsa4096,
}

impl RsaModulus {
    pub fn bits(self) -> usize {
        match self {
            Self::Rsa2048 => 2048,
            Self::Rsa3072 => 3072,
            Self::Rsa4096 => 4096,
        }
    }

    pub fn from_bits(bits: usize) -> CryptoResult<Self> {
        match bits {
            2048 => Ok(Self::Rsa2048),
            3072 => Ok(Self::Rsa3072),
            4096 => Ok(Self::Rsa4096),
            other => Err(CryptoError::InvalidKey(format!(
                "unsupported RSA modulus length {other} (expected 2048, 3072 or 4096)"
            ))),
        }
    }
}

/// A federation keypair as it is stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// SPKI PEM. Safe to share.
    pub public_key: String,
    /// PKCS#8 PEM, already encrypted to an `enc:v1:` string.
    pub private_key_encrypted: String,
}

/// Generates an RSA keypair and encrypts the private key before returning.
pub fn generate_key_pair(cipher: &FieldCipher, modulus: RsaModulus) -> CryptoResult<KeyPair> {
    let private = RsaPrivateKey::new(&mut OsRng, modulus.bits())
        .map_err(|e| CryptoError::InvalidKey(format!("RSA key generation failed: {e}")))?;
    let public = RsaPublicKey::from(&private);

    let public_key = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidKey(format!("public key export failed: {e}")))?;
    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidKey(format!("private key export failed: {e}")))?;
    let private_key_encrypted = cipher.encrypt_string(&private_pem)?;

    info!(
        "generated {}-bit RSA keypair ({})",
        modulus.bits(),
        public_key_fingerprint(&public_key)?
    );

    Ok(KeyPair {
        public_key,
        private_key_encrypted,
    })
}

pub(crate) fn parse_public_key(pem: &str) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid public key: {e}")))
}

/// Decrypts a stored private key to its clear-text PEM.
///
/// Accepts a clear-text PEM as well. The result is wiped when dropped.
pub fn decrypt_private_key(cipher: &FieldCipher, stored: &str) -> CryptoResult<Zeroizing<String>> {
    Ok(Zeroizing::new(cipher.decrypt_string(stored)?))
}

pub(crate) fn load_private_key(cipher: &FieldCipher, stored: &str) -> CryptoResult<RsaPrivateKey> {
    let pem = decrypt_private_key(cipher, stored)?;
    let key = RsaPrivateKey::from_pkcs8_pem(pem.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("invalid private key: {e}")))?;
    key.validate()
        .map_err(|e| CryptoError::InvalidKey(format!("inconsistent private key: {e}")))?;
    Ok(key)
}

/// Whether `pem` parses as an RSA public key.
pub fn is_valid_public_key(pem: &str) -> bool {
    parse_public_key(pem).is_ok()
}

/// Whether `stored` decrypts (if needed) to a valid RSA private key.
pub fn is_valid_private_key(cipher: &FieldCipher, stored: &str) -> bool {
    load_private_key(cipher, stored).is_ok()
}

/// SHA-256 over the DER-encoded public key, as colon-separated hex pairs.
///
/// Meant to be read aloud or compared by eye when two operators confirm a
/// key exchange out of band.
pub fn public_key_fingerprint(pem: &str) -> CryptoResult<String> {
    let der = parse_public_key(pem)?
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(format!("public key encoding failed: {e}")))?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(digest
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":"))
}

/// Proves `public_pem` and `stored_private` are two halves of one keypair by
/// signing a probe with the private key and verifying it with the public one.
///
/// Unparsable or undecryptable input counts as a mismatch.
pub fn verify_key_pair(cipher: &FieldCipher, public_pem: &str, stored_private: &str) -> bool {
    let (public, private) = match (
        parse_public_key(public_pem),
        load_private_key(cipher, stored_private),
    ) {
        (Ok(public), Ok(private)) => (public, private),
        (Err(e), _) | (_, Err(e)) => {
            debug!("keypair verification failed to load keys: {e}");
            return false;
        }
    };

    let signature = SigningKey::<Sha256>::new(private).sign(KEYPAIR_PROBE);
    VerifyingKey::<Sha256>::new(public)
        .verify(KEYPAIR_PROBE, &signature)
        .is_ok()
}
