//! The PII string engine: symmetric cipher plus codec behind one key ring.

use crate::cipher::{self, EncryptedEnvelope};
use crate::codec;
use crate::config::EncryptionConfig;
use crate::encryptor::FieldEncryptor;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, OperatorSecret};
use tracing::debug;

/// Encrypts and decrypts PII strings under the operator secret.
///
/// Holds a key ring: the current secret, used for every encryption, and
/// any previous secrets, still accepted for decryption while stored data is
/// being rotated. Stateless otherwise, so one instance can be shared across
/// threads.
#[derive(Clone, Debug)]
pub struct FieldCipher {
    current: OperatorSecret,
    previous: Vec<OperatorSecret>,
    kdf: KdfParams,
}

/// Outcome of decrypting against the key ring.
struct Opened {
    plaintext: String,
    under_current: bool,
}

impl FieldCipher {
    pub fn new(secret: OperatorSecret, kdf: KdfParams) -> Self {
        Self {
            current: secret,
            previous: Vec::new(),
            kdf,
        }
    }

    /// Accept `secret` for decryption only.
    pub fn with_previous(mut self, secret: OperatorSecret) -> Self {
        self.previous.push(secret);
        self
    }

    /// Builds the cipher from a config; fails if no secret is configured.
    pub fn from_config(config: &EncryptionConfig) -> CryptoResult<Self> {
        let current = config.secret.clone().ok_or_else(|| {
            CryptoError::Configuration("no operator secret configured".to_string())
        })?;
        Ok(Self {
            current,
            previous: config.previous_secrets.clone(),
            kdf: config.kdf,
        })
    }

    pub fn kdf(&self) -> KdfParams {
        self.kdf
    }

    /// Encrypts under a fresh salt and IV with the current secret.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedEnvelope> {
        cipher::encrypt(&self.current, &self.kdf, plaintext)
    }

    /// Decrypts with the current secret, then with each previous one.
    pub fn decrypt(&self, envelope: &EncryptedEnvelope) -> CryptoResult<String> {
        self.open(envelope).map(|opened| opened.plaintext)
    }

    fn open(&self, envelope: &EncryptedEnvelope) -> CryptoResult<Opened> {
        match cipher::decrypt(&self.current, &self.kdf, envelope) {
            Ok(plaintext) => {
                return Ok(Opened {
                    plaintext,
                    under_current: true,
                });
            }
            Err(CryptoError::AuthenticationFailure) => {}
            Err(e) => return Err(e),
        }

        for (idx, secret) in self.previous.iter().enumerate() {
            match cipher::decrypt(secret, &self.kdf, envelope) {
                Ok(plaintext) => {
                    debug!("decrypted value with previous key #{idx}");
                    return Ok(Opened {
                        plaintext,
                        under_current: false,
                    });
                }
                Err(CryptoError::AuthenticationFailure) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(CryptoError::AuthenticationFailure)
    }

    pub fn is_encrypted(&self, value: &str) -> bool {
        codec::is_encrypted(value)
    }
}

impl FieldEncryptor for FieldCipher {
    fn encrypt_string(&self, plaintext: &str) -> CryptoResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        let envelope = self.encrypt(plaintext)?;
        Ok(codec::encode(&envelope))
    }

    fn decrypt_string(&self, value: &str) -> CryptoResult<String> {
        if !codec::is_encrypted(value) {
            return Ok(value.to_string());
        }
        let envelope = codec::decode(value)?;
        self.decrypt(&envelope)
    }

    fn reencrypt_string(&self, value: &str) -> CryptoResult<String> {
        if !codec::is_encrypted(value) {
            return self.encrypt_string(value);
        }
        let opened = self.open(&codec::decode(value)?)?;
        if opened.under_current {
            return Ok(value.to_string());
        }
        self.encrypt_string(&opened.plaintext)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn key_configured(&self) -> bool {
        true
    }
}
