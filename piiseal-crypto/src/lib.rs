//! Field-level PII encryption for piiseal.
//!
//! Provides:
//! - PBKDF2-HMAC-SHA256 key derivation from the operator secret
//! - AES-256-GCM authenticated encryption with a fresh salt and IV per value
//! - The self-describing `enc:v1:` text encoding for stored values
//! - Typed PII field processing over key-value records
//! - RSA keypairs and RSA-OAEP hybrid envelopes for federation
//!
//! # Architecture
//!
//! Every PII value is encrypted under its own key, derived from the operator
//! secret and a random salt that travels with the ciphertext:
//!
//! ```text
//! FieldEncryptor::encrypt_string
//!   -> cipher::encrypt (random salt + IV, PBKDF2, AES-256-GCM)
//!   -> codec::encode   ("enc:v1:" salt:iv:authTag:ciphertext)
//! ```
//!
//! Because the encoding is self-describing, plaintext and ciphertext can
//! coexist in one record while the feature flag is toggled or a key
//! rotation is in progress.
//!
//! Federation payloads bypass the KDF: [`hybrid_encrypt`] uses a random,
//! single-use AES key wrapped with the partner's RSA public key.

pub mod cipher;
pub mod codec;
pub mod config;
mod encryptor;
mod error;
mod field_cipher;
pub mod fields;
pub mod hybrid;
mod key;
pub mod keypair;

pub use cipher::{EncryptedEnvelope, NONCE_SIZE, SealedData, TAG_SIZE};
pub use codec::{ENCRYPTED_PREFIX, is_encrypted};
pub use config::EncryptionConfig;
pub use encryptor::{FieldEncryptor, PassthroughEncryptor, encryptor_from_config};
pub use error::{CryptoError, CryptoResult};
pub use field_cipher::FieldCipher;
pub use fields::{
    DecryptPolicy, PiiField, Record, decrypt_pii_fields, encrypt_pii_fields, reencrypt_pii_fields,
};
pub use hybrid::{HybridEnvelope, hybrid_decrypt, hybrid_encrypt};
pub use key::{
    DEFAULT_ITERATIONS, DerivedKey, KEY_SIZE, KdfParams, MIN_SECRET_LEN, OperatorSecret, SALT_SIZE,
    Salt, derive_key, generate_random_key,
};
pub use keypair::{
    KeyPair, RsaModulus, decrypt_private_key, generate_key_pair, is_valid_private_key,
    is_valid_public_key, public_key_fingerprint, verify_key_pair,
};
