//! Shared helpers for piiseal-crypto integration tests.

#![allow(dead_code)]

use piiseal_crypto::{FieldCipher, KdfParams, KeyPair, OperatorSecret, RsaModulus, generate_key_pair};
use std::sync::OnceLock;

pub const SECRET: &str = "a-secret-at-least-32-characters-long";
pub const OTHER_SECRET: &str = "another-secret-that-is-32-chars-long";

/// Iteration count for tests; the production count is covered separately.
pub const TEST_ITERATIONS: u32 = 1_000;

pub fn cipher() -> FieldCipher {
    cipher_for(SECRET)
}

pub fn cipher_for(secret: &str) -> FieldCipher {
    FieldCipher::new(
        OperatorSecret::new(secret, None).unwrap(),
        KdfParams::with_iterations(TEST_ITERATIONS).unwrap(),
    )
}

/// RSA key generation is slow; tests share two keypairs.
pub fn key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(&cipher(), RsaModulus::Rsa2048).unwrap())
}

pub fn other_key_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| generate_key_pair(&cipher(), RsaModulus::Rsa2048).unwrap())
}
