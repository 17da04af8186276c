#![allow(dead_code)]

use piiseal_crypto::{FieldCipher, FieldEncryptor, KdfParams, OperatorSecret, Record};
use serde_json::Value;
use std::sync::Arc;

pub const SECRET: &str = "a-secret-at-least-32-characters-long";
pub const OLD_SECRET: &str = "the-previous-operator-secret-value-0001";

/// Keeps the suite fast; production uses 100k rounds.
pub const TEST_ITERATIONS: u32 = 1_000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn cipher_for(secret: &str) -> FieldCipher {
    FieldCipher::new(
        OperatorSecret::new(secret, None).unwrap(),
        KdfParams::with_iterations(TEST_ITERATIONS).unwrap(),
    )
}

pub fn encryptor_for(secret: &str) -> Arc<dyn FieldEncryptor> {
    Arc::new(cipher_for(secret))
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}
