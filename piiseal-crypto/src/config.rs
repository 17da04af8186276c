//! Encryption configuration.
//!
//! The engine never reads the environment on its own. A config is built once
//! (from the environment or programmatically) and handed to
//! [`FieldCipher::from_config`](crate::FieldCipher::from_config).

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KdfParams, OperatorSecret};
use tracing::warn;

/// Preferred operator secret.
pub const ENV_ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";
/// Fallback operator secret (the auth-session secret).
pub const ENV_AUTH_SECRET: &str = "AUTH_SECRET";
/// Previous operator secret, accepted for decryption during rotation.
pub const ENV_ENCRYPTION_KEY_PREVIOUS: &str = "ENCRYPTION_KEY_PREVIOUS";
/// Optional federation license appended to every secret.
pub const ENV_FEDERATION_LICENSE_KEY: &str = "FEDERATION_LICENSE_KEY";
/// Feature flag for PII encryption.
pub const ENV_PII_ENCRYPTION_ENABLED: &str = "PII_ENCRYPTION_ENABLED";
/// Deployment environment name, consulted when the flag is unset.
pub const ENV_APP_ENV: &str = "APP_ENV";

/// Configuration for the PII encryption engine.
#[derive(Clone, Debug)]
pub struct EncryptionConfig {
    /// Current operator secret. Always present when `enabled` is true.
    pub secret: Option<OperatorSecret>,

    /// Older secrets still accepted for decryption.
    pub previous_secrets: Vec<OperatorSecret>,

    /// KDF parameters shared by every secret.
    ///
    /// The round count is not recorded in stored values, so it is never
    /// taken from the environment: [`from_lookup`](Self::from_lookup) always
    /// uses [`KdfParams::default`].
    pub kdf: KdfParams,

    /// Whether PII fields are encrypted at all.
    pub enabled: bool,
}

impl EncryptionConfig {
    pub fn builder() -> EncryptionConfigBuilder {
        EncryptionConfigBuilder::default()
    }

    /// A config with encryption switched off.
    pub fn disabled() -> Self {
        Self {
            secret: None,
            previous_secrets: Vec::new(),
            kdf: KdfParams::default(),
            enabled: false,
        }
    }

    /// Loads the config from the process environment.
    pub fn from_env() -> CryptoResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the config through an arbitrary variable lookup.
    ///
    /// `ENCRYPTION_KEY` wins over `AUTH_SECRET`; whichever is chosen must be
    /// at least 32 characters when encryption is enabled.
    pub fn from_lookup<F>(lookup: F) -> CryptoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = match var(ENV_PII_ENCRYPTION_ENABLED) {
            Some(raw) => parse_flag(&raw)?,
            None => !matches!(
                var(ENV_APP_ENV).map(|v| v.to_ascii_lowercase()).as_deref(),
                Some("development" | "dev" | "test")
            ),
        };

        let mut builder = Self::builder().enabled(enabled);
        if let Some(secret) = var(ENV_ENCRYPTION_KEY).or_else(|| var(ENV_AUTH_SECRET)) {
            builder = builder.secret(secret);
        }
        if let Some(previous) = var(ENV_ENCRYPTION_KEY_PREVIOUS) {
            builder = builder.previous_secret(previous);
        }
        if let Some(license) = var(ENV_FEDERATION_LICENSE_KEY) {
            builder = builder.license(license);
        }
        builder.build()
    }

    /// Whether a usable operator secret is configured.
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }
}

fn parse_flag(raw: &str) -> CryptoResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CryptoError::Configuration(format!(
            "{ENV_PII_ENCRYPTION_ENABLED} must be a boolean, got {other:?}"
        ))),
    }
}

/// Builder for [`EncryptionConfig`]. Secrets are validated in [`build`].
///
/// [`build`]: EncryptionConfigBuilder::build
#[derive(Default)]
pub struct EncryptionConfigBuilder {
    secret: Option<String>,
    previous: Vec<String>,
    license: Option<String>,
    iterations: Option<u32>,
    enabled: Option<bool>,
}

impl EncryptionConfigBuilder {
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn previous_secret(mut self, secret: impl Into<String>) -> Self {
        self.previous.push(secret.into());
        self
    }

    pub fn license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// Overrides the PBKDF2 round count. Values stored under one count do
    /// not decrypt under another; meant for tests.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = Some(iterations);
        self
    }

    /// Defaults to enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn build(self) -> CryptoResult<EncryptionConfig> {
        let enabled = self.enabled.unwrap_or(true);
        let license = self.license.as_deref();
        let kdf = match self.iterations {
            Some(n) => KdfParams::with_iterations(n)?,
            None => KdfParams::default(),
        };

        let secret = match self.secret.as_deref().map(|s| OperatorSecret::new(s, license)) {
            Some(Ok(secret)) => Some(secret),
            Some(Err(e)) if enabled => return Err(e),
            Some(Err(e)) => {
                warn!("ignoring operator secret while PII encryption is disabled: {e}");
                None
            }
            None if enabled => {
                return Err(CryptoError::Configuration(format!(
                    "PII encryption is enabled but neither {ENV_ENCRYPTION_KEY} nor {ENV_AUTH_SECRET} is set"
                )));
            }
            None => None,
        };

        let previous_secrets = self
            .previous
            .iter()
            .map(|s| OperatorSecret::new(s, license))
            .collect::<CryptoResult<Vec<_>>>()?;

        Ok(EncryptionConfig {
            secret,
            previous_secrets,
            kdf,
            enabled,
        })
    }
}
