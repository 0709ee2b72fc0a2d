//! Verifier configuration.
//!
//! Values are loaded from environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGIL_NAMESPACE` | `sigil` | Header namespace (`x-<ns>-timestamp`, `<NS>-HMAC-SHA256`) |
//! | `SIGIL_MAX_CLOCK_SKEW_SECS` | `300` | Freshness window in seconds |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::ConfigError;
use crate::freshness::DEFAULT_MAX_AGE;

/// Default header namespace.
pub const DEFAULT_NAMESPACE: &str = "sigil";

/// Configuration for [`SignatureVerifier`](crate::verifier::SignatureVerifier).
///
/// # Examples
///
/// ```
/// use sigil_auth::config::VerifierConfig;
///
/// let config = VerifierConfig::builder().namespace("woodbox".to_owned()).build();
/// assert_eq!(config.timestamp_header(), "x-woodbox-timestamp");
/// assert_eq!(config.max_clock_skew_secs, 300);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct VerifierConfig {
    /// Lower-case header namespace.
    #[builder(default = String::from(DEFAULT_NAMESPACE))]
    pub namespace: String,

    /// Tolerated difference between request timestamp and local clock.
    #[builder(default = DEFAULT_MAX_AGE.as_secs())]
    pub max_clock_skew_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            max_clock_skew_secs: DEFAULT_MAX_AGE.as_secs(),
        }
    }
}

impl VerifierConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(v) = env::var("SIGIL_NAMESPACE") {
            config.namespace = v;
        }
        if let Ok(v) = env::var("SIGIL_MAX_CLOCK_SKEW_SECS") {
            config.max_clock_skew_secs =
                v.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                    key: "SIGIL_MAX_CLOCK_SKEW_SECS",
                    value: v.clone(),
                })?;
        }

        config.validate()
    }

    /// Normalize and check the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNamespace`] unless the namespace is a
    /// non-empty run of ASCII letters, digits and `-`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        let config = self.normalized();
        let valid = !config.namespace.is_empty()
            && config
                .namespace
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');
        if !valid {
            return Err(ConfigError::InvalidNamespace(config.namespace));
        }
        Ok(config)
    }

    /// Trim and lower-case the namespace so derived header names match the
    /// lower-case names `http` hands out.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.namespace = self.namespace.trim().to_ascii_lowercase();
        self
    }

    /// The freshness window.
    #[must_use]
    pub fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew_secs)
    }

    /// Prefix shared by all namespaced headers, e.g. `x-sigil-`.
    #[must_use]
    pub fn header_prefix(&self) -> String {
        format!("x-{}-", self.namespace)
    }

    /// Name of the body digest header, e.g. `x-sigil-content-sha256`.
    #[must_use]
    pub fn content_hash_header(&self) -> String {
        format!("x-{}-content-sha256", self.namespace)
    }

    /// Name of the timestamp header, e.g. `x-sigil-timestamp`.
    #[must_use]
    pub fn timestamp_header(&self) -> String {
        format!("x-{}-timestamp", self.namespace)
    }
}
