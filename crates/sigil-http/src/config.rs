//! Middleware configuration.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGIL_REJECT_UNAUTHENTICATED` | `false` | Answer `401` instead of forwarding anonymously |
//! | `SIGIL_EXPOSE_REASONS` | `false` | Include the rejection reason in `401` bodies |
//! | `SIGIL_MAX_BODY_BYTES` | `10485760` | Largest request body that is buffered |
//! | `SIGIL_REPLAY_PROTECTION` | `false` | Reject reused signatures within the freshness window |

use std::env;

use serde::{Deserialize, Serialize};
use sigil_auth::ConfigError;
use typed_builder::TypedBuilder;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for [`AuthService`](crate::service::AuthService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AuthLayerConfig {
    /// Answer `401` for requests that fail authentication instead of
    /// forwarding them with an anonymous context.
    #[builder(default)]
    pub reject_unauthenticated: bool,

    /// Put the rejection reason in `401` bodies. Off by default so that
    /// callers cannot probe which gate failed.
    #[builder(default)]
    pub expose_reasons: bool,

    /// Largest request body that is buffered, in bytes.
    #[builder(default = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// Reject a signature seen before within the freshness window.
    #[builder(default)]
    pub replay_protection: bool,
}

impl Default for AuthLayerConfig {
    fn default() -> Self {
        Self {
            reject_unauthenticated: false,
            expose_reasons: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            replay_protection: false,
        }
    }
}

impl AuthLayerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvValue`] if `SIGIL_MAX_BODY_BYTES` is
    /// not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            reject_unauthenticated: env_bool("SIGIL_REJECT_UNAUTHENTICATED", false),
            expose_reasons: env_bool("SIGIL_EXPOSE_REASONS", false),
            replay_protection: env_bool("SIGIL_REPLAY_PROTECTION", false),
            ..Self::default()
        };

        if let Ok(v) = env::var("SIGIL_MAX_BODY_BYTES") {
            config.max_body_bytes = v.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                key: "SIGIL_MAX_BODY_BYTES",
                value: v.clone(),
            })?;
        }

        Ok(config)
    }
}

/// Read a boolean from an environment variable.
fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}
