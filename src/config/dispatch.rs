//! Dispatch configuration.

use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};

use super::parse::{env_bool, env_duration, env_or};
use super::ConfigError;

/// Request handling configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Development mode.
    pub debug: bool,
    /// Append `/` to request paths that lack one.
    pub append_slash: bool,
    /// Maximum wait for each inbound body message (`None` = no limit).
    pub body_receive_timeout: Option<Duration>,
    /// Encoding used when a request names no valid charset.
    pub default_charset: &'static Encoding,
}

impl DispatchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let charset = env_or("DEFAULT_CHARSET", "utf-8");
        let default_charset =
            Encoding::for_label(charset.trim().as_bytes()).ok_or_else(|| ConfigError::Invalid {
                key: "DEFAULT_CHARSET".into(),
                message: format!("unknown encoding '{}'", charset),
            })?;

        Ok(Self {
            debug: env_bool("DEBUG", false),
            append_slash: env_bool("APPEND_SLASH", true),
            body_receive_timeout: env_duration("BODY_RECEIVE_TIMEOUT", "60s")?,
            default_charset,
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            debug: false,
            append_slash: true,
            body_receive_timeout: Some(Duration::from_secs(60)),
            default_charset: UTF_8,
        }
    }
}
