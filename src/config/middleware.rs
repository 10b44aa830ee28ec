//! Middleware configuration.

use super::parse::env_or;
use super::ConfigError;
use crate::middleware::XFrameOptions;

/// Middleware configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct MiddlewareConfig {
    /// Clickjacking protection header (`None` = middleware disabled).
    pub x_frame_options: Option<XFrameOptions>,
}

impl MiddlewareConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            x_frame_options: Self::parse_x_frame_options(&env_or("X_FRAME_OPTIONS", "SAMEORIGIN"))?,
        })
    }

    fn parse_x_frame_options(value: &str) -> Result<Option<XFrameOptions>, ConfigError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("off") || value.is_empty() {
            return Ok(None);
        }
        value
            .parse()
            .map(Some)
            .map_err(|message| ConfigError::Invalid {
                key: "X_FRAME_OPTIONS".into(),
                message,
            })
    }
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            x_frame_options: Some(XFrameOptions::SameOrigin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_frame_options_values() {
        assert_eq!(
            MiddlewareConfig::parse_x_frame_options("deny").unwrap(),
            Some(XFrameOptions::Deny)
        );
        assert_eq!(
            MiddlewareConfig::parse_x_frame_options("SAMEORIGIN").unwrap(),
            Some(XFrameOptions::SameOrigin)
        );
        assert_eq!(MiddlewareConfig::parse_x_frame_options("off").unwrap(), None);
        assert!(matches!(
            MiddlewareConfig::parse_x_frame_options("ALLOWALL"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_default_enabled() {
        assert_eq!(
            MiddlewareConfig::default().x_frame_options,
            Some(XFrameOptions::SameOrigin)
        );
    }
}
