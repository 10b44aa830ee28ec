//! Configuration module for tokio_asgi.
//!
//! This module provides centralized configuration loading from environment variables.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio_asgi::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Debug: {}", config.dispatch.debug);
//! ```

mod dispatch;
mod error;
mod logging;
mod middleware;
mod parse;
mod server;

pub use dispatch::DispatchConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use middleware::MiddlewareConfig;
pub use parse::parse_duration;
pub use server::ServerConfig;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Request handling configuration.
    pub dispatch: DispatchConfig,
    /// Middleware configuration.
    pub middleware: MiddlewareConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            dispatch: DispatchConfig::from_env()?,
            middleware: MiddlewareConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        info!("  Debug: {}", self.dispatch.debug);
        info!("  Append slash: {}", self.dispatch.append_slash);
        info!("  Default charset: {}", self.dispatch.default_charset.name());

        match self.dispatch.body_receive_timeout {
            Some(timeout) => info!("  Body receive timeout: {}s", timeout.as_secs()),
            None => info!("  Body receive timeout: disabled"),
        }

        match self.middleware.x_frame_options {
            Some(value) => info!("  X-Frame-Options: {}", value),
            None => info!("  X-Frame-Options: disabled"),
        }

        info!("  Drain timeout: {}s", self.server.drain_timeout.as_secs());
        info!("  Access log: {}", self.server.access_log);
        info!("  HTTP/2 max streams: {}", self.server.http2_max_streams);
    }
}
