//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_bool, env_duration, env_or, env_parse};
use super::ConfigError;

const DEFAULT_HTTP2_MAX_STREAMS: u32 = 250;

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8080).
    pub listen_addr: SocketAddr,
    /// Graceful shutdown drain timeout (default: 30s).
    pub drain_timeout: Duration,
    /// Emit one `access` record per request (ACCESS_LOG=1).
    pub access_log: bool,
    /// Concurrent streams per HTTP/2 connection (default: 250).
    pub http2_max_streams: u32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse listen address
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8080")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "0.0.0.0:8080"),
                error: format!("{}", e),
            })?;

        let drain_timeout = env_duration("DRAIN_TIMEOUT", "30s")?.unwrap_or(Duration::ZERO);

        Ok(Self {
            listen_addr,
            drain_timeout,
            access_log: env_bool("ACCESS_LOG", false),
            http2_max_streams: env_parse("HTTP2_MAX_STREAMS", DEFAULT_HTTP2_MAX_STREAMS)?,
        })
    }

    /// Configuration for a given address with default timeouts.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            drain_timeout: Duration::from_secs(30),
            access_log: false,
            http2_max_streams: DEFAULT_HTTP2_MAX_STREAMS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}
