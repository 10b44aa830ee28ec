//! Connection scope supplied by the transport.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Scope type handled by this adapter.
pub const HTTP_SCOPE: &str = "http";

/// Immutable per-connection metadata.
///
/// Missing optional keys deserialize to their defaults, so a transport only
/// needs to send `type`, `method` and `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionScope {
    /// Protocol type (`http`, `websocket`, ...).
    #[serde(rename = "type")]
    pub scope_type: String,
    /// Request method as sent by the client.
    #[serde(default)]
    pub method: String,
    /// Decoded request path.
    pub path: String,
    /// Raw query string, without the leading `?`.
    #[serde(default)]
    pub query_string: Bytes,
    /// Mount point of the application.
    #[serde(default)]
    pub root_path: Option<String>,
    /// URL scheme (`http` or `https`).
    #[serde(default)]
    pub scheme: Option<String>,
    /// HTTP version (`1.0`, `1.1`, `2`).
    #[serde(default)]
    pub http_version: Option<String>,
    /// Raw header pairs in the order received.
    #[serde(default)]
    pub headers: Vec<(Bytes, Bytes)>,
    /// Client address and port.
    #[serde(default)]
    pub client: Option<(String, u16)>,
    /// Server address and port.
    #[serde(default)]
    pub server: Option<(String, u16)>,
}

impl ConnectionScope {
    /// Create an `http` scope for a method and path.
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scope_type: HTTP_SCOPE.to_string(),
            method: method.into(),
            path: path.into(),
            query_string: Bytes::new(),
            root_path: None,
            scheme: None,
            http_version: None,
            headers: Vec::new(),
            client: None,
            server: None,
        }
    }

    /// Check if this scope describes an HTTP connection.
    #[inline]
    pub fn is_http(&self) -> bool {
        self.scope_type == HTTP_SCOPE
    }

    /// Set the scope type.
    pub fn with_type(mut self, scope_type: impl Into<String>) -> Self {
        self.scope_type = scope_type.into();
        self
    }

    /// Set the raw query string.
    pub fn with_query(mut self, query: impl Into<Bytes>) -> Self {
        self.query_string = query.into();
        self
    }

    /// Set the mount point.
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }

    /// Set the URL scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    /// Set the HTTP version.
    pub fn with_http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = Some(version.into());
        self
    }

    /// Append a raw header pair.
    pub fn with_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((
            Bytes::copy_from_slice(name.as_ref()),
            Bytes::copy_from_slice(value.as_ref()),
        ));
        self
    }

    /// Set the client address.
    pub fn with_client(mut self, host: impl Into<String>, port: u16) -> Self {
        self.client = Some((host.into(), port));
        self
    }

    /// Set the server address.
    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server = Some((host.into(), port));
        self
    }
}
