//! Header normalization into CGI-style request metadata.
//!
//! Raw header names become metadata keys:
//!
//! | Header           | Key                      |
//! |------------------|--------------------------|
//! | `content-length` | `CONTENT_LENGTH`         |
//! | `content-type`   | `CONTENT_TYPE`           |
//! | `x-forwarded-for`| `HTTP_X_FORWARDED_FOR`   |
//!
//! `content-length` and `content-type` match in any ASCII case, so
//! `Content-Type` also lands in `CONTENT_TYPE`. Other names are upper-cased
//! with `-` replaced by `_`.
//!
//! Names and values are decoded as Latin-1 so arbitrary bytes never fail.
//! Repeated headers are merged into one value joined by `,`.

use bytes::Bytes;

/// Metadata key constants.
pub mod keys {
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const QUERY_STRING: &str = "QUERY_STRING";
    pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
    pub const PATH_INFO: &str = "PATH_INFO";
    pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
    pub const REMOTE_HOST: &str = "REMOTE_HOST";
    pub const REMOTE_PORT: &str = "REMOTE_PORT";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";
    pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
    pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
    pub const HTTP_COOKIE: &str = "HTTP_COOKIE";
    pub const HTTP_HOST: &str = "HTTP_HOST";
}

/// Ordered request metadata (faster than HashMap for small collections).
///
/// Keys keep the order in which they were first inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create empty metadata with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Get a value by key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key is present.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value, replacing any existing one in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Set a value, appending to an existing one with a `,` separator.
    pub fn merge(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => {
                entry.1.push(',');
                entry.1.push_str(&value);
            }
            None => self.entries.push((key, value)),
        }
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode bytes as Latin-1. Every byte maps to exactly one char.
#[inline]
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Map a header name to its metadata key.
pub fn meta_key(name: &str) -> String {
    if name.eq_ignore_ascii_case("content-length") {
        keys::CONTENT_LENGTH.to_string()
    } else if name.eq_ignore_ascii_case("content-type") {
        keys::CONTENT_TYPE.to_string()
    } else {
        let mut key = String::with_capacity(5 + name.len());
        key.push_str("HTTP_");
        for c in name.chars() {
            key.push(if c == '-' { '_' } else { c.to_ascii_uppercase() });
        }
        key
    }
}

/// Merge raw header pairs into existing metadata.
pub fn merge_headers(meta: &mut Metadata, headers: &[(Bytes, Bytes)]) {
    for (name, value) in headers {
        let key = meta_key(&latin1(name));
        meta.merge(key, latin1(value));
    }
}

/// Normalize raw header pairs into a fresh metadata mapping.
pub fn normalize(headers: &[(Bytes, Bytes)]) -> Metadata {
    let mut meta = Metadata::with_capacity(headers.len());
    merge_headers(&mut meta, headers);
    meta
}

/// Parse a `CONTENT_LENGTH` value. Negative or unparseable values are 0.
#[inline]
pub fn parse_content_length(value: Option<&str>) -> usize {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}
