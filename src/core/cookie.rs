//! Outgoing cookies serialized as `Set-Cookie` headers.

use std::fmt::Write;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Expiry date used to delete a cookie.
const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// A cookie set on a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    pub expires: Option<String>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Cookie {
    /// Create a cookie scoped to `/`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            expires: None,
            path: Some("/".to_string()),
            domain: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// Create a cookie that tells the client to drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        let mut cookie = Self::new(name, "");
        cookie.max_age = Some(0);
        cookie.expires = Some(EPOCH_EXPIRES.to_string());
        cookie
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Serialize into a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut out = String::with_capacity(self.name.len() + self.value.len() + 32);
        out.push_str(&self.name);
        out.push('=');
        push_value(&mut out, &self.value);

        if let Some(ref domain) = self.domain {
            let _ = write!(out, "; Domain={}", domain);
        }
        if let Some(ref expires) = self.expires {
            let _ = write!(out, "; expires={}", expires);
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(max_age) = self.max_age {
            let _ = write!(out, "; Max-Age={}", max_age);
        }
        if let Some(ref path) = self.path {
            let _ = write!(out, "; Path={}", path);
        }
        if let Some(same_site) = self.same_site {
            let _ = write!(out, "; SameSite={}", same_site.as_str());
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out
    }
}

/// Quote values containing separators, escaping `"` and `\`.
fn push_value(out: &mut String, value: &str) {
    let needs_quotes = value
        .chars()
        .any(|c| matches!(c, ' ' | ',' | ';' | '"' | '\\') || c.is_control());
    if !needs_quotes {
        out.push_str(value);
        return;
    }

    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
