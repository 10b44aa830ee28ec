//! Clickjacking protection middleware.
//!
//! Sets `X-Frame-Options` on every response unless a handler set the header
//! itself or marked the response exempt.

use std::fmt;
use std::str::FromStr;

use http::header::X_FRAME_OPTIONS;
use http::HeaderValue;

use super::Middleware;
use crate::core::{Request, Response};

/// Value of the `X-Frame-Options` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XFrameOptions {
    /// Never allow framing.
    Deny,
    /// Allow framing by pages of the same origin.
    #[default]
    SameOrigin,
}

impl XFrameOptions {
    pub const fn as_str(&self) -> &'static str {
        match self {
            XFrameOptions::Deny => "DENY",
            XFrameOptions::SameOrigin => "SAMEORIGIN",
        }
    }
}

impl fmt::Display for XFrameOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XFrameOptions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DENY" => Ok(XFrameOptions::Deny),
            "SAMEORIGIN" => Ok(XFrameOptions::SameOrigin),
            other => Err(format!(
                "unknown X-Frame-Options value '{}', expected DENY or SAMEORIGIN",
                other
            )),
        }
    }
}

/// Adds `X-Frame-Options` to responses.
#[derive(Debug, Clone, Default)]
pub struct XFrameOptionsMiddleware {
    value: XFrameOptions,
}

impl XFrameOptionsMiddleware {
    pub fn new(value: XFrameOptions) -> Self {
        Self { value }
    }

    /// Configured header value.
    #[inline]
    pub fn value(&self) -> XFrameOptions {
        self.value
    }
}

impl Middleware for XFrameOptionsMiddleware {
    fn name(&self) -> &'static str {
        "x_frame_options"
    }

    fn priority(&self) -> i32 {
        90
    }

    fn on_response(&self, _req: &Request, mut res: Response) -> Response {
        if res.headers().contains_key(X_FRAME_OPTIONS) || res.xframe_options_exempt() {
            return res;
        }

        res.headers_mut().insert(
            X_FRAME_OPTIONS,
            HeaderValue::from_static(self.value.as_str()),
        );
        res
    }
}
