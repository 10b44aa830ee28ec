//! HTTP response abstraction produced by handlers and the exception translator.

use std::fmt;

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use super::cookie::Cookie;
use super::error::{Error, Failure, Result};

/// Common header name constants for fast lookup.
mod header_names {
    use super::*;
    pub static CONTENT_TYPE: HeaderName = header::CONTENT_TYPE;
    pub static ALLOW: HeaderName = header::ALLOW;
}

/// Pre-allocated static header values for common content types.
mod content_types {
    use super::*;
    pub static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
    pub static TEXT_HTML: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");
    pub static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
}

/// Pre-allocated static bodies for common responses.
mod static_bodies {
    use super::*;
    pub static NOT_FOUND: Bytes = Bytes::from_static(b"Not Found");
    pub static FORBIDDEN: Bytes = Bytes::from_static(b"Forbidden");
    pub static BAD_REQUEST: Bytes = Bytes::from_static(b"Bad Request");
    pub static METHOD_NOT_ALLOWED: Bytes = Bytes::from_static(b"Method Not Allowed");
    pub static REQUEST_TIMEOUT: Bytes = Bytes::from_static(b"Request Timeout");
}

/// Produces the body of a deferred response.
///
/// Template responses are built before their content exists; the pipeline
/// calls [`Response::render`] once the handler has returned.
pub trait Render: Send + Sync {
    fn render(&self) -> std::result::Result<Bytes, Failure>;
}

enum Content {
    Rendered(Bytes),
    Deferred(Box<dyn Render>),
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Rendered(body) => f.debug_tuple("Rendered").field(body).finish(),
            Content::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// HTTP response.
///
/// Note: Clone is intentionally not derived to prevent expensive copies.
/// Use references or move semantics instead.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    content: Content,
    xframe_options_exempt: bool,
}

impl Response {
    fn with_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            cookies: Vec::new(),
            content: Content::Rendered(body),
            xframe_options_exempt: false,
        }
    }

    /// Create a new response builder.
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// Create a 200 OK response with body.
    #[inline]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::with_parts(StatusCode::OK, HeaderMap::new(), body.into())
    }

    /// Create a response whose body is produced later by `renderer`.
    pub fn deferred(status: StatusCode, renderer: impl Render + 'static) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            content: Content::Deferred(Box::new(renderer)),
            xframe_options_exempt: false,
        }
    }

    /// Create a 404 Not Found response (uses static body).
    #[inline]
    pub fn not_found() -> Self {
        Self::with_parts(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            static_bodies::NOT_FOUND.clone(),
        )
    }

    /// Create a 403 Forbidden response (uses static body).
    #[inline]
    pub fn forbidden() -> Self {
        Self::with_parts(
            StatusCode::FORBIDDEN,
            HeaderMap::new(),
            static_bodies::FORBIDDEN.clone(),
        )
    }

    /// Create a 400 Bad Request response (uses static body).
    #[inline]
    pub fn bad_request() -> Self {
        Self::with_parts(
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            static_bodies::BAD_REQUEST.clone(),
        )
    }

    /// Create a 405 Method Not Allowed response listing the allowed verbs.
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let mut headers = HeaderMap::with_capacity(1);
        if let Ok(value) = HeaderValue::try_from(allow_value(allowed)) {
            headers.insert(header_names::ALLOW.clone(), value);
        }
        Self::with_parts(
            StatusCode::METHOD_NOT_ALLOWED,
            headers,
            static_bodies::METHOD_NOT_ALLOWED.clone(),
        )
    }

    /// Create a 408 Request Timeout response (uses static body).
    #[inline]
    pub fn request_timeout() -> Self {
        Self::with_parts(
            StatusCode::REQUEST_TIMEOUT,
            HeaderMap::new(),
            static_bodies::REQUEST_TIMEOUT.clone(),
        )
    }

    /// Create a 500 Internal Server Error response.
    #[inline]
    pub fn internal_error(msg: &str) -> Self {
        Self::with_parts(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Bytes::copy_from_slice(msg.as_bytes()),
        )
    }

    /// Create an empty response with given status.
    #[inline]
    pub fn empty(status: StatusCode) -> Self {
        Self::with_parts(status, HeaderMap::new(), Bytes::new())
    }

    // Getters

    /// Get the status code.
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the reason phrase for the status code.
    #[inline]
    pub fn reason_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Status Code")
    }

    /// Get the headers.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get a mutable reference to headers.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Get a header value by string name (case-insensitive).
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get Content-Type header.
    #[inline]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(&header_names::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Cookies to be sent as `Set-Cookie` headers.
    #[inline]
    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Check if the body has been produced.
    #[inline]
    pub fn is_rendered(&self) -> bool {
        matches!(self.content, Content::Rendered(_))
    }

    /// Produce the body of a deferred response. No-op once rendered.
    pub fn render(&mut self) -> std::result::Result<(), Failure> {
        if let Content::Deferred(renderer) = &self.content {
            let body = renderer.render()?;
            self.content = Content::Rendered(body);
        }
        Ok(())
    }

    /// Get the response body.
    pub fn content(&self) -> Result<&Bytes> {
        match &self.content {
            Content::Rendered(body) => Ok(body),
            Content::Deferred(_) => Err(Error::ContentNotRendered),
        }
    }

    /// Check if clickjacking protection should skip this response.
    #[inline]
    pub fn xframe_options_exempt(&self) -> bool {
        self.xframe_options_exempt
    }

    /// Headers in wire order, cookies appended as `Set-Cookie` entries.
    pub fn header_list(&self) -> Vec<(Bytes, Bytes)> {
        let mut list = Vec::with_capacity(self.headers.len() + self.cookies.len());
        for (name, value) in &self.headers {
            list.push((
                Bytes::copy_from_slice(name.as_str().as_bytes()),
                Bytes::copy_from_slice(value.as_bytes()),
            ));
        }
        for cookie in &self.cookies {
            list.push((
                Bytes::from_static(b"set-cookie"),
                Bytes::from(cookie.to_header_value()),
            ));
        }
        list
    }

    /// Split into status, wire headers and body.
    pub fn into_parts(self) -> Result<(u16, Vec<(Bytes, Bytes)>, Bytes)> {
        let headers = self.header_list();
        match self.content {
            Content::Rendered(body) => Ok((self.status.as_u16(), headers, body)),
            Content::Deferred(_) => Err(Error::ContentNotRendered),
        }
    }

    // Modifiers

    /// Set the status code.
    #[inline]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add a header (fast path with HeaderName + HeaderValue).
    #[inline]
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header by string name and value.
    #[inline]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a header by string name and value. Invalid pairs are ignored.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
    }

    /// Set the body.
    #[inline]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.content = Content::Rendered(body.into());
        self
    }

    /// Set a cookie, replacing any earlier cookie with the same name.
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
    }

    /// Tell the client to drop a cookie.
    pub fn delete_cookie(&mut self, name: &str) {
        self.set_cookie(Cookie::removal(name));
    }

    /// Exempt this response from clickjacking protection.
    #[inline]
    pub fn set_xframe_options_exempt(&mut self, exempt: bool) {
        self.xframe_options_exempt = exempt;
    }

    // Status checks

    /// Check if this is a client error (4xx).
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Check if this is a server error (5xx).
    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Check if this is an error response (4xx or 5xx).
    #[inline]
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::with_parts(StatusCode::OK, HeaderMap::new(), Bytes::new())
    }
}

/// Build an `Allow` header value.
pub(crate) fn allow_value(allowed: &[Method]) -> String {
    allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for creating HTTP responses.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Option<HeaderMap>, // Lazy allocation
    body: Bytes,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    /// Create a new response builder.
    #[inline]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: None,
            body: Bytes::new(),
        }
    }

    /// Set the status code.
    #[inline]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Add header with typed HeaderName and HeaderValue.
    #[inline]
    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Add header by strings. Invalid pairs are ignored.
    #[inline]
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers
                .get_or_insert_with(HeaderMap::new)
                .append(name, value);
        }
        self
    }

    /// Set the body.
    #[inline]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set Content-Type to text/html.
    #[inline]
    pub fn html(self) -> Self {
        self.header_value(
            header_names::CONTENT_TYPE.clone(),
            content_types::TEXT_HTML.clone(),
        )
    }

    /// Set Content-Type to application/json.
    #[inline]
    pub fn json(self) -> Self {
        self.header_value(
            header_names::CONTENT_TYPE.clone(),
            content_types::APPLICATION_JSON.clone(),
        )
    }

    /// Set Content-Type to text/plain.
    #[inline]
    pub fn text(self) -> Self {
        self.header_value(
            header_names::CONTENT_TYPE.clone(),
            content_types::TEXT_PLAIN.clone(),
        )
    }

    /// Build the response.
    #[inline]
    pub fn build(self) -> Response {
        Response::with_parts(self.status, self.headers.unwrap_or_default(), self.body)
    }
}
