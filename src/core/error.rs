//! Core error types.
//!
//! Two layers of failure exist:
//!
//! - [`Error`] - faults of the adapter itself (bad scope type, broken handler
//!   contract, transport gone). These cross component boundaries.
//! - [`Failure`] - request-level failures raised while dispatching (routing,
//!   handler code, middleware). These never leave the pipeline raw; the
//!   exception translator turns every one of them into a response.

use std::fmt;
use std::time::Duration;

use http::{Method, StatusCode};

/// Adapter-level errors.
#[derive(Debug)]
pub enum Error {
    /// Connection scope is not of type `http`.
    UnsupportedScopeType(String),

    /// Handler finished without producing a response.
    HandlerContractViolation {
        handler: String,
        scope: String,
    },

    /// Form data was requested after the body stream had been consumed.
    NotYetRead,

    /// Response content was read before a deferred response was rendered.
    ContentNotRendered,

    /// The transport dropped its side of the message channel.
    TransportClosed,

    /// A route or view could not be registered.
    InvalidRoute {
        pattern: String,
        message: String,
    },

    /// I/O error.
    Io(std::io::Error),

    /// HTTP error.
    Http(http::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedScopeType(kind) => write!(
                f,
                "the ASGI handler can only handle HTTP connections, not {}",
                kind
            ),
            Error::HandlerContractViolation { handler, scope } => {
                if scope.is_empty() {
                    write!(
                        f,
                        "the view {} didn't return a response, it returned nothing instead",
                        handler
                    )
                } else {
                    write!(
                        f,
                        "the view {}::{} didn't return a response, it returned nothing instead",
                        scope, handler
                    )
                }
            }
            Error::NotYetRead => write!(
                f,
                "you cannot access form data after reading from the request's data stream"
            ),
            Error::ContentNotRendered => write!(
                f,
                "the response content must be rendered before it can be accessed"
            ),
            Error::TransportClosed => write!(f, "transport closed the outbound channel"),
            Error::InvalidRoute { pattern, message } => {
                write!(f, "invalid route '{}': {}", pattern, message)
            }
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Request-level failure raised during dispatch.
#[derive(Debug)]
pub enum Failure {
    /// No route, or the handler signalled a missing resource.
    NotFound(String),

    /// The caller may not access the resource.
    PermissionDenied(String),

    /// Malformed or invalid input.
    BadRequest(String),

    /// Input that looks like tampering (bad host, oversized fields).
    Suspicious(String),

    /// The verb has no handler for this route.
    MethodNotAllowed {
        method: String,
        allowed: Vec<Method>,
    },

    /// Body data did not arrive in time.
    RequestTimeout(Duration),

    /// Any error raised by handler code.
    Handler(Box<dyn std::error::Error + Send + Sync>),

    /// Internal fault (panics, contract violations outside debug mode).
    Internal(String),
}

impl Failure {
    /// Wrap an arbitrary handler error.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Failure::Handler(err.into())
    }

    /// Status code this failure maps to under the default policy.
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::NotFound(_) => StatusCode::NOT_FOUND,
            Failure::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Failure::BadRequest(_) | Failure::Suspicious(_) => StatusCode::BAD_REQUEST,
            Failure::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Failure::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            Failure::Handler(_) | Failure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::NotFound(msg) => write!(f, "not found: {}", msg),
            Failure::PermissionDenied(msg) => write!(f, "permission denied: {}", msg),
            Failure::BadRequest(msg) => write!(f, "bad request: {}", msg),
            Failure::Suspicious(msg) => write!(f, "suspicious operation: {}", msg),
            Failure::MethodNotAllowed { method, allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
                write!(
                    f,
                    "method not allowed: {} (allowed: {})",
                    method,
                    allowed.join(", ")
                )
            }
            Failure::RequestTimeout(after) => {
                write!(f, "request body not received within {}s", after.as_secs())
            }
            Failure::Handler(e) => write!(f, "handler error: {}", e),
            Failure::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Failure::Handler(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<Error> for Failure {
    fn from(e: Error) -> Self {
        Failure::Handler(Box::new(e))
    }
}
