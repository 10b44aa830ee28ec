//! Middleware pipeline for request/response processing.
//!
//! Middleware can:
//! - Inspect and modify incoming requests
//! - Short-circuit dispatch and return early responses
//! - Fail the request with a [`Failure`], which is translated like any
//!   handler failure
//! - Modify outgoing responses, including translated error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio_asgi::middleware::{Middleware, MiddlewareResult, MiddlewareChain};
//! use tokio_asgi::core::{Failure, Request, Response};
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str { "logging" }
//!
//!     fn on_request(&self, req: &mut Request) -> Result<MiddlewareResult, Failure> {
//!         tracing::info!("Request: {} {}", req.method(), req.path());
//!         Ok(MiddlewareResult::Next)
//!     }
//!
//!     fn on_response(&self, _req: &Request, res: Response) -> Response {
//!         tracing::info!("Response: {}", res.status());
//!         res
//!     }
//! }
//!
//! let chain = MiddlewareChain::new().add(LoggingMiddleware);
//! ```

mod chain;
mod xframe;

pub use chain::MiddlewareChain;
pub use xframe::{XFrameOptions, XFrameOptionsMiddleware};

use crate::core::{Failure, Request, Response};

/// Result of middleware request processing.
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to the next middleware.
    Next,
    /// Stop the middleware chain and return this response immediately.
    Stop(Response),
}

impl MiddlewareResult {
    /// Check if this result continues the chain.
    pub fn is_next(&self) -> bool {
        matches!(self, MiddlewareResult::Next)
    }

    /// Check if this result stops the chain.
    pub fn is_stop(&self) -> bool {
        matches!(self, MiddlewareResult::Stop(_))
    }

    /// Unwrap the response if this is a Stop result.
    pub fn into_response(self) -> Option<Response> {
        match self {
            MiddlewareResult::Next => None,
            MiddlewareResult::Stop(res) => Some(res),
        }
    }
}

/// Trait for implementing middleware.
///
/// The pipeline executes `on_request` in order and `on_response` in
/// reverse order.
///
/// # Lifecycle
///
/// ```text
/// Request → MW1.on_request → MW2.on_request → Resolver → Handler
///                                                           ↓
/// Response ← MW1.on_response ← MW2.on_response ← Translate/Render
/// ```
pub trait Middleware: Send + Sync {
    /// Unique name for this middleware (used for logging/debugging).
    fn name(&self) -> &'static str;

    /// Priority for ordering in the chain.
    /// Lower values execute first for requests, last for responses.
    /// Default is 0.
    ///
    /// Suggested priority ranges:
    /// - -100..-50: Security (auth, host checks)
    /// - -50..0: Logging, tracing
    /// - 0..50: Request modification
    /// - 50..100: Response modification (security headers)
    fn priority(&self) -> i32 {
        0
    }

    /// Process an incoming request.
    ///
    /// Return `Ok(MiddlewareResult::Next)` to continue the chain,
    /// `Ok(MiddlewareResult::Stop(res))` to short-circuit with a response,
    /// or a failure to have it translated into an error response.
    fn on_request(&self, _req: &mut Request) -> Result<MiddlewareResult, Failure> {
        Ok(MiddlewareResult::Next)
    }

    /// Process an outgoing response.
    ///
    /// Called in reverse order once the response is final.
    fn on_response(&self, _req: &Request, res: Response) -> Response {
        res
    }
}
