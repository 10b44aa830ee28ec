//! Middleware chain for composing multiple middleware.

use std::sync::Arc;

use super::{Middleware, MiddlewareResult};
use crate::core::{Failure, Request, Response};

/// A chain of middleware that processes requests and responses in order.
///
/// Middleware are executed in priority order for requests (lowest first)
/// and in reverse order for responses.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Add a middleware to the chain.
    ///
    /// Middleware are automatically sorted by priority.
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self.middlewares.sort_by_key(|m| m.priority());
        self
    }

    /// Add a middleware wrapped in Arc to the chain.
    pub fn add_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self.middlewares.sort_by_key(|m| m.priority());
        self
    }

    /// Get the number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Get middleware names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Process a request through all middleware.
    ///
    /// Stops at the first middleware that short-circuits or fails.
    pub fn process_request(&self, req: &mut Request) -> Result<MiddlewareResult, Failure> {
        for mw in &self.middlewares {
            match mw.on_request(req)? {
                MiddlewareResult::Next => {}
                MiddlewareResult::Stop(res) => {
                    tracing::debug!(
                        middleware = mw.name(),
                        status = %res.status(),
                        "middleware short-circuited request"
                    );
                    return Ok(MiddlewareResult::Stop(res));
                }
            }
        }
        Ok(MiddlewareResult::Next)
    }

    /// Process a response through all middleware in reverse order.
    pub fn process_response(&self, req: &Request, mut res: Response) -> Response {
        for mw in self.middlewares.iter().rev() {
            res = mw.on_response(req, res);
        }
        res
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MiddlewareChain {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
        }
    }
}
