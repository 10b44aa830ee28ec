//! Handlers and class-style views.
//!
//! Synchronous and asynchronous handlers share one capability: a call that
//! produces a response, possibly after suspending. A synchronous handler is
//! simply one that never suspends.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use http::{Method, StatusCode};

use crate::core::{allow_value, Error, Failure, Request, Response, Result};

/// Arguments captured by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    /// Unnamed captures, in pattern order.
    pub args: Vec<String>,
    /// Named captures.
    pub kwargs: HashMap<String, String>,
}

impl RouteArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a named capture.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }

    /// Get an unnamed capture by position.
    #[inline]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}

/// Outcome of a handler call.
///
/// `Ok(None)` means the handler produced no response, which the pipeline
/// reports as a contract violation.
pub type HandlerResult = std::result::Result<Option<Response>, Failure>;

/// A unit of application logic bound to a route.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handler name, used in diagnostics.
    fn name(&self) -> &str;

    /// Declaring scope (module, view class), used in diagnostics.
    fn scope(&self) -> &str {
        ""
    }

    /// Data source aliases excluded from atomic wrapping.
    fn non_atomic(&self) -> &[String] {
        &[]
    }

    /// Handle a request.
    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult;
}

/// Handler backed by a plain function.
pub struct SyncHandler<F> {
    name: String,
    scope: String,
    func: F,
}

impl<F> SyncHandler<F>
where
    F: Fn(&Request, &RouteArgs) -> HandlerResult + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            func,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[async_trait]
impl<F> Handler for SyncHandler<F>
where
    F: Fn(&Request, &RouteArgs) -> HandlerResult + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult {
        (self.func)(&request, &args)
    }
}

/// Handler backed by an async function.
pub struct AsyncHandler<F> {
    name: String,
    scope: String,
    func: F,
}

impl<F, Fut> AsyncHandler<F>
where
    F: Fn(Arc<Request>, RouteArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            func,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Handler for AsyncHandler<F>
where
    F: Fn(Arc<Request>, RouteArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult {
        (self.func)(request, args).await
    }
}

/// Verbs a view may register handlers for.
const VIEW_METHODS: [&str; 8] = [
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE",
];

/// Explicit verb to handler mapping for one route.
///
/// `HEAD` falls back to the `GET` handler, `OPTIONS` is answered with the
/// allowed verbs, any other unmapped verb fails with
/// [`Failure::MethodNotAllowed`].
pub struct View {
    name: String,
    scope: String,
    handlers: Vec<(Method, Arc<dyn Handler>)>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: String::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Map a verb to a handler, replacing any earlier mapping.
    pub fn route(mut self, method: Method, handler: Arc<dyn Handler>) -> Self {
        self.handlers.retain(|(m, _)| *m != method);
        self.handlers.push((method, handler));
        self
    }

    /// Map a verb given by name. Unknown verbs are rejected.
    pub fn on(self, verb: &str, handler: Arc<dyn Handler>) -> Result<Self> {
        let upper = verb.to_ascii_uppercase();
        if !VIEW_METHODS.contains(&upper.as_str()) {
            return Err(Error::InvalidRoute {
                pattern: self.name.clone(),
                message: format!("'{}' is not a supported HTTP verb", verb),
            });
        }
        let method = Method::from_bytes(upper.as_bytes()).map_err(|e| Error::InvalidRoute {
            pattern: self.name.clone(),
            message: e.to_string(),
        })?;
        Ok(self.route(method, handler))
    }

    pub fn get(self, handler: impl Handler + 'static) -> Self {
        self.route(Method::GET, Arc::new(handler))
    }

    pub fn post(self, handler: impl Handler + 'static) -> Self {
        self.route(Method::POST, Arc::new(handler))
    }

    pub fn put(self, handler: impl Handler + 'static) -> Self {
        self.route(Method::PUT, Arc::new(handler))
    }

    pub fn patch(self, handler: impl Handler + 'static) -> Self {
        self.route(Method::PATCH, Arc::new(handler))
    }

    pub fn delete(self, handler: impl Handler + 'static) -> Self {
        self.route(Method::DELETE, Arc::new(handler))
    }

    /// Verbs this view answers, in `VIEW_METHODS` order.
    pub fn allowed_methods(&self) -> Vec<Method> {
        VIEW_METHODS
            .iter()
            .filter_map(|verb| Method::from_bytes(verb.as_bytes()).ok())
            .filter(|method| {
                *method == Method::OPTIONS
                    || self.find(method).is_some()
                    || (*method == Method::HEAD && self.find(&Method::GET).is_some())
            })
            .collect()
    }

    fn find(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, h)| h)
    }

    fn options(&self) -> Response {
        Response::empty(StatusCode::OK)
            .with_header("allow", allow_value(&self.allowed_methods()))
            .with_header("content-length", "0")
    }
}

#[async_trait]
impl Handler for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult {
        let method = Method::from_bytes(request.method().as_bytes()).ok();

        let handler = method.as_ref().and_then(|m| {
            self.find(m).or_else(|| {
                if *m == Method::HEAD {
                    self.find(&Method::GET)
                } else {
                    None
                }
            })
        });

        match handler {
            Some(handler) => handler.call(request, args).await,
            None if method == Some(Method::OPTIONS) => Ok(Some(self.options())),
            None => Err(Failure::MethodNotAllowed {
                method: request.method().to_string(),
                allowed: self.allowed_methods(),
            }),
        }
    }
}

/// Excludes data sources from atomic wrapping for one handler.
pub struct NonAtomic {
    inner: Arc<dyn Handler>,
    aliases: Vec<String>,
}

impl NonAtomic {
    pub fn new<I, S>(inner: Arc<dyn Handler>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut excluded: Vec<String> = inner.non_atomic().to_vec();
        for alias in aliases {
            let alias = alias.into();
            if !excluded.contains(&alias) {
                excluded.push(alias);
            }
        }
        Self {
            inner,
            aliases: excluded,
        }
    }
}

#[async_trait]
impl Handler for NonAtomic {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn scope(&self) -> &str {
        self.inner.scope()
    }

    fn non_atomic(&self) -> &[String] {
        &self.aliases
    }

    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult {
        self.inner.call(request, args).await
    }
}
