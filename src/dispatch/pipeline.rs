//! Request dispatch.
//!
//! One dispatch per request, terminal on the first response:
//!
//! ```text
//! middleware ─▶ ROUTING ─▶ INVOKING ─▶ RENDERING ─▶ middleware ─▶ LOGGING ─▶ DONE
//!                  │           │           │
//!                  └───────────┴───────────┴──▶ translate failure
//! ```
//!
//! Every failure is translated into a response. The only error that leaves
//! [`DispatchPipeline::dispatch`] is a handler contract violation in debug
//! mode.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use super::resolver::{Resolver, RouteMatch};
use super::translator::{DefaultTranslator, ExceptionTranslator};
use crate::core::{Error, Failure, Request, Response, Result};
use crate::middleware::{MiddlewareChain, MiddlewareResult};

/// Routes, invokes and finalizes requests.
pub struct DispatchPipeline {
    resolver: Arc<dyn Resolver>,
    translator: Arc<dyn ExceptionTranslator>,
    custom_translator: bool,
    middleware: MiddlewareChain,
    debug: bool,
}

impl DispatchPipeline {
    /// Create a pipeline with the default translator and no middleware.
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            translator: Arc::new(DefaultTranslator::default()),
            custom_translator: false,
            middleware: MiddlewareChain::new(),
            debug: false,
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn ExceptionTranslator>) -> Self {
        self.translator = translator;
        self.custom_translator = true;
        self
    }

    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    /// Development mode: contract violations propagate as errors and the
    /// default translator includes failure details. A translator installed
    /// with [`with_translator`](Self::with_translator) is kept as is.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        if !self.custom_translator {
            self.translator = Arc::new(DefaultTranslator::new(debug));
        }
        self
    }

    #[inline]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    #[inline]
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Produce the final response for a request.
    pub async fn dispatch(&self, mut request: Request) -> Result<Response> {
        let routed = match self.middleware.process_request(&mut request) {
            Ok(MiddlewareResult::Next) => self.resolve(&request),
            Ok(MiddlewareResult::Stop(res)) => return Ok(self.finish(&request, Ok(res))),
            Err(failure) => Err(failure),
        };

        let route = match routed {
            Ok(route) => route,
            Err(failure) => return Ok(self.finish(&request, Err(failure))),
        };

        request.set_resolver_match(route.clone());
        let request = Arc::new(request);
        let outcome = self.invoke(&route, &request).await?;
        Ok(self.finish(&request, outcome))
    }

    /// Produce the final response for a request that failed before dispatch.
    pub fn respond_with_failure(&self, request: Request, failure: Failure) -> Response {
        self.finish(&request, Err(failure))
    }

    fn resolve(&self, request: &Request) -> std::result::Result<RouteMatch, Failure> {
        request
            .urlconf()
            .unwrap_or(&self.resolver)
            .resolve(request.path_info())
    }

    async fn invoke(
        &self,
        route: &RouteMatch,
        request: &Arc<Request>,
    ) -> Result<std::result::Result<Response, Failure>> {
        let handler = &route.handler;
        let call = handler.call(Arc::clone(request), route.args.clone());

        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(Failure::Internal(panic_message(panic.as_ref()))),
        };

        match result {
            Ok(Some(response)) => Ok(Ok(response)),
            Ok(None) => {
                let violation = Error::HandlerContractViolation {
                    handler: handler.name().to_string(),
                    scope: handler.scope().to_string(),
                };
                if self.debug {
                    return Err(violation);
                }
                Ok(Err(Failure::Internal(violation.to_string())))
            }
            Err(failure) => Ok(Err(failure)),
        }
    }

    /// Translate, render, run response middleware and log.
    fn finish(&self, request: &Request, outcome: std::result::Result<Response, Failure>) -> Response {
        let (mut response, mut failure) = match outcome {
            Ok(response) => (response, None),
            Err(failure) => (self.translator.translate(request, &failure), Some(failure)),
        };

        if let Err(render_failure) = response.render() {
            response = self.translator.translate(request, &render_failure);
            if response.render().is_err() {
                response = Response::internal_error("Internal Server Error");
            }
            failure = Some(render_failure);
        }

        let response = self.middleware.process_response(request, response);
        log_response(request, &response, failure.as_ref());
        response
    }
}

/// Emit one record for error responses.
fn log_response(request: &Request, response: &Response, failure: Option<&Failure>) {
    let status = response.status();
    if status.as_u16() < 400 {
        return;
    }

    let reason = response.reason_phrase();
    let error = failure.map(ToString::to_string);

    if status.is_server_error() {
        tracing::error!(
            target: "request",
            status = status.as_u16(),
            reason,
            method = request.method(),
            path = request.path(),
            error = error.as_deref(),
            "{}: {}",
            reason,
            request.path()
        );
    } else {
        tracing::warn!(
            target: "request",
            status = status.as_u16(),
            reason,
            method = request.method(),
            path = request.path(),
            error = error.as_deref(),
            "{}: {}",
            reason,
            request.path()
        );
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Render, RequestOptions, StaticTemplate, Template, TemplateResponse,
    };
    use crate::dispatch::handler::{AsyncHandler, RouteArgs, SyncHandler};
    use crate::dispatch::resolver::UrlPatterns;
    use crate::middleware::{Middleware, XFrameOptionsMiddleware};
    use crate::protocol::ConnectionScope;
    use bytes::Bytes;
    use http::StatusCode;
    use serde_json::json;
    use tracing_test::traced_test;

    struct BrokenRender;

    impl Render for BrokenRender {
        fn render(&self) -> std::result::Result<Bytes, Failure> {
            Err(Failure::Internal("template exploded".to_string()))
        }
    }

    fn routes() -> Arc<dyn Resolver> {
        let template: Arc<dyn Template> =
            Arc::new(StaticTemplate::new("greeting.html", "<p>{{ greeting }}</p>"));

        Arc::new(
            UrlPatterns::new()
                .path(
                    "ok/",
                    SyncHandler::new("ok", |_req: &Request, _args: &RouteArgs| {
                        Ok(Some(Response::ok("ok")))
                    }),
                )
                .unwrap()
                .path(
                    "fail/",
                    SyncHandler::new("fail", |_req: &Request, _args: &RouteArgs| {
                        Err(Failure::handler("database unavailable"))
                    }),
                )
                .unwrap()
                .path(
                    "nothing/",
                    SyncHandler::new("nothing", |_req: &Request, _args: &RouteArgs| Ok(None))
                        .with_scope("app.views"),
                )
                .unwrap()
                .path(
                    "panic/",
                    SyncHandler::new("panic", |_req: &Request, _args: &RouteArgs| {
                        panic!("kaboom")
                    }),
                )
                .unwrap()
                .path(
                    "template/",
                    AsyncHandler::new("template", move |_req: Arc<Request>, _args| {
                        let template = Arc::clone(&template);
                        async move {
                            let context = json!({"greeting": "hello"});
                            let context = context.as_object().cloned().unwrap_or_default();
                            Ok(Some(TemplateResponse::new(template, context)))
                        }
                    }),
                )
                .unwrap()
                .path(
                    "broken-template/",
                    SyncHandler::new("broken", |_req: &Request, _args: &RouteArgs| {
                        Ok(Some(Response::deferred(StatusCode::OK, BrokenRender)))
                    }),
                )
                .unwrap()
                .path(
                    "echo/<int:pk>/",
                    SyncHandler::new("echo", |req: &Request, args: &RouteArgs| {
                        let route = req
                            .resolver_match()
                            .map(|m| m.route.clone())
                            .unwrap_or_default();
                        Ok(Some(Response::ok(format!(
                            "{}:{}",
                            route,
                            args.get("pk").unwrap_or("")
                        ))))
                    }),
                )
                .unwrap(),
        )
    }

    fn request(path: &str) -> Request {
        let scope = ConnectionScope::http("GET", path);
        Request::from_scope(&scope, Bytes::new(), &RequestOptions::default()).unwrap()
    }

    fn body(response: &Response) -> String {
        String::from_utf8(response.content().unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_success() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/ok/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(&res), "ok");
    }

    #[tokio::test]
    async fn test_route_args_and_resolver_match() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/echo/42/")).await.unwrap();
        assert_eq!(body(&res), "echo/<int:pk>/:42");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_not_found_logged_as_warning() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/missing/")).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(logs_contain("WARN"));
        assert!(logs_contain("Not Found: /missing/"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_handler_failure_is_500_and_logged_once() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/fail/")).await.unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        logs_assert(|lines: &[&str]| {
            let records = lines
                .iter()
                .filter(|line| line.contains("Internal Server Error: /fail/"))
                .count();
            match records {
                1 => Ok(()),
                n => Err(format!("expected one record, found {}", n)),
            }
        });
        assert!(logs_contain("database unavailable"));
        assert!(logs_contain("ERROR"));
    }

    #[tokio::test]
    async fn test_contract_violation_in_production() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/nothing/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_contract_violation_in_debug() {
        let pipeline = DispatchPipeline::new(routes()).with_debug(true);
        let err = pipeline.dispatch(request("/nothing/")).await.unwrap_err();

        match err {
            Error::HandlerContractViolation { handler, scope } => {
                assert_eq!(handler, "nothing");
                assert_eq!(scope, "app.views");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let pipeline = DispatchPipeline::new(routes()).with_debug(true);
        let res = pipeline.dispatch(request("/panic/")).await.unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(&res).contains("kaboom"));
    }

    #[tokio::test]
    async fn test_deferred_response_rendered() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/template/")).await.unwrap();

        assert!(res.is_rendered());
        assert_eq!(body(&res), "<p>hello</p>");
    }

    #[tokio::test]
    async fn test_render_failure_translated() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.dispatch(request("/broken-template/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_response_middleware_runs_on_errors() {
        let pipeline = DispatchPipeline::new(routes())
            .with_middleware(MiddlewareChain::new().add(XFrameOptionsMiddleware::default()));

        let res = pipeline.dispatch(request("/missing/")).await.unwrap();
        assert_eq!(res.header("x-frame-options"), Some("SAMEORIGIN"));
    }

    #[tokio::test]
    async fn test_request_middleware_failure_translated() {
        struct DenyAll;

        impl Middleware for DenyAll {
            fn name(&self) -> &'static str {
                "deny_all"
            }

            fn on_request(
                &self,
                _req: &mut Request,
            ) -> std::result::Result<MiddlewareResult, Failure> {
                Err(Failure::PermissionDenied("nope".to_string()))
            }
        }

        let pipeline =
            DispatchPipeline::new(routes()).with_middleware(MiddlewareChain::new().add(DenyAll));
        let res = pipeline.dispatch(request("/ok/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_per_request_urlconf() {
        struct Override;

        impl Middleware for Override {
            fn name(&self) -> &'static str {
                "override"
            }

            fn on_request(
                &self,
                req: &mut Request,
            ) -> std::result::Result<MiddlewareResult, Failure> {
                let alt = UrlPatterns::new()
                    .path(
                        "missing/",
                        SyncHandler::new("alt", |_req: &Request, _args: &RouteArgs| {
                            Ok(Some(Response::ok("alt")))
                        }),
                    )
                    .map_err(Failure::from)?;
                req.set_urlconf(Arc::new(alt));
                Ok(MiddlewareResult::Next)
            }
        }

        let pipeline =
            DispatchPipeline::new(routes()).with_middleware(MiddlewareChain::new().add(Override));
        let res = pipeline.dispatch(request("/missing/")).await.unwrap();
        assert_eq!(body(&res), "alt");
    }

    struct Teapot;

    impl ExceptionTranslator for Teapot {
        fn translate(&self, _request: &Request, _failure: &Failure) -> Response {
            Response::empty(StatusCode::IM_A_TEAPOT)
        }
    }

    #[tokio::test]
    async fn test_custom_translator_survives_debug() {
        let pipeline = DispatchPipeline::new(routes())
            .with_translator(Arc::new(Teapot))
            .with_debug(true);
        assert!(pipeline.is_debug());

        let res = pipeline.dispatch(request("/missing/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);

        let pipeline = DispatchPipeline::new(routes())
            .with_debug(true)
            .with_translator(Arc::new(Teapot));
        let res = pipeline.dispatch(request("/missing/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_respond_with_failure() {
        let pipeline = DispatchPipeline::new(routes());
        let res = pipeline.respond_with_failure(
            request("/ok/"),
            Failure::RequestTimeout(std::time::Duration::from_secs(60)),
        );
        assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    }
}
