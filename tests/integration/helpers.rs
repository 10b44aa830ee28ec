//! Test helpers and utilities

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tokio_asgi::asgi::AsgiHandler;
use tokio_asgi::config::ServerConfig;
use tokio_asgi::core::{
    Context, Cookie, Failure, Request, Response as AppResponse, StaticTemplate, TemplateResponse,
};
use tokio_asgi::dispatch::{
    AsyncHandler, DataSource, Databases, DispatchPipeline, RouteArgs, SyncHandler, Transaction,
    UrlPatterns, View,
};
use tokio_asgi::middleware::{MiddlewareChain, XFrameOptions, XFrameOptionsMiddleware};
use tokio_asgi::protocol::{ConnectionScope, InboundEvent, OutboundEvent};
use tokio_asgi::server::Server;
use tokio::sync::mpsc;

/// Shared transaction journal.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Data source recording begin/commit/rollback into a journal.
pub struct JournalSource {
    pub alias: &'static str,
    pub journal: Journal,
}

struct JournalTransaction {
    alias: &'static str,
    journal: Journal,
}

#[async_trait]
impl Transaction for JournalTransaction {
    async fn commit(self: Box<Self>) -> Result<(), Failure> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("commit:{}", self.alias));
        Ok(())
    }

    async fn rollback(self: Box<Self>) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("rollback:{}", self.alias));
    }
}

#[async_trait]
impl DataSource for JournalSource {
    fn alias(&self) -> &str {
        self.alias
    }

    fn atomic_requests(&self) -> bool {
        true
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, Failure> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("begin:{}", self.alias));
        Ok(Box::new(JournalTransaction {
            alias: self.alias,
            journal: Arc::clone(&self.journal),
        }))
    }
}

/// Route table shared by the lifecycle and transport tests.
pub fn app_urls(journal: &Journal) -> UrlPatterns {
    let test_view = View::new("TestView")
        .get(SyncHandler::new("get", |_req: &Request, _args: &RouteArgs| {
            Ok(Some(AppResponse::ok("ok")))
        }))
        .post(SyncHandler::new("post", |req: &Request, _args: &RouteArgs| {
            let post = req.post().map_err(Failure::handler)?;
            let message = post.get("message").unwrap_or_default().to_string();
            Ok(Some(AppResponse::ok(format!("message={}", message))))
        }));

    UrlPatterns::new()
        .with_databases(Databases::new().add(Arc::new(JournalSource {
            alias: "default",
            journal: Arc::clone(journal),
        })))
        .path("test/", test_view)
        .and_then(|urls| {
            urls.path(
                "items/<int:pk>/",
                SyncHandler::new("item", |_req: &Request, args: &RouteArgs| {
                    Ok(Some(AppResponse::ok(format!("item {}", args.get("pk").unwrap_or("?")))))
                }),
            )
        })
        .and_then(|urls| {
            urls.re_path(
                r"^archive/([0-9]{4})/$",
                SyncHandler::new("archive", |_req: &Request, args: &RouteArgs| {
                    Ok(Some(AppResponse::ok(format!("year {}", args.arg(0).unwrap_or("?")))))
                }),
            )
        })
        .and_then(|urls| {
            urls.path(
                "fail/",
                SyncHandler::new("fail", |_req: &Request, _args: &RouteArgs| {
                    Err(Failure::handler("database exploded"))
                }),
            )
        })
        .and_then(|urls| {
            urls.path(
                "none/",
                SyncHandler::new("forgetful", |_req: &Request, _args: &RouteArgs| Ok(None))
                    .with_scope("ForgetfulView"),
            )
        })
        .and_then(|urls| {
            urls.path(
                "meta/",
                SyncHandler::new("meta", |req: &Request, _args: &RouteArgs| {
                    let body = format!(
                        "accept={} length={} cookies_cached={}",
                        req.meta_value("HTTP_ACCEPT").unwrap_or(""),
                        req.content_length(),
                        std::ptr::eq(req.cookies(), req.cookies()),
                    );
                    Ok(Some(AppResponse::ok(body)))
                }),
            )
        })
        .and_then(|urls| {
            urls.path(
                "cookie/",
                SyncHandler::new("cookie", |_req: &Request, _args: &RouteArgs| {
                    let mut res = AppResponse::ok("set");
                    res.set_cookie(Cookie::new("sessionid", "abc"));
                    Ok(Some(res))
                }),
            )
        })
        .and_then(|urls| {
            urls.path(
                "template/",
                AsyncHandler::new("template", |_req: Arc<Request>, _args: RouteArgs| async {
                    let template = Arc::new(StaticTemplate::new(
                        "index.html",
                        "<p>{{ context_test }}</p>",
                    ));
                    let mut context = Context::new();
                    context.insert("context_test".into(), "Hello context test.".into());
                    Ok(Some(TemplateResponse::new(template, context)))
                }),
            )
        })
        .expect("valid routes")
}

/// Build the test application.
pub fn app(debug: bool, journal: &Journal) -> AsgiHandler {
    let middleware =
        MiddlewareChain::new().add(XFrameOptionsMiddleware::new(XFrameOptions::Deny));
    let pipeline = DispatchPipeline::new(Arc::new(app_urls(journal)))
        .with_debug(debug)
        .with_middleware(middleware);
    AsgiHandler::new(Arc::new(pipeline))
}

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Run one lifecycle over in-memory channels and collect what was sent.
pub async fn run_lifecycle(
    handler: &AsgiHandler,
    scope: ConnectionScope,
    inbound: Vec<InboundEvent>,
) -> tokio_asgi::core::Result<Vec<OutboundEvent>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    for event in inbound {
        tx.send(event).expect("receiver alive");
    }

    let mut sent = Vec::new();
    handler.call(scope)?.run(&mut rx, &mut sent).await?;
    Ok(sent)
}

/// Status of the start event.
pub fn start_status(events: &[OutboundEvent]) -> u16 {
    match events.first() {
        Some(OutboundEvent::ResponseStart { status, .. }) => *status,
        other => panic!("expected response start, got {:?}", other),
    }
}

/// Body of the body event.
pub fn body_text(events: &[OutboundEvent]) -> String {
    match events.get(1) {
        Some(OutboundEvent::ResponseBody { body, .. }) => String::from_utf8_lossy(body).into_owned(),
        other => panic!("expected response body, got {:?}", other),
    }
}

/// Test server bound to an ephemeral port
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    server: Arc<Server>,
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server for the test application
    pub async fn start() -> Self {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        let server = Server::bind(&config, app(false, &journal()))
            .await
            .expect("Failed to bind test server");
        let server = Arc::new(server);

        let running = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = running.run().await;
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{}", server.local_addr()),
            client,
            server,
        }
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// Make a GET request with custom headers
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> Response {
        let mut req = self.client.get(format!("{}{}", self.base_url, path));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await.expect("GET request failed")
    }

    /// Make a POST request with form data
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a request with an arbitrary method
    pub async fn request(&self, method: reqwest::Method, path: &str) -> Response {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("request failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.trigger_shutdown();
    }
}

/// Assert response status
pub fn assert_status(resp: &Response, expected: StatusCode) {
    assert_eq!(
        resp.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        resp.status()
    );
}

/// Assert header value
pub fn assert_header(resp: &Response, name: &str, expected: &str) {
    let value = resp
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| panic!("Missing header: {}", name));
    assert_eq!(value, expected, "Header {} mismatch", name);
}

/// Assert body equals expected text
pub async fn assert_body_eq(resp: Response, expected: &str) {
    let body = resp.text().await.expect("Failed to read body");
    assert_eq!(body, expected);
}
