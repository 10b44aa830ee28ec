//! Per-connection HTTP handling.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::scope::build_scope;
use crate::asgi::AsgiHandler;
use crate::protocol::{InboundEvent, OutboundEvent};

/// Inbound channel depth per request.
const BODY_CHANNEL_CAPACITY: usize = 8;

/// Check if an error is a common connection reset or timeout.
#[inline]
fn is_connection_error(err_str: &str) -> bool {
    err_str.contains("connection reset")
        || err_str.contains("broken pipe")
        || err_str.contains("Connection reset")
        || err_str.contains("os error 104")
        || err_str.contains("os error 32")
        || err_str.contains("timed out")
        || err_str.contains("HeaderTimeout")
}

/// Shared state for every connection accepted by one server.
pub struct ConnectionContext {
    pub handler: AsgiHandler,
    pub local_addr: SocketAddr,
    pub active_connections: Arc<AtomicUsize>,
    /// Emit `access` records.
    pub access_log: bool,
    pub http2_max_streams: u32,
}

/// Decrements the active connection count on every exit path.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl ConnectionContext {
    /// Serve an accepted TCP connection over HTTP/1.1 or HTTP/2.
    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, remote_addr: SocketAddr) {
        let _active = ActiveGuard::new(&self.active_connections);

        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.handle_request(req, remote_addr).await }
        });

        let io = TokioIo::new(stream);
        if let Err(err) = auto::Builder::new(TokioExecutor::new())
            .http1()
            .timer(TokioTimer::new())
            .keep_alive(true)
            .http2()
            .max_concurrent_streams(self.http2_max_streams)
            .serve_connection(io, service)
            .await
        {
            let err_str = format!("{:?}", err);
            if !is_connection_error(&err_str) {
                debug!("Connection error: {:?}", err);
            }
        }
    }

    async fn handle_request(
        &self,
        req: Request<IncomingBody>,
        remote_addr: SocketAddr,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let scope = build_scope(&parts, remote_addr, self.local_addr);

        let connection = match self.handler.call(scope) {
            Ok(connection) => connection,
            Err(e) => {
                error!("Rejected connection scope: {}", e);
                return Ok(fallback_response());
            }
        };

        let (tx, mut rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        tokio::spawn(pump_body(body, tx));

        let mut sent: Vec<OutboundEvent> = Vec::with_capacity(2);
        if let Err(e) = connection.run(&mut rx, &mut sent).await {
            error!(
                method = %parts.method,
                path = parts.uri.path(),
                error = %e,
                "Request lifecycle failed"
            );
            return Ok(fallback_response());
        }

        let response = into_hyper_response(sent);
        if self.access_log {
            tracing::info!(
                target: "access",
                method = %parts.method,
                path = parts.uri.path(),
                status = response.status().as_u16(),
                client = %remote_addr.ip(),
                duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            );
        }
        Ok(response)
    }
}

/// Forward body frames as inbound events until the body ends.
async fn pump_body(mut body: IncomingBody, tx: mpsc::Sender<InboundEvent>) {
    loop {
        let event = match body.frame().await {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => InboundEvent::chunk(data),
                // Trailers
                Err(_) => continue,
            },
            Some(Err(e)) => {
                debug!("Request body aborted: {}", e);
                InboundEvent::Disconnect
            }
            None => InboundEvent::last(Bytes::new()),
        };

        let done = !matches!(event, InboundEvent::Request { more_body: true, .. });
        if tx.send(event).await.is_err() || done {
            return;
        }
    }
}

/// Turn the emitted start and body events into a hyper response.
///
/// A lifecycle that sent nothing (client disconnected) yields an empty 400;
/// the client is no longer reading it.
fn into_hyper_response(events: Vec<OutboundEvent>) -> Response<Full<Bytes>> {
    let mut builder = Response::builder();
    let mut body = Bytes::new();
    let mut started = false;

    for event in events {
        match event {
            OutboundEvent::ResponseStart { status, headers } => {
                started = true;
                builder = builder.status(status);
                for (name, value) in headers {
                    builder = builder.header(&name[..], &value[..]);
                }
            }
            OutboundEvent::ResponseBody { body: chunk, .. } => body = chunk,
        }
    }

    if !started {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::BAD_REQUEST;
        return response;
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        error!("Invalid response from application: {}", e);
        fallback_response()
    })
}

fn fallback_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
