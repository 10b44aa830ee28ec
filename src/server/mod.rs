//! HTTP transport for the ASGI handler.
//!
//! # Architecture
//!
//! ```text
//! TcpListener ─▶ ConnectionContext (hyper auto: HTTP/1.1 + HTTP/2)
//!                   │
//!                   ├─ request head ─▶ ConnectionScope
//!                   ├─ body frames  ─▶ InboundEvent channel
//!                   └─ AsgiHandler  ─▶ OutboundEvents ─▶ hyper response
//! ```
//!
//! # Graceful Shutdown
//!
//! [`Server::trigger_shutdown`] stops the accept loop; in-flight connections
//! finish on their own and [`Server::wait_for_drain`] waits for them.
//!
//! ```rust,ignore
//! let server = Server::bind(&config.server, handler).await?;
//! tokio::select! {
//!     result = server.run() => result?,
//!     _ = tokio::signal::ctrl_c() => server.trigger_shutdown(),
//! }
//! server.wait_for_drain(config.server.drain_timeout).await;
//! ```

mod connection;
mod scope;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub use scope::build_scope;

use crate::asgi::AsgiHandler;
use crate::config::ServerConfig;
use connection::ConnectionContext;

/// HTTP server driving an [`AsgiHandler`].
pub struct Server {
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    /// Active connection count
    active_connections: Arc<AtomicUsize>,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloneable)
    shutdown_rx: watch::Receiver<bool>,
    /// Shutdown initiated flag
    shutdown_initiated: AtomicBool,
}

impl Server {
    /// Bind the listen address.
    pub async fn bind(config: &ServerConfig, handler: AsgiHandler) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let active_connections = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let ctx = Arc::new(ConnectionContext {
            handler,
            local_addr,
            active_connections: Arc::clone(&active_connections),
            access_log: config.access_log,
            http2_max_streams: config.http2_max_streams,
        });

        Ok(Self {
            listener,
            ctx,
            active_connections,
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: AtomicBool::new(false),
        })
    }

    /// Address the listener is bound to.
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.ctx.local_addr
    }

    /// Accept connections until shutdown is triggered.
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Server listening on http://{}", self.local_addr());

        let mut shutdown_rx = self.shutdown_rx.clone();
        let stopped = *shutdown_rx.borrow();
        if stopped {
            return Ok(());
        }

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Accept error: {}", e);
                            continue;
                        }
                    };

                    let _ = stream.set_nodelay(true);

                    // Set TCP keepalive
                    let keepalive = TcpKeepalive::new()
                        .with_time(Duration::from_secs(5))
                        .with_interval(Duration::from_secs(1))
                        .with_retries(3);
                    let _ = SockRef::from(&stream).set_tcp_keepalive(&keepalive);

                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        ctx.handle_connection(stream, remote_addr).await;
                    });
                }
                _ = shutdown_rx.changed() => {
                    debug!("Received shutdown signal, stopping accept loop");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Trigger graceful shutdown.
    /// Stops accepting new connections.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Number of connections currently being served.
    #[inline]
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Wait for all active connections to drain.
    /// Returns true if drained successfully, false if timeout was reached.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let check_interval = Duration::from_millis(100);

        loop {
            let active = self.active_connections();
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!("Drain timeout reached with {} active connections", active);
                return false;
            }

            debug!("Waiting for {} connections to drain...", active);
            tokio::time::sleep(check_interval).await;
        }
    }
}
