//! tokio_asgi - Async request adapter and dispatch pipeline powered by Tokio.
//!
//! A transport hands each connection a [`protocol::ConnectionScope`] and two
//! message channel halves. The adapter accumulates the body, builds a
//! [`core::Request`], routes it through the [`dispatch::DispatchPipeline`]
//! and emits the final [`core::Response`] as exactly two protocol messages.
//!
//! # Features
//!
//! - **Protocol adapter**: scope and message types, mpsc channel halves
//! - **Routing**: `path()` converters and `re_path()` regexes
//! - **Views**: explicit verb to handler mapping, sync and async handlers
//! - **Atomic requests**: per-handler transactions over registered data sources
//! - **Middleware Pipeline**: Composable request/response middleware
//! - **HTTP transport**: HTTP/1.1 and HTTP/2 via hyper
//! - **Logging**: Structured JSON logging with tracing
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_asgi::asgi::AsgiHandler;
//! use tokio_asgi::core::Response;
//! use tokio_asgi::dispatch::{DispatchPipeline, SyncHandler, UrlPatterns};
//!
//! let urls = UrlPatterns::new().path(
//!     "test/",
//!     SyncHandler::new("test", |_req, _args| Ok(Some(Response::ok("ok")))),
//! )?;
//! let handler = AsgiHandler::new(Arc::new(DispatchPipeline::new(Arc::new(urls))));
//! handler.call(scope)?.run(&mut receive, &mut send).await?;
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars), or the `BUILD_VERSION` override
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod asgi;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod logging;
pub mod middleware;
pub mod protocol;
pub mod server;

// Re-exports for convenience
pub use asgi::{AsgiHandler, ConnectionHandler};
pub use config::Config;
pub use server::Server;
