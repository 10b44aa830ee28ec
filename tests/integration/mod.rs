//! Integration tests for tokio_asgi
//!
//! `lifecycle` drives the adapter over in-memory channels; `http_transport`
//! binds a real server on an ephemeral port and talks to it with reqwest.
//!
//! Run with: cargo test --test integration

mod helpers;

mod http_transport;
mod lifecycle;
