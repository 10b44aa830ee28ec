//! Connection entrypoint.
//!
//! ```text
//! call(scope) ─▶ ConnectionHandler::run(receive, send)
//!                  │
//!                  ├─ http.request* ─▶ accumulate body
//!                  ├─ http.disconnect ─▶ return, nothing sent
//!                  └─ more_body=false ─▶ Request ─▶ dispatch ─▶ emit
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::Instrument;
use uuid::Uuid;

use super::emitter::emit;
use crate::config::DispatchConfig;
use crate::core::{Error, Failure, Request, RequestOptions, Result};
use crate::dispatch::DispatchPipeline;
use crate::protocol::{ConnectionScope, Inbound, InboundEvent, Outbound};

/// Application entrypoint invoked once per connection.
#[derive(Clone)]
pub struct AsgiHandler {
    pipeline: Arc<DispatchPipeline>,
    options: RequestOptions,
    body_receive_timeout: Option<Duration>,
}

impl AsgiHandler {
    /// Create a handler with default request options and no body timeout.
    pub fn new(pipeline: Arc<DispatchPipeline>) -> Self {
        Self {
            pipeline,
            options: RequestOptions::default(),
            body_receive_timeout: None,
        }
    }

    /// Create a handler using the dispatch settings.
    pub fn from_config(pipeline: Arc<DispatchPipeline>, config: &DispatchConfig) -> Self {
        let options = RequestOptions {
            append_slash: config.append_slash,
            default_charset: config.default_charset,
            ..RequestOptions::default()
        };
        Self {
            pipeline,
            options,
            body_receive_timeout: config.body_receive_timeout,
        }
    }

    pub fn with_request_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Maximum wait for each inbound message while reading the body.
    pub fn with_body_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.body_receive_timeout = timeout;
        self
    }

    #[inline]
    pub fn pipeline(&self) -> &Arc<DispatchPipeline> {
        &self.pipeline
    }

    /// Accept a connection.
    ///
    /// Rejects non-HTTP scopes before any message is exchanged.
    pub fn call(&self, scope: ConnectionScope) -> Result<ConnectionHandler> {
        if !scope.is_http() {
            return Err(Error::UnsupportedScopeType(scope.scope_type));
        }
        Ok(ConnectionHandler {
            scope,
            handler: self.clone(),
        })
    }
}

/// Lifecycle of a single HTTP connection.
pub struct ConnectionHandler {
    scope: ConnectionScope,
    handler: AsgiHandler,
}

/// How body accumulation ended.
enum BodyOutcome {
    Complete(Bytes),
    Disconnected,
    TimedOut(Bytes, Duration),
}

impl ConnectionHandler {
    #[inline]
    pub fn scope(&self) -> &ConnectionScope {
        &self.scope
    }

    /// Read the body, dispatch and emit the response.
    ///
    /// A disconnect before the body is complete ends the lifecycle without
    /// sending anything.
    pub async fn run<R, S>(self, receive: &mut R, send: &mut S) -> Result<()>
    where
        R: Inbound + ?Sized,
        S: Outbound + ?Sized,
    {
        let span = tracing::info_span!(
            "connection",
            request_id = %Uuid::new_v4(),
            method = %self.scope.method,
            path = %self.scope.path,
        );
        self.lifecycle(receive, send).instrument(span).await
    }

    async fn lifecycle<R, S>(self, receive: &mut R, send: &mut S) -> Result<()>
    where
        R: Inbound + ?Sized,
        S: Outbound + ?Sized,
    {
        let pipeline = &self.handler.pipeline;
        let options = &self.handler.options;

        let response = match read_body(receive, self.handler.body_receive_timeout).await {
            BodyOutcome::Disconnected => {
                tracing::debug!("client disconnected before the body was complete");
                return Ok(());
            }
            BodyOutcome::Complete(body) => {
                let request = Request::from_scope(&self.scope, body, options)?;
                pipeline.dispatch(request).await?
            }
            BodyOutcome::TimedOut(partial, timeout) => {
                let request = Request::from_scope(&self.scope, partial, options)?;
                pipeline.respond_with_failure(request, Failure::RequestTimeout(timeout))
            }
        };

        emit(response, send).await
    }
}

async fn read_body<R>(receive: &mut R, timeout: Option<Duration>) -> BodyOutcome
where
    R: Inbound + ?Sized,
{
    let mut body = BytesMut::new();
    loop {
        let event = match timeout {
            Some(limit) => match tokio::time::timeout(limit, receive.receive()).await {
                Ok(event) => event,
                Err(_) => return BodyOutcome::TimedOut(body.freeze(), limit),
            },
            None => receive.receive().await,
        };

        match event {
            InboundEvent::Disconnect => return BodyOutcome::Disconnected,
            InboundEvent::Request { body: chunk, more_body } => {
                body.extend_from_slice(&chunk);
                if !more_body {
                    return BodyOutcome::Complete(body.freeze());
                }
            }
        }
    }
}
