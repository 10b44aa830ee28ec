//! Atomic request wrapping.
//!
//! Every registered data source with `atomic_requests` enabled opens a
//! transaction before the handler runs. Transactions commit when the handler
//! returns and roll back when it fails, in reverse order of opening.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::handler::{Handler, HandlerResult, RouteArgs};
use crate::core::{Failure, Request};

/// An open transaction.
///
/// Implementations must roll back when dropped without a commit, so handles
/// held by a cancelled request are always released.
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<(), Failure>;
    async fn rollback(self: Box<Self>);
}

/// A transactional data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Alias the source is registered under.
    fn alias(&self) -> &str;

    /// Check if handlers should run inside a transaction on this source.
    fn atomic_requests(&self) -> bool;

    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, Failure>;
}

/// Registered data sources.
#[derive(Clone, Default)]
pub struct Databases {
    sources: Vec<Arc<dyn DataSource>>,
}

impl Databases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data source.
    pub fn add(mut self, source: Arc<dyn DataSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Get a data source by alias.
    pub fn get(&self, alias: &str) -> Option<&Arc<dyn DataSource>> {
        self.sources.iter().find(|s| s.alias() == alias)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn DataSource>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for Databases {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sources.iter().map(|s| s.alias()))
            .finish()
    }
}

/// Wrap `handler` in a transaction on every enrolled data source.
///
/// Sources without `atomic_requests` or excluded by the handler's
/// [`Handler::non_atomic`] list are skipped. Returns the handler unchanged
/// when nothing applies.
pub fn make_atomic(handler: Arc<dyn Handler>, databases: &Databases) -> Arc<dyn Handler> {
    let sources: Vec<Arc<dyn DataSource>> = databases
        .iter()
        .filter(|s| s.atomic_requests())
        .filter(|s| !handler.non_atomic().iter().any(|alias| alias == s.alias()))
        .cloned()
        .collect();

    if sources.is_empty() {
        return handler;
    }
    Arc::new(Atomic {
        inner: handler,
        sources,
    })
}

struct Atomic {
    inner: Arc<dyn Handler>,
    sources: Vec<Arc<dyn DataSource>>,
}

impl Atomic {
    async fn rollback_all(open: Vec<Box<dyn Transaction>>) {
        for tx in open.into_iter().rev() {
            tx.rollback().await;
        }
    }
}

#[async_trait]
impl Handler for Atomic {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn scope(&self) -> &str {
        self.inner.scope()
    }

    fn non_atomic(&self) -> &[String] {
        self.inner.non_atomic()
    }

    async fn call(&self, request: Arc<Request>, args: RouteArgs) -> HandlerResult {
        let mut open = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.begin().await {
                Ok(tx) => open.push(tx),
                Err(failure) => {
                    Self::rollback_all(open).await;
                    return Err(failure);
                }
            }
        }

        let result = self.inner.call(request, args).await;

        if result.is_err() {
            Self::rollback_all(open).await;
            return result;
        }

        while let Some(tx) = open.pop() {
            if let Err(failure) = tx.commit().await {
                tracing::error!(
                    target: "request",
                    handler = self.inner.name(),
                    error = %failure,
                    "Transaction commit failed"
                );
                Self::rollback_all(open).await;
                return Err(failure);
            }
        }
        result
    }
}
