//! Request dispatch: routing, handler invocation and failure translation.
//!
//! - [`UrlPatterns`] - concrete [`Resolver`] with `path()`/`re_path()` routes
//! - [`Handler`], [`SyncHandler`], [`AsyncHandler`], [`View`] - application logic
//! - [`DispatchPipeline`] - turns a request into its final response
//! - [`ExceptionTranslator`] - maps failures to responses
//! - [`make_atomic`] - transactional handler wrapping

mod handler;
mod pipeline;
mod resolver;
mod transaction;
mod translator;

pub use handler::{AsyncHandler, Handler, HandlerResult, NonAtomic, RouteArgs, SyncHandler, View};
pub use pipeline::DispatchPipeline;
pub use resolver::{Resolver, RouteMatch, UrlPatterns};
pub use transaction::{make_atomic, DataSource, Databases, Transaction};
pub use translator::{DefaultTranslator, ExceptionTranslator};
