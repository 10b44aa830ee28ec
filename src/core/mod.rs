//! Core types for HTTP request/response handling.
//!
//! This module provides the fundamental types shared by the dispatch
//! pipeline, middleware and handlers:
//!
//! - [`Request`] - request built from a connection scope
//! - [`Response`] - response with builder pattern and deferred rendering
//! - [`TemplateResponse`] - response rendered after the handler returns
//! - [`Error`] / [`Failure`] - adapter faults and request-level failures
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio_asgi::core::{Request, Response};
//!
//! fn handle_request(req: &Request) -> Response {
//!     let name = req.query_params().get("name").unwrap_or("world");
//!     Response::builder().text().body(format!("Hello, {}!", name)).build()
//! }
//! ```

mod cookie;
mod error;
mod form;
pub mod headers;
mod parser;
mod query;
mod request;
mod response;
mod template;

pub use cookie::{Cookie, SameSite};
pub use error::{Error, Failure, Result};
pub use form::{
    BodyParser, BodySource, FormData, FormParser, Files, UploadedFile, FORM_URLENCODED,
    MULTIPART_FORM_DATA,
};
pub use headers::Metadata;
pub use parser::{parse_cookies, parse_header, parse_query_string};
pub use query::QueryDict;
pub use request::{Request, RequestOptions};
pub use response::{Render, Response, ResponseBuilder};
pub(crate) use response::allow_value;
pub use template::{Context, StaticTemplate, Template, TemplateResponse};
