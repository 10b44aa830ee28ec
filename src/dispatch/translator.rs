//! Failure to response translation.

use crate::core::{Failure, Request, Response};

/// Turns any request-level failure into a response.
///
/// Implementations must be total and must not fail or log; the pipeline
/// owns logging of error responses.
pub trait ExceptionTranslator: Send + Sync {
    fn translate(&self, request: &Request, failure: &Failure) -> Response;
}

/// Default status mapping: not found 404, permission denied 403, bad or
/// suspicious input 400, disallowed verb 405, body timeout 408, everything
/// else 500.
///
/// In debug mode bodies carry the failure details.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTranslator {
    debug: bool,
}

impl DefaultTranslator {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn base(failure: &Failure) -> Response {
        match failure {
            Failure::NotFound(_) => Response::not_found(),
            Failure::PermissionDenied(_) => Response::forbidden(),
            Failure::BadRequest(_) | Failure::Suspicious(_) => Response::bad_request(),
            Failure::MethodNotAllowed { allowed, .. } => Response::method_not_allowed(allowed),
            Failure::RequestTimeout(_) => Response::request_timeout(),
            Failure::Handler(_) | Failure::Internal(_) => {
                Response::internal_error("Internal Server Error")
            }
        }
    }
}

impl ExceptionTranslator for DefaultTranslator {
    fn translate(&self, request: &Request, failure: &Failure) -> Response {
        let response = Self::base(failure).with_header("content-type", "text/plain; charset=utf-8");

        if !self.debug {
            return response;
        }

        let status = response.status();
        let body = format!(
            "{}\n\n{} {}\n{}\n",
            status.canonical_reason().unwrap_or("Error"),
            request.method(),
            request.path(),
            failure
        );
        response.with_body(body)
    }
}
