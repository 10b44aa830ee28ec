//! Deferred template responses.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use serde_json::{Map, Value};

use super::error::Failure;
use super::response::{Render, Response};

/// Template context.
pub type Context = Map<String, Value>;

/// A renderable template.
pub trait Template: Send + Sync {
    /// Template name, used in error messages.
    fn name(&self) -> &str;

    /// Render the template against a context.
    fn render(&self, context: &Context) -> Result<String, Failure>;
}

/// In-memory template with `{{ key }}` placeholders.
///
/// Unknown keys render as an empty string. String values are inserted as-is;
/// other JSON values use their JSON representation.
#[derive(Debug, Clone)]
pub struct StaticTemplate {
    name: String,
    source: String,
}

impl StaticTemplate {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

impl Template for StaticTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, context: &Context) -> Result<String, Failure> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or_else(|| {
                Failure::Internal(format!("unclosed placeholder in template '{}'", self.name))
            })?;

            match context.get(after[..end].trim()) {
                Some(Value::String(s)) => out.push_str(s),
                Some(Value::Null) | None => {}
                Some(other) => out.push_str(&other.to_string()),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

struct TemplateRender {
    template: Arc<dyn Template>,
    context: Context,
}

impl Render for TemplateRender {
    fn render(&self) -> Result<Bytes, Failure> {
        self.template.render(&self.context).map(Bytes::from)
    }
}

/// Builds responses whose body is rendered after the handler returns.
pub struct TemplateResponse;

impl TemplateResponse {
    /// Create an unrendered `text/html` response.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(template: Arc<dyn Template>, context: Context) -> Response {
        let mut response = Response::deferred(StatusCode::OK, TemplateRender { template, context });
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => Context::new(),
        }
    }

    #[test]
    fn test_static_template_substitution() {
        let template = StaticTemplate::new("page", "<p>{{ context_test }}</p><i>{{n}}</i>{{ missing }}");
        let out = template
            .render(&context(json!({"context_test": "Hello context test.", "n": 3})))
            .unwrap();
        assert_eq!(out, "<p>Hello context test.</p><i>3</i>");
    }

    #[test]
    fn test_unclosed_placeholder() {
        let template = StaticTemplate::new("broken", "<p>{{ oops</p>");
        assert!(template.render(&Context::new()).is_err());
    }

    #[test]
    fn test_template_response_is_deferred() {
        let template: Arc<dyn Template> = Arc::new(StaticTemplate::new("t", "hi {{ who }}"));
        let mut response = TemplateResponse::new(template, context(json!({"who": "there"})));

        assert!(!response.is_rendered());
        assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));

        response.render().unwrap();
        assert_eq!(response.content().unwrap().as_ref(), b"hi there");
    }
}
