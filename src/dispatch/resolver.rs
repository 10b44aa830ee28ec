//! URL routing.
//!
//! Two pattern styles are supported:
//!
//! | Style         | Example                         | Captures                  |
//! |---------------|---------------------------------|---------------------------|
//! | `path()`      | `articles/<int:year>/<slug>/`   | keyword args              |
//! | `re_path()`   | `^archive/([0-9]{4})/$`         | positional or keyword     |
//!
//! Patterns are matched against the request's `path_info` without its leading
//! `/`, in registration order. The first match wins.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::handler::{Handler, RouteArgs};
use super::transaction::{make_atomic, Databases};
use crate::core::{Error, Failure, Result};

/// Placeholder syntax of `path()` routes: `<name>` or `<converter:name>`.
static PLACEHOLDER: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"<(?:(?P<converter>[^>:]+):)?(?P<parameter>[^>]+)>").ok()
});

/// Successful route resolution.
#[derive(Clone)]
pub struct RouteMatch {
    pub handler: Arc<dyn Handler>,
    pub args: RouteArgs,
    /// Pattern that matched.
    pub route: String,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("handler", &self.handler.name())
            .field("args", &self.args)
            .field("route", &self.route)
            .finish()
    }
}

/// Maps a path to a handler.
///
/// Shared read-only by all concurrent requests.
pub trait Resolver: Send + Sync {
    fn resolve(&self, path: &str) -> std::result::Result<RouteMatch, Failure>;
}

struct Route {
    pattern: String,
    regex: Regex,
    handler: Arc<dyn Handler>,
}

/// Ordered route table.
#[derive(Default)]
pub struct UrlPatterns {
    routes: Vec<Route>,
    databases: Databases,
}

impl UrlPatterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap handlers registered from now on with atomic transactions.
    pub fn with_databases(mut self, databases: Databases) -> Self {
        self.databases = databases;
        self
    }

    /// Register a route with `<converter:name>` placeholders.
    pub fn path(self, route: &str, handler: impl Handler + 'static) -> Result<Self> {
        self.path_arc(route, Arc::new(handler))
    }

    pub fn path_arc(self, route: &str, handler: Arc<dyn Handler>) -> Result<Self> {
        let regex = route_to_regex(route)?;
        Ok(self.push(route, regex, handler))
    }

    /// Register a route given as a regular expression.
    pub fn re_path(self, pattern: &str, handler: impl Handler + 'static) -> Result<Self> {
        self.re_path_arc(pattern, Arc::new(handler))
    }

    pub fn re_path_arc(self, pattern: &str, handler: Arc<dyn Handler>) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| invalid(pattern, e.to_string()))?;
        Ok(self.push(pattern, regex, handler))
    }

    fn push(mut self, pattern: &str, regex: Regex, handler: Arc<dyn Handler>) -> Self {
        let handler = make_atomic(handler, &self.databases);
        self.routes.push(Route {
            pattern: pattern.to_string(),
            regex,
            handler,
        });
        self
    }

    /// Get registered patterns in match order.
    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.pattern.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Resolver for UrlPatterns {
    fn resolve(&self, path: &str) -> std::result::Result<RouteMatch, Failure> {
        let target = path.strip_prefix('/').unwrap_or(path);

        for route in &self.routes {
            if let Some(caps) = route.regex.captures(target) {
                return Ok(RouteMatch {
                    handler: Arc::clone(&route.handler),
                    args: capture_args(&route.regex, &caps),
                    route: route.pattern.clone(),
                });
            }
        }

        Err(Failure::NotFound(format!(
            "the current path, {}, didn't match any of these",
            target
        )))
    }
}

impl fmt::Debug for UrlPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlPatterns")
            .field("patterns", &self.patterns())
            .field("databases", &self.databases)
            .finish()
    }
}

/// Named groups become keyword args. Without any matched named group, all
/// groups become positional args.
fn capture_args(regex: &Regex, caps: &regex::Captures<'_>) -> RouteArgs {
    let mut args = RouteArgs::new();

    for name in regex.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            args.kwargs.insert(name.to_string(), m.as_str().to_string());
        }
    }

    if args.kwargs.is_empty() {
        args.args = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
    }
    args
}

fn converter_regex(converter: &str) -> Option<&'static str> {
    match converter {
        "str" => Some("[^/]+"),
        "int" => Some("[0-9]+"),
        "slug" => Some("[-a-zA-Z0-9_]+"),
        "uuid" => Some("[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"),
        "path" => Some(".+"),
        _ => None,
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn invalid(pattern: &str, message: impl Into<String>) -> Error {
    Error::InvalidRoute {
        pattern: pattern.to_string(),
        message: message.into(),
    }
}

/// Compile a `path()` route into an anchored regex.
fn route_to_regex(route: &str) -> Result<Regex> {
    let placeholder = PLACEHOLDER
        .as_ref()
        .ok_or_else(|| invalid(route, "placeholder syntax unavailable"))?;

    let mut source = String::from("^");
    let mut last = 0;

    for caps in placeholder.captures_iter(route) {
        let (Some(whole), Some(parameter)) = (caps.get(0), caps.name("parameter")) else {
            continue;
        };
        source.push_str(&regex::escape(&route[last..whole.start()]));
        last = whole.end();

        let name = parameter.as_str();
        if !is_identifier(name) {
            return Err(invalid(
                route,
                format!("'{}' is not a valid parameter name", name),
            ));
        }

        let converter = caps.name("converter").map(|m| m.as_str()).unwrap_or("str");
        let part = converter_regex(converter).ok_or_else(|| {
            invalid(
                route,
                format!("converter '{}' for parameter '{}' is not registered", converter, name),
            )
        })?;
        source.push_str(&format!("(?P<{}>{})", name, part));
    }

    let rest = &route[last..];
    if rest.contains('<') || rest.contains('>') {
        return Err(invalid(route, "unbalanced angle brackets"));
    }
    source.push_str(&regex::escape(rest));
    source.push('$');

    Regex::new(&source).map_err(|e| invalid(route, e.to_string()))
}
