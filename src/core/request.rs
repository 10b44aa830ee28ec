//! HTTP request built from a connection scope.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::error::{Error, Result};
use super::form::{BodyParser, BodySource, FormData, FormParser, Files};
use super::headers::{keys, latin1, merge_headers, parse_content_length, Metadata};
use super::parser::{parse_cookies, parse_header, parse_query_string};
use super::query::QueryDict;
use crate::dispatch::{Resolver, RouteMatch};
use crate::protocol::ConnectionScope;

/// Characters left unescaped by [`Request::get_full_path`].
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Per-handler settings applied while building requests.
#[derive(Clone)]
pub struct RequestOptions {
    /// Append `/` to paths that lack one.
    pub append_slash: bool,
    /// Encoding used when the request names no valid charset.
    pub default_charset: &'static Encoding,
    /// Parser invoked on first access to form data.
    pub body_parser: Arc<dyn BodyParser>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            append_slash: true,
            default_charset: UTF_8,
            body_parser: Arc::new(FormParser),
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("append_slash", &self.append_slash)
            .field("default_charset", &self.default_charset.name())
            .finish()
    }
}

/// HTTP request handed to middleware and handlers.
///
/// Note: Clone is intentionally not derived. Handlers receive the request
/// behind an `Arc`.
pub struct Request {
    method: String,
    path: String,
    path_info: String,
    script_name: String,
    query_string: Bytes,
    scheme: Option<String>,
    meta: Metadata,
    content_type: String,
    content_params: HashMap<String, String>,
    encoding: &'static Encoding,
    content_length: usize,
    body: Bytes,
    read_started: AtomicBool,
    get: OnceLock<QueryDict>,
    cookies: OnceLock<HashMap<String, String>>,
    form: OnceLock<FormData>,
    body_parser: Arc<dyn BodyParser>,
    resolver_match: Option<RouteMatch>,
    urlconf: Option<Arc<dyn Resolver>>,
}

impl Request {
    /// Build a request from a connection scope and its accumulated body.
    ///
    /// Fails only when the scope is not `http`. Malformed lengths, content
    /// types and charsets are absorbed.
    pub fn from_scope(scope: &ConnectionScope, body: Bytes, options: &RequestOptions) -> Result<Self> {
        if !scope.is_http() {
            return Err(Error::UnsupportedScopeType(scope.scope_type.clone()));
        }

        let method = scope.method.to_ascii_uppercase();

        let mut path = scope.path.clone();
        if options.append_slash && !path.ends_with('/') {
            path.push('/');
        }

        let script_name = scope.root_path.clone().unwrap_or_default();
        let path_info = match path.strip_prefix(script_name.as_str()) {
            Some(rest) if !script_name.is_empty() => {
                if rest.is_empty() {
                    "/".to_string()
                } else {
                    rest.to_string()
                }
            }
            _ => path.clone(),
        };

        let mut meta = Metadata::with_capacity(10 + scope.headers.len());
        meta.insert(keys::REQUEST_METHOD, method.as_str());
        meta.insert(keys::QUERY_STRING, latin1(&scope.query_string));
        meta.insert(keys::SCRIPT_NAME, script_name.as_str());
        meta.insert(keys::PATH_INFO, path_info.as_str());

        if let Some((host, port)) = &scope.client {
            meta.insert(keys::REMOTE_ADDR, host.as_str());
            meta.insert(keys::REMOTE_HOST, host.as_str());
            meta.insert(keys::REMOTE_PORT, port.to_string());
        }
        match &scope.server {
            Some((host, port)) => {
                meta.insert(keys::SERVER_NAME, host.as_str());
                meta.insert(keys::SERVER_PORT, port.to_string());
            }
            None => {
                meta.insert(keys::SERVER_NAME, "unknown");
                meta.insert(keys::SERVER_PORT, "0");
            }
        }
        if let Some(version) = &scope.http_version {
            meta.insert(keys::SERVER_PROTOCOL, format!("HTTP/{}", version));
        }

        merge_headers(&mut meta, &scope.headers);

        let mut encoding = options.default_charset;
        let (content_type, content_params) = match meta.get(keys::CONTENT_TYPE) {
            Some(raw) => {
                let (media, params) = parse_header(raw);
                if let Some(found) = params
                    .get("charset")
                    .and_then(|label| Encoding::for_label(label.as_bytes()))
                {
                    encoding = found;
                }
                (media, params)
            }
            None => (String::new(), HashMap::new()),
        };

        let content_length = parse_content_length(meta.get(keys::CONTENT_LENGTH));

        Ok(Self {
            method,
            path,
            path_info,
            script_name,
            query_string: scope.query_string.clone(),
            scheme: scope.scheme.clone(),
            meta,
            content_type,
            content_params,
            encoding,
            content_length,
            body,
            read_started: AtomicBool::new(false),
            get: OnceLock::new(),
            cookies: OnceLock::new(),
            form: OnceLock::new(),
            body_parser: Arc::clone(&options.body_parser),
            resolver_match: None,
            urlconf: None,
        })
    }

    /// Get the uppercased HTTP method.
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the request path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the path below the mount point, used for routing.
    #[inline]
    pub fn path_info(&self) -> &str {
        &self.path_info
    }

    /// Get the mount point.
    #[inline]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Get the raw query string.
    #[inline]
    pub fn query_string(&self) -> &Bytes {
        &self.query_string
    }

    /// Get the request metadata.
    #[inline]
    pub fn meta(&self) -> &Metadata {
        &self.meta
    }

    /// Get a metadata value.
    #[inline]
    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key)
    }

    /// Get the bare media type, empty if none was sent.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the content-type parameters.
    #[inline]
    pub fn content_params(&self) -> &HashMap<String, String> {
        &self.content_params
    }

    /// Get the body encoding.
    #[inline]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Get the declared content length, 0 when absent or invalid.
    #[inline]
    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Get the raw request body.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the body stream.
    ///
    /// Form data not parsed before this call is no longer available.
    pub fn read(&self) -> Bytes {
        self.read_started.store(true, Ordering::Release);
        self.body.clone()
    }

    /// Query string parameters, parsed on first access.
    pub fn query_params(&self) -> &QueryDict {
        self.get
            .get_or_init(|| parse_query_string(&self.query_string, self.encoding))
    }

    /// Cookies sent by the client, parsed on first access.
    pub fn cookies(&self) -> &HashMap<String, String> {
        self.cookies
            .get_or_init(|| parse_cookies(self.meta.get(keys::HTTP_COOKIE).unwrap_or("")))
    }

    /// Form fields of a `POST` body.
    pub fn post(&self) -> Result<&QueryDict> {
        self.form_data().map(|data| &data.post)
    }

    /// Files of a `POST` body.
    pub fn files(&self) -> Result<&Files> {
        self.form_data().map(|data| &data.files)
    }

    /// Replace the parsed form fields.
    pub fn set_post(&mut self, post: QueryDict) {
        let files = self.form.take().map(|data| data.files).unwrap_or_default();
        self.form = OnceLock::from(FormData { post, files });
    }

    fn form_data(&self) -> Result<&FormData> {
        if let Some(data) = self.form.get() {
            return Ok(data);
        }
        if self.read_started.load(Ordering::Acquire) {
            return Err(Error::NotYetRead);
        }
        Ok(self.form.get_or_init(|| self.load_form_data()))
    }

    fn load_form_data(&self) -> FormData {
        if self.method != "POST" {
            return FormData::default();
        }

        let source = BodySource {
            content_type: &self.content_type,
            content_params: &self.content_params,
            encoding: self.encoding,
            body: &self.body,
        };
        match self.body_parser.parse(source) {
            Ok(data) => data,
            Err(failure) => {
                tracing::warn!(
                    target: "request",
                    path = %self.path,
                    error = %failure,
                    "Failed to parse request body"
                );
                FormData::default()
            }
        }
    }

    /// URL scheme, `http` unless the transport says otherwise.
    #[inline]
    pub fn scheme(&self) -> &str {
        self.scheme.as_deref().unwrap_or("http")
    }

    /// Check if the request arrived over TLS.
    #[inline]
    pub fn is_secure(&self) -> bool {
        self.scheme() == "https"
    }

    /// Host the request was addressed to.
    ///
    /// Uses the `Host` header, falling back to the server address with any
    /// non-default port appended.
    pub fn host(&self) -> String {
        if let Some(host) = self.meta.get(keys::HTTP_HOST) {
            return host.to_string();
        }

        let name = self.meta.get(keys::SERVER_NAME).unwrap_or("unknown");
        let port = self.meta.get(keys::SERVER_PORT).unwrap_or("0");
        let default_port = if self.is_secure() { "443" } else { "80" };
        if port == default_port {
            name.to_string()
        } else {
            format!("{}:{}", name, port)
        }
    }

    /// Escaped path plus query string.
    pub fn get_full_path(&self) -> String {
        let mut full = utf8_percent_encode(&self.path, PATH_SAFE).to_string();
        if !self.query_string.is_empty() {
            full.push('?');
            full.push_str(&latin1(&self.query_string));
        }
        full
    }

    /// Route the request resolved to, once routing succeeded.
    #[inline]
    pub fn resolver_match(&self) -> Option<&RouteMatch> {
        self.resolver_match.as_ref()
    }

    /// Record the resolved route.
    #[inline]
    pub fn set_resolver_match(&mut self, route: RouteMatch) {
        self.resolver_match = Some(route);
    }

    /// Resolver override for this request.
    #[inline]
    pub fn urlconf(&self) -> Option<&Arc<dyn Resolver>> {
        self.urlconf.as_ref()
    }

    /// Route this request with `resolver` instead of the default one.
    #[inline]
    pub fn set_urlconf(&mut self, resolver: Arc<dyn Resolver>) {
        self.urlconf = Some(resolver);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("path_info", &self.path_info)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("body_len", &self.body.len())
            .finish()
    }
}
