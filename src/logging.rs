//! Unified JSON logging with custom format.
//!
//! Log format:
//! ```json
//! {"ts":"2024-12-28T15:04:05.123456Z","level":"warn","type":"app","msg":"Not Found: /missing/","ctx":{"service":"tokio_asgi","request_id":"..."},"data":{"status":404}}
//! ```

use std::collections::HashMap;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Span field carrying the per-connection request id.
pub const REQUEST_ID_FIELD: &str = "request_id";

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .event_format(JsonFormatter::new(config.service_name.clone())),
            )
            .try_init(),
        LogFormat::Plain => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    }
}

/// Custom JSON formatter for tracing.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let level = match *meta.level() {
            Level::TRACE => "debug",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };

        // Determine log type from target
        let log_type = if meta.target() == "access" {
            "access"
        } else if *meta.level() == Level::ERROR {
            "error"
        } else {
            "app"
        };

        // Collect fields
        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        let mut ts = String::with_capacity(32);
        SystemTime.format_time(&mut Writer::new(&mut ts))?;

        // Build message
        let msg = if log_type == "access" {
            // For access logs, build "METHOD /path STATUS"
            let method = visitor
                .fields
                .get("method")
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            let path = visitor
                .fields
                .get("path")
                .and_then(|v| v.as_str())
                .unwrap_or("?");
            let status = visitor
                .fields
                .get("status")
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            format!("{} {} {}", method, path, status)
        } else {
            visitor.message.clone().unwrap_or_default()
        };

        // Request id from the enclosing connection span
        let request_id = ctx.event_scope().and_then(|scope| {
            scope.from_root().find_map(|span| {
                let extensions = span.extensions();
                extensions
                    .get::<FormattedFields<N>>()
                    .and_then(|fields| span_field(fields.as_str(), REQUEST_ID_FIELD))
            })
        });

        let mut ctx_json = serde_json::Map::new();
        ctx_json.insert("service".into(), serde_json::json!(&self.service_name));
        if let Some(id) = request_id {
            ctx_json.insert("request_id".into(), serde_json::json!(id));
        }

        let entry = serde_json::json!({
            "ts": ts,
            "level": level,
            "type": log_type,
            "msg": msg,
            "ctx": ctx_json,
            "data": visitor.fields,
        });

        writeln!(
            writer,
            "{}",
            serde_json::to_string(&entry).unwrap_or_default()
        )
    }
}

/// Extract `name=value` from formatted span fields.
fn span_field(formatted: &str, name: &str) -> Option<String> {
    formatted.split_whitespace().find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.trim_matches('"').to_string())
    })
}

/// Field visitor for collecting tracing fields.
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value).trim_matches('"').to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }
}
