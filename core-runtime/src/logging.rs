//! # Logging & Tracing Infrastructure
//!
//! Structured logging on top of `tracing`, supporting:
//! - Pretty, JSON and compact output formats
//! - Per-crate filtering
//! - Redaction of sensitive field values and URL query strings
//! - Mirroring events into a host [`LoggerSink`]
//!
//! On `wasm32` events are routed to the browser console through
//! `tracing-wasm`; the format options do not apply there.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::log::{ConsoleLogger, LogLevel};
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::default()
//!     .with_format(LogFormat::Compact)
//!     .with_level(LogLevel::Debug)
//!     .with_logger_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! tracing::info!(generation = "app-v2", "Cache install started");
//! ```
//!
//! ## LoggerSink integration
//!
//! Every event that survives filtering is converted into a
//! [`LogEntry`](bridge_traits::log::LogEntry) and handed to the sink. When a
//! tokio runtime is current the sink call is spawned on it, otherwise it is
//! driven to completion in place.

use crate::error::{Error, Result};

use bridge_traits::log::{LogLevel, LoggerSink};

use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use bridge_traits::log::LogEntry;
#[cfg(not(target_arch = "wasm32"))]
use std::{collections::HashMap, fmt, io};
#[cfg(not(target_arch = "wasm32"))]
use tracing::field::{Field, Visit};
#[cfg(not(target_arch = "wasm32"))]
use tracing::{Event, Subscriber};
#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, Layered, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Crates whose events pass the default filter at the configured level.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_offline",
    "core_service",
    "bridge_desktop",
    "bridge_wasm",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Structured JSON, one object per line
    Json,
    /// Single-line format
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Minimum level for workspace crates
    pub level: LogLevel,
    /// Redact sensitive field values before they reach the sink
    pub redact_pii: bool,
    /// Custom filter directives (e.g. `"core_offline=trace,reqwest=info"`),
    /// replacing the default per-crate filter
    pub filter: Option<String>,
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Emit span enter/exit information
    pub enable_spans: bool,
    pub display_target: bool,
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_pii: true,
            filter: None,
            logger_sink: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_pii_redaction(mut self, redact: bool) -> Self {
        self.redact_pii = redact;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }

    /// Filter directives derived from this configuration.
    pub fn filter_directives(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }

        let level = self.level.as_str();
        let mut directives: Vec<String> = WORKSPACE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        directives.extend(
            ["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"]
                .iter()
                .map(|d| d.to_string()),
        );
        directives.join(",")
    }
}

/// Initialize the global subscriber.
///
/// Call once during startup; a second call fails with [`Error::Config`].
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_span_events(span_events(config.enable_spans))
                .with_writer(io::stdout);
            install(&config, filter, fmt_layer)
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(config.enable_spans)
                .with_span_list(config.enable_spans)
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_writer(io::stdout);
            install(&config, filter, fmt_layer)
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(config.display_target)
                .with_thread_ids(config.display_thread_info)
                .with_thread_names(config.display_thread_info)
                .with_writer(io::stdout);
            install(&config, filter, fmt_layer)
        }
    }
}

/// Initialize the global subscriber for the browser console.
#[cfg(target_arch = "wasm32")]
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let max_level = match config.level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    };

    let wasm_config = tracing_wasm::WASMLayerConfigBuilder::new()
        .set_max_level(max_level)
        .build();

    tracing_subscriber::registry()
        .with(tracing_wasm::WASMLayer::new(wasm_config))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(not(target_arch = "wasm32"))]
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    EnvFilter::try_new(config.filter_directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

#[cfg(not(target_arch = "wasm32"))]
fn span_events(enabled: bool) -> tracing_subscriber::fmt::format::FmtSpan {
    if enabled {
        tracing_subscriber::fmt::format::FmtSpan::ACTIVE
    } else {
        tracing_subscriber::fmt::format::FmtSpan::NONE
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn install<L>(config: &LoggingConfig, filter: EnvFilter, fmt_layer: L) -> Result<()>
where
    L: Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(LoggerSinkLayer::new(
            config.logger_sink.clone(),
            config.redact_pii,
        ))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

/// Layer that forwards events to a `LoggerSink` implementation.
#[cfg(not(target_arch = "wasm32"))]
struct LoggerSinkLayer {
    sink: Option<Arc<dyn LoggerSink>>,
    redact: bool,
}

#[cfg(not(target_arch = "wasm32"))]
impl LoggerSinkLayer {
    fn new(sink: Option<Arc<dyn LoggerSink>>, redact: bool) -> Self {
        Self { sink, redact }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl<S> Layer<S> for LoggerSinkLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = tracing_level_to_log_level(*metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut visitor = SinkVisitor::default();
        event.record(&mut visitor);

        let message = visitor
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);

        for (key, value) in visitor.fields {
            let value = if self.redact {
                redact_if_sensitive(&key, &value)
            } else {
                value
            };
            entry = entry.with_field(key, value);
        }

        if let Some(span) = ctx.lookup_current() {
            entry = entry.with_span(span.name());
        }

        let sink = Arc::clone(sink);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
            return;
        }

        if let Err(err) = futures::executor::block_on(sink.log(entry)) {
            eprintln!("LoggerSink error: {}", err);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
struct SinkVisitor {
    message: Option<String>,
    fields: HashMap<String, String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl SinkVisitor {
    fn record_value(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Visit for SinkVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, format!("{:?}", value));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn tracing_level_to_log_level(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

/// Redact a field value when its name suggests a credential.
///
/// ```ignore
/// info!(authorization = %redact_if_sensitive("authorization", header), "Request");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE_FIELDS: &[&str] = &[
        "token",
        "password",
        "secret",
        "api_key",
        "authorization",
        "cookie",
        "bearer",
    ];

    let field_lower = field_name.to_lowercase();
    if SENSITIVE_FIELDS.iter().any(|&f| field_lower.contains(f)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Drop the query string and fragment of a URL.
///
/// Request URLs are logged for every fetch; query strings may carry
/// session identifiers.
///
/// ```
/// use core_runtime::logging::redact_query;
///
/// assert_eq!(
///     redact_query("https://app.example/api?session=abc#top"),
///     "https://app.example/api?[REDACTED]"
/// );
/// ```
pub fn redact_query(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    match without_fragment.split_once('?') {
        Some((base, query)) if !query.is_empty() => format!("{}?[REDACTED]", base),
        Some((base, _)) => base.to_string(),
        None => without_fragment.to_string(),
    }
}

/// Strip a file path down to its last component.
///
/// ```ignore
/// debug!(entry = %strip_path(&path.to_string_lossy()), "Wrote cache entry");
/// ```
pub fn strip_path(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}
