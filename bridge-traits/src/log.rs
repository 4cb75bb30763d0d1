//! Host Logging Abstractions
//!
//! Structured log entries and the sink used to mirror core logs into the
//! host's own logging pipeline (browser console, syslog, test capture).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{error::Result, platform::PlatformSendSync};

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Module that emitted the entry (e.g. `core_offline::controller`)
    pub target: String,
    pub message: String,
    /// Structured fields recorded on the event (`generation`, `url`, ...)
    pub fields: HashMap<String, String>,
    /// Name of the innermost span, if any
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_span(mut self, span: impl Into<String>) -> Self {
        self.span = Some(span.into());
        self
    }
}

/// Logger sink trait
///
/// Implementations should never receive request bodies or credentials; the
/// core only logs URLs, generation names and counts.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::log::{LoggerSink, LogEntry, LogLevel};
///
/// async fn report(logger: &dyn LoggerSink, generation: &str) {
///     let entry = LogEntry::new(LogLevel::Info, "core_offline", "Deleting old cache")
///         .with_field("generation", generation);
///     logger.log(entry).await.ok();
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait LoggerSink: PlatformSendSync {
    /// Forward a log entry to the host logging system
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush any buffered logs
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are dropped before reaching [`LoggerSink::log`].
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Sink printing entries to stderr, for development hosts.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        let mut fields: Vec<_> = entry.fields.iter().collect();
        fields.sort();
        let rendered: Vec<String> = fields.iter().map(|(k, v)| format!("{k}={v}")).collect();

        eprintln!(
            "[{}] {:>5} {}: {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            entry.level.as_str().to_uppercase(),
            entry.target,
            entry.message,
            rendered.join(" ")
        );
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_builder() {
        let entry = LogEntry::new(LogLevel::Info, "core_offline", "Deleting old cache")
            .with_field("generation", "app-v1")
            .with_span("on_activate");

        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.target, "core_offline");
        assert_eq!(entry.message, "Deleting old cache");
        assert_eq!(entry.fields.get("generation"), Some(&"app-v1".to_string()));
        assert_eq!(entry.span, Some("on_activate".to_string()));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[tokio::test]
    async fn test_console_logger_accepts_entries() {
        let logger = ConsoleLogger::default();
        let entry = LogEntry::new(LogLevel::Debug, "test", "below threshold");
        logger.log(entry).await.unwrap();

        let entry = LogEntry::new(LogLevel::Warn, "test", "printed");
        logger.log(entry).await.unwrap();
    }
}
