//! Built-in handlers: structured logging and error reporting.
//!
//! Both collaborators are injected. Logging configuration is passed in as
//! a `LogConfig` value instead of living in process-wide state, so tests
//! can swap or disable the sink per watchdog.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use latwatch_core::HighLatencyQueues;

use crate::handler::{Handler, WatchdogEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// A structured log record as handed to a `LogSink`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub context: Option<String>,
    pub level: LogLevel,
    pub event: &'static str,
    pub payload: Value,
}

/// Destination for structured log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: LogRecord);
}

/// Emits records through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: LogRecord) {
        let context = record.context.as_deref().unwrap_or("-");
        match record.level {
            LogLevel::Warn => warn!(
                event = record.event,
                context,
                payload = %record.payload,
                "{}", record.event
            ),
            LogLevel::Info => info!(
                event = record.event,
                context,
                payload = %record.payload,
                "{}", record.event
            ),
        }
    }
}

/// Logging configuration for the log handler.
#[derive(Clone)]
pub struct LogConfig {
    pub enabled: bool,
    pub sink: Arc<dyn LogSink>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for LogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogConfig")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl LogConfig {
    /// Enabled config writing to `sink`.
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            enabled: true,
            sink,
        }
    }

    /// Config that drops every record.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Back to the default tracing sink, enabled.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Build the record logged for an event.
pub fn log_record(event: &WatchdogEvent<'_>) -> LogRecord {
    match event {
        WatchdogEvent::HighLatency { queues, context } => LogRecord {
            context: None,
            level: LogLevel::Warn,
            event: event.name(),
            payload: json!({
                "queues": queues,
                "depth": context.depth,
                "duration": context.duration,
            }),
        },
        WatchdogEvent::Restored { context } => LogRecord {
            context: None,
            level: LogLevel::Info,
            event: event.name(),
            payload: json!({
                "depth": context.depth,
                "duration": context.duration,
            }),
        },
    }
}

/// Handler that writes a structured record per alert and restore.
pub fn log_handler(config: LogConfig) -> Handler {
    Handler::event(move |event| {
        if config.enabled {
            config.sink.emit(log_record(event));
        }
        Ok(())
    })
}

/// A non-fatal event for an error-reporting service.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub extra: Value,
}

impl ErrorReport {
    /// Report naming every high queue. Names are listed alphabetically,
    /// not in the order the source returned them.
    pub fn for_queues(queues: &HighLatencyQueues) -> Self {
        let names: Vec<&str> = queues.keys().map(String::as_str).collect();
        Self {
            message: format!("Some queues have a high latency: {}", names.join(", ")),
            extra: json!({ "high_latency_queues": queues }),
        }
    }
}

/// Submits reports to an external exception-tracking service.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: &ErrorReport) -> anyhow::Result<()>;
}

/// Handler that reports every alert. Restores are not reported.
pub fn error_report_handler(reporter: Arc<dyn ErrorReporter>) -> Handler {
    Handler::event(move |event| match event {
        WatchdogEvent::HighLatency { queues, .. } => reporter.report(&ErrorReport::for_queues(queues)),
        WatchdogEvent::Restored { .. } => Ok(()),
    })
}
