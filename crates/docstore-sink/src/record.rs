//! Immutable log record snapshots consumed by the sink.
//!
//! A [`LogRecord`] captures everything the document builder may need:
//! logger name, severity, the already-rendered message, a timestamp,
//! structured properties, positional parameters, and optional exception
//! and stack trace text. The sink never mutates a record; builders return
//! fresh documents on every call.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;

/// Severity of a log record, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Lowercase name used in rendered documents and templates.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log record, snapshotted at emission time.
///
/// Constructed with [`LogRecord::new`] plus the `with_*` builders:
///
/// ```
/// use docstore_sink::record::{Level, LogRecord};
///
/// let record = LogRecord::new("orders", Level::Warn, "payment retried")
///     .with_property("order_id", 4211)
///     .with_parameter("visa")
///     .with_stack_trace("at orders::pay");
/// assert_eq!(record.level, Level::Warn);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Name of the logger that emitted the record.
    pub logger: String,
    /// Severity of the record.
    pub level: Level,
    /// Fully rendered message text.
    pub message: String,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Structured properties attached to the record.
    pub properties: Map<String, Value>,
    /// Positional parameters, in emission order.
    pub parameters: Vec<Value>,
    /// Rendered exception text, if the record carries one.
    pub exception: Option<String>,
    /// Stack trace text, if captured.
    pub stack_trace: Option<String>,
}

impl LogRecord {
    /// Creates a record timestamped now, with no properties or parameters.
    #[must_use]
    pub fn new(logger: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        LogRecord {
            logger: logger.into(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            properties: Map::new(),
            parameters: Vec::new(),
            exception: None,
            stack_trace: None,
        }
    }

    /// Overrides the emission timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attaches one structured property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Appends one positional parameter.
    #[must_use]
    pub fn with_parameter(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }

    /// Attaches rendered exception text.
    #[must_use]
    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Attaches stack trace text.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn level_display_is_lowercase() {
        assert_eq!(Level::Warn.to_string(), "warn");
        assert_eq!(Level::Fatal.to_string(), "fatal");
    }

    #[test]
    fn levels_order_by_severity() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Error < Level::Fatal);
    }

    #[test]
    fn builder_accumulates_properties_and_parameters() {
        let record = LogRecord::new("app", Level::Info, "hello")
            .with_property("user", "ada")
            .with_property("attempt", 2)
            .with_parameter(json!({"id": 7}))
            .with_parameter("second");

        assert_eq!(record.properties.len(), 2);
        assert_eq!(record.properties["attempt"], json!(2));
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(record.parameters[1], json!("second"));
        assert!(record.exception.is_none());
    }

    #[test]
    fn new_record_is_timestamped_now() {
        let before = Utc::now();
        let record = LogRecord::new("app", Level::Debug, "tick");
        assert!(record.timestamp >= before);
        assert!(record.timestamp <= Utc::now());
    }
}
