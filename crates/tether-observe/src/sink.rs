//! Log sinks and the injected [`Logger`] handle.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::level::LogLevel;

/// A single message handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity of the message.
    pub level: LogLevel,
    /// Component that emitted the message (e.g. `"marshal::wrap"`).
    pub target: &'static str,
    /// Rendered message text.
    pub message: String,
}

/// Destination for log records.
///
/// Sinks never filter; threshold handling lives in [`Logger`].
pub trait LogSink: Send + Sync {
    /// Called for every record at or above the logger's threshold.
    fn log(&self, record: &LogRecord);
}

/// Forwards records to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a new tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn log(&self, record: &LogRecord) {
        let target = record.target;
        let message = record.message.as_str();
        match record.level {
            LogLevel::Trace => tracing::trace!(component = target, "{}", message),
            LogLevel::Debug => tracing::debug!(component = target, "{}", message),
            LogLevel::Info => tracing::info!(component = target, "{}", message),
            LogLevel::Warn => tracing::warn!(component = target, "{}", message),
            LogLevel::Error => tracing::error!(component = target, "{}", message),
        }
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _record: &LogRecord) {}
}

/// A sink that collects records for later inspection.
pub struct CollectingSink {
    records: RwLock<Vec<LogRecord>>,
    max_records: usize,
}

impl CollectingSink {
    /// Create a new collecting sink that keeps at most `max_records` records.
    pub fn new(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records,
        }
    }

    /// Get collected records.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.read().clone()
    }

    /// Get collected messages at exactly `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.records
            .read()
            .iter()
            .filter(|r| r.level == level)
            .map(|r| r.message.clone())
            .collect()
    }

    /// Clear collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Get record count.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl LogSink for CollectingSink {
    fn log(&self, record: &LogRecord) {
        let mut records = self.records.write();
        if records.len() < self.max_records {
            records.push(record.clone());
        }
    }
}

impl fmt::Debug for CollectingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectingSink")
            .field("len", &self.len())
            .field("max_records", &self.max_records)
            .finish()
    }
}

/// Cheaply cloneable logging handle injected into the marshaling layer.
///
/// Holds a sink and a minimum level; records below the threshold are
/// dropped before the message is rendered.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    min_level: LogLevel,
}

impl Logger {
    /// Create a logger writing to `sink` at `min_level` and above.
    pub fn new(sink: Arc<dyn LogSink>, min_level: LogLevel) -> Self {
        Self { sink, min_level }
    }

    /// A logger forwarding to `tracing`.
    pub fn tracing(min_level: LogLevel) -> Self {
        Self::new(Arc::new(TracingSink), min_level)
    }

    /// A logger that drops everything.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink), LogLevel::Error)
    }

    /// The configured threshold.
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Return a copy of this logger with a different threshold.
    pub fn with_min_level(&self, min_level: LogLevel) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            min_level,
        }
    }

    /// Whether a record at `level` would reach the sink.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Log `message` at `level` on behalf of `target`.
    pub fn log(&self, level: LogLevel, target: &'static str, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        self.sink.log(&LogRecord {
            level,
            target,
            message: message.to_string(),
        });
    }

    /// Log at error level.
    pub fn error(&self, target: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, target, message);
    }

    /// Log at warn level.
    pub fn warn(&self, target: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, target, message);
    }

    /// Log at info level.
    pub fn info(&self, target: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, target, message);
    }

    /// Log at debug level.
    pub fn debug(&self, target: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, target, message);
    }

    /// Log at trace level.
    pub fn trace(&self, target: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, target, message);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::tracing(LogLevel::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("min_level", &self.min_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new(100);
        sink.log(&LogRecord {
            level: LogLevel::Info,
            target: "test",
            message: "hello".to_string(),
        });

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].message, "hello");
    }

    #[test]
    fn test_collecting_sink_max_records() {
        let sink = CollectingSink::new(2);
        for i in 0..5 {
            sink.log(&LogRecord {
                level: LogLevel::Debug,
                target: "test",
                message: format!("record_{}", i),
            });
        }

        assert_eq!(sink.len(), 2);
        let kept: Vec<LogRecord> = sink.records();
        assert_eq!(kept[0].message, "record_0");
        assert_eq!(kept[1].message, "record_1");
        assert_eq!(kept[1].level, LogLevel::Debug);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_logger_threshold() {
        let sink = Arc::new(CollectingSink::new(100));
        let logger = Logger::new(Arc::clone(&sink) as Arc<dyn LogSink>, LogLevel::Info);

        logger.trace("test", "dropped");
        logger.debug("test", "dropped");
        logger.info("test", "kept info");
        logger.warn("test", "kept warn");
        logger.error("test", "kept error");

        assert_eq!(sink.len(), 3);
        assert!(sink.messages_at(LogLevel::Debug).is_empty());
        assert_eq!(sink.messages_at(LogLevel::Warn), vec!["kept warn".to_string()]);
    }

    #[test]
    fn test_logger_with_min_level_shares_sink() {
        let sink = Arc::new(CollectingSink::new(100));
        let quiet = Logger::new(Arc::clone(&sink) as Arc<dyn LogSink>, LogLevel::Error);
        let chatty = quiet.with_min_level(LogLevel::Trace);

        quiet.debug("test", "dropped");
        chatty.debug("test", "kept");

        assert_eq!(sink.messages_at(LogLevel::Debug), vec!["kept".to_string()]);
    }

    #[test]
    fn test_disabled_logger() {
        let logger = Logger::disabled();
        assert!(!logger.enabled(LogLevel::Warn));
        assert!(logger.enabled(LogLevel::Error));
        logger.error("test", "goes nowhere");
    }
}
