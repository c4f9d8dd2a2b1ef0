//! Tether Observability
//!
//! This crate provides the logging port used by the Tether marshaling
//! bridge. Instead of consulting process-wide verbosity state, every
//! component that wants to log receives a [`Logger`] at construction:
//!
//! - [`LogLevel`]: the five recognized severities
//! - [`LogSink`]: where records go
//! - [`TracingSink`]: forwards to `tracing` (the default)
//! - [`CollectingSink`]: keeps records in memory, mostly for tests
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tether_observe::{CollectingSink, LogLevel, LogSink, Logger};
//!
//! let sink = Arc::new(CollectingSink::new(100));
//! let logger = Logger::new(Arc::clone(&sink) as Arc<dyn LogSink>, LogLevel::Debug);
//!
//! logger.trace("example", "below threshold");
//! logger.info("example", "recorded");
//!
//! assert_eq!(sink.len(), 1);
//! ```

pub mod level;
pub mod sink;

// Re-export main types
pub use level::{LogLevel, ParseLevelError};
pub use sink::{CollectingSink, LogRecord, LogSink, Logger, NullSink, TracingSink};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::level::LogLevel;
    pub use crate::sink::{LogSink, Logger};
}
