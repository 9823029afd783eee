//! The event record every sink receives.

use chrono::{DateTime, Local};

use crate::level::Level;

/// A single log statement, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// When the statement was issued.
    pub timestamp: DateTime<Local>,
    /// Name of the issuing thread.
    pub thread: String,
    /// Severity.
    pub level: Level,
    /// Dotted logger name, e.g. `authserver.token`.
    pub logger: String,
    /// Message with any structured fields already rendered.
    pub message: String,
}

impl LogEvent {
    /// Creates an event stamped with the current time and thread.
    #[must_use]
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            thread: current_thread_name(),
            level,
            logger: logger.into(),
            message: message.into(),
        }
    }

    /// Overrides the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Overrides the thread name.
    #[must_use]
    pub fn with_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }
}

/// Name of the calling thread, or its id when it is unnamed.
pub(crate) fn current_thread_name() -> String {
    let thread = std::thread::current();
    thread
        .name()
        .map_or_else(|| format!("{:?}", thread.id()), str::to_string)
}

/// Converts a Rust module path (`authserver::token`) into a dotted logger name.
#[must_use]
pub fn logger_name_from_target(target: &str) -> String {
    target.replace("::", ".")
}
