//! Text layout shared by the console and file sinks.
//!
//! Every line has the shape
//!
//! ```text
//! 2024-05-01 10:30:00.123 [main] INFO a.token - issued refresh token
//! ```
//!
//! i.e. timestamp with milliseconds, thread in brackets, level padded to at
//! least three columns, the logger name abbreviated to about five characters,
//! then the message. Lines end with a space and a newline.

use crate::event::LogEvent;

/// The layout in pattern-language form, for display and diagnostics.
pub const PATTERN: &str = "%d{yyyy-MM-dd HH:mm:ss.SSS} [%thread] %-3level %logger{5} - %msg %n";

/// Target length for abbreviated logger names.
pub const LOGGER_TARGET_LENGTH: usize = 5;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formats events into lines of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternEncoder {
    logger_length: usize,
}

impl Default for PatternEncoder {
    fn default() -> Self {
        Self {
            logger_length: LOGGER_TARGET_LENGTH,
        }
    }
}

impl PatternEncoder {
    /// Creates the encoder for the standard layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pattern this encoder implements.
    #[must_use]
    pub const fn pattern(&self) -> &'static str {
        PATTERN
    }

    /// Renders one event as a complete line, including the trailing newline.
    #[must_use]
    pub fn encode(&self, event: &LogEvent) -> String {
        format!(
            "{} [{}] {:<3} {} - {} \n",
            event.timestamp.format(TIMESTAMP_FORMAT),
            event.thread,
            event.level,
            abbreviate_logger(&event.logger, self.logger_length),
            event.message,
        )
    }
}

/// Shortens a dotted logger name towards `target` characters.
///
/// Segments are reduced to their first character from left to right until
/// the name fits. The last segment is always kept whole, so the result may
/// still be longer than `target`.
#[must_use]
pub fn abbreviate_logger(name: &str, target: usize) -> String {
    if name.len() <= target {
        return name.to_string();
    }

    let segments: Vec<&str> = name.split('.').collect();
    let last = segments.len() - 1;
    let mut total = name.len();
    let mut out = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        if i < last && total > target {
            let first: String = segment.chars().take(1).collect();
            total -= segment.len() - first.len();
            out.push(first);
        } else {
            out.push((*segment).to_string());
        }
    }

    out.join(".")
}
