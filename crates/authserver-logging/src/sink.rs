//! Sinks: named destinations for formatted log output.
//!
//! This module provides the [`Sink`] trait and the console sink. The rolling
//! file sink lives in [`crate::rolling`], the remote sink in
//! [`crate::forwarder`].

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::encoder::PatternEncoder;
use crate::error::{LoggingError, Result};
use crate::event::LogEvent;
use crate::filter::FilterReply;

/// A destination for log events.
///
/// Sinks are constructed, started once, and then shared between loggers for
/// the rest of the process. Implementations serialize their own writes.
pub trait Sink: Send + Sync + fmt::Debug {
    /// Returns the name of this sink.
    fn name(&self) -> &str;

    /// Validates and opens the sink. Starting an already started sink is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource cannot be opened.
    fn start(&self) -> Result<()>;

    /// Returns true once `start` has succeeded.
    fn is_started(&self) -> bool;

    /// Filter verdict for `event`. Sinks without filters stay neutral.
    fn decide(&self, _event: &LogEvent) -> FilterReply {
        FilterReply::Neutral
    }

    /// Writes one event.
    ///
    /// # Errors
    ///
    /// Returns `LoggingError::SinkNotStarted` before `start`, or the
    /// underlying write error.
    fn append(&self, event: &LogEvent) -> Result<()>;
}

/// Writes encoded events to standard output (or any writer).
pub struct ConsoleSink {
    name: String,
    encoder: PatternEncoder,
    writer: Mutex<Box<dyn Write + Send>>,
    started: AtomicBool,
}

impl ConsoleSink {
    /// Creates a console sink writing to standard output.
    #[must_use]
    pub fn stdout(name: impl Into<String>, encoder: PatternEncoder) -> Self {
        Self::with_writer(name, encoder, Box::new(io::stdout()))
    }

    /// Creates a console sink writing to `writer`.
    #[must_use]
    pub fn with_writer(
        name: impl Into<String>,
        encoder: PatternEncoder,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            name: name.into(),
            encoder,
            writer: Mutex::new(writer),
            started: AtomicBool::new(false),
        }
    }
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn append(&self, event: &LogEvent) -> Result<()> {
        if !self.is_started() {
            return Err(LoggingError::SinkNotStarted(self.name.clone()));
        }
        let line = self.encoder.encode(event);
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// In-memory writer shared between a sink under test and the assertions.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
