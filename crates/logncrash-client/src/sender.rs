//! The sending capability injected into the log forwarder.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{ClientError, Result};
use crate::request::LogNCrashRequest;

/// Submits one [`LogNCrashRequest`] to the ingestion service.
///
/// Whether delivery is synchronous, and whether failures surface as errors or
/// are swallowed, is up to the implementation.
pub trait LogSender: Send + Sync + fmt::Debug {
    /// Submits a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be accepted for delivery.
    fn send_log(&self, request: &LogNCrashRequest) -> Result<()>;
}

impl<T: LogSender + ?Sized> LogSender for Arc<T> {
    fn send_log(&self, request: &LogNCrashRequest) -> Result<()> {
        (**self).send_log(request)
    }
}

/// Sender that keeps every record in memory instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingSender {
    requests: Mutex<Vec<LogNCrashRequest>>,
    failing: AtomicBool,
}

impl RecordingSender {
    /// Creates an empty recording sender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Returns a copy of every recorded request, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<LogNCrashRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of recorded requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all recorded requests.
    pub fn clear(&self) {
        self.requests.lock().clear();
    }
}

impl LogSender for RecordingSender {
    fn send_log(&self, request: &LogNCrashRequest) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(ClientError::Rejected(
                "recording sender set to fail".to_string(),
            ));
        }
        self.requests.lock().push(request.clone());
        Ok(())
    }
}
