//! Remote log forwarding.
//!
//! Each event routed to the remote sink becomes one [`LogNCrashRequest`] and
//! is handed to an injected [`LogSender`]. There is no batching, retry or
//! buffering at this layer.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use logncrash_client::{LogNCrashRequest, LogSender};

use crate::config::LoggingConfig;
use crate::error::{LoggingError, Result};
use crate::event::LogEvent;
use crate::sink::Sink;

/// Logger namespaces never forwarded.
pub const TRANSPORT_NAMESPACES: [&str; 4] = ["logncrash_client", "reqwest", "hyper", "h2"];

thread_local! {
    static FORWARDING: Cell<bool> = const { Cell::new(false) };
}

/// Maps an event to the ingestion record.
#[must_use]
pub fn build_request(event: &LogEvent, config: &LoggingConfig) -> LogNCrashRequest {
    LogNCrashRequest {
        project_name: config.app_key.clone(),
        project_version: config.version.clone(),
        log_version: config.log_version.clone(),
        body: event.message.clone(),
        log_source: config.log_source.clone(),
        log_type: config.log_type.clone(),
        host: config.host.clone(),
        platform: config.platform.clone(),
        log_level: event.level.as_str().to_string(),
    }
}

/// True when `logger` is one of the transport namespaces or below one.
#[must_use]
pub fn is_transport_logger(logger: &str) -> bool {
    TRANSPORT_NAMESPACES.iter().any(|ns| {
        logger == *ns
            || logger
                .strip_prefix(ns)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Builds requests from events and submits them.
pub struct LogForwarder {
    config: LoggingConfig,
    sender: Arc<dyn LogSender>,
}

impl LogForwarder {
    /// Creates a forwarder over `sender`.
    #[must_use]
    pub fn new(config: LoggingConfig, sender: Arc<dyn LogSender>) -> Self {
        Self { config, sender }
    }

    /// Configuration used to fill each request.
    #[must_use]
    pub const fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Submits `event` exactly once.
    ///
    /// # Errors
    ///
    /// Returns `LoggingError::Forward` if the sender rejects the request.
    pub fn forward(&self, event: &LogEvent) -> Result<()> {
        let request = build_request(event, &self.config);
        self.sender.send_log(&request)?;
        Ok(())
    }
}

impl fmt::Debug for LogForwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogForwarder")
            .field("app_key", &self.config.app_key)
            .field("sender", &self.sender)
            .finish()
    }
}

/// Resets the re-entrancy flag when forwarding ends, even on early return.
struct ForwardingGuard;

impl ForwardingGuard {
    fn enter() -> Option<Self> {
        FORWARDING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(Self)
            }
        })
    }
}

impl Drop for ForwardingGuard {
    fn drop(&mut self) {
        FORWARDING.with(|flag| flag.set(false));
    }
}

/// Sink that forwards each event through a [`LogForwarder`].
#[derive(Debug)]
pub struct RemoteSink {
    name: String,
    forwarder: LogForwarder,
    started: AtomicBool,
}

impl RemoteSink {
    /// Creates a remote sink named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, forwarder: LogForwarder) -> Self {
        Self {
            name: name.into(),
            forwarder,
            started: AtomicBool::new(false),
        }
    }

    /// The wrapped forwarder.
    #[must_use]
    pub const fn forwarder(&self) -> &LogForwarder {
        &self.forwarder
    }
}

impl Sink for RemoteSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<()> {
        self.forwarder.config.validate()?;
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
        if is_transport_logger(&event.logger) {
            return Ok(());
        }
        let Some(_guard) = ForwardingGuard::enter() else {
            return Ok(());
        };
        self.forwarder.forward(event)
    }
}
