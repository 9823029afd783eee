//! Error types for logging assembly.

use thiserror::Error;

/// Errors that can occur while assembling or running the logging pipeline.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A file size string could not be parsed.
    #[error("invalid file size: {0}")]
    InvalidFileSize(String),

    /// A level name could not be parsed.
    #[error("invalid level: {0}")]
    InvalidLevel(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sink was used before it was started.
    #[error("sink not started: {0}")]
    SinkNotStarted(String),

    /// Logging was already initialized for this process.
    #[error("logging already initialized")]
    AlreadyInitialized,

    /// The global tracing subscriber could not be installed.
    #[error("failed to install subscriber: {0}")]
    Subscriber(String),

    /// The remote forwarder could not hand the record to its sender.
    #[error("forwarding failed: {0}")]
    Forward(#[from] logncrash_client::ClientError),
}

/// Result type alias for logging operations.
pub type Result<T> = std::result::Result<T, LoggingError>;
