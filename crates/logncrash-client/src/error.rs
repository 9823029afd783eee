//! Error types for the Log & Crash client.

use thiserror::Error;

/// Errors that can occur while building or delivering log records.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required request field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The ingestion endpoint is not a usable URL.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint {
        /// Why the endpoint was rejected.
        reason: String,
    },

    /// The HTTP request could not be completed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingestion service answered with a non-success status.
    #[error("unexpected response status: {0}")]
    Status(u16),

    /// Serialization of the request failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The delivery worker is no longer accepting records.
    #[error("log sender closed")]
    Closed,

    /// The delivery queue is at capacity; the record was dropped.
    #[error("log sender queue full")]
    QueueFull,

    /// The delivery worker could not be started.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// A sender configured to fail rejected the record.
    #[error("send rejected: {0}")]
    Rejected(String),
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
