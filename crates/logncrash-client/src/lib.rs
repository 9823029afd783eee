//! # logncrash-client
//!
//! Client side of the Log & Crash log-ingestion API.
//!
//! This crate provides:
//!
//! - [`LogNCrashRequest`] - The flat record sent for each log event
//! - [`LogSender`] - The submit capability injected into a log forwarder
//! - [`HttpLogSender`] - Delivery over HTTP from a background worker
//! - [`RecordingSender`] - In-memory sender for tests and dry runs
//!
//! ## Example
//!
//! ```rust
//! use logncrash_client::{LogNCrashRequest, LogSender, RecordingSender};
//!
//! let request = LogNCrashRequest::builder()
//!     .project_name("buzz")
//!     .project_version("1.0")
//!     .log_version("v1")
//!     .body("user login failed")
//!     .log_source("auth")
//!     .log_type("app")
//!     .host("h1")
//!     .platform("web")
//!     .log_level("DEBUG")
//!     .build()?;
//!
//! let sender = RecordingSender::new();
//! sender.send_log(&request)?;
//! assert_eq!(sender.len(), 1);
//! # Ok::<(), logncrash_client::ClientError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod request;
pub mod sender;

pub use error::{ClientError, Result};
pub use http::{
    DEFAULT_ENDPOINT, DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_SECS, HttpLogSender, HttpSenderConfig,
};
pub use request::{LogNCrashRequest, LogNCrashRequestBuilder};
pub use sender::{LogSender, RecordingSender};
