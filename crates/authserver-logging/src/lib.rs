//! # authserver-logging
//!
//! Logging assembly for the BuzzBook auth server.
//!
//! This crate provides:
//!
//! - [`LoggingConfig`] - Settings from `LOGNCRASH_*` variables or TOML
//! - [`LoggingAssembler`] - Builds the `STDOUT`, `LOGS`, `ERROR` and
//!   `LOGNCRASH` sinks and binds them to loggers
//! - [`LoggerRegistry`] - Hierarchical loggers with additivity
//! - [`RollingFileSink`] - Size- and date-rolled files with retention
//! - [`LogForwarder`] - Turns events into Log & Crash requests
//! - [`RegistryLayer`] - Feeds `tracing` events into the registry
//! - [`init_logging`] - One-time global installation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authserver_logging::{init_logging, LoggingConfig};
//! use logncrash_client::RecordingSender;
//!
//! let config = LoggingConfig::new(
//!     "1.0", "h1", "web", "v1", "auth", "app", "buzz", "/var/log/auth", "app",
//! );
//! let logging = init_logging(config, Arc::new(RecordingSender::new()))?;
//!
//! tracing::debug!(target: "authserver", "user login failed");
//! assert_eq!(logging.registry().logger_names().len(), 5);
//! # Ok::<(), authserver_logging::LoggingError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod error;
pub mod event;
pub mod filter;
pub mod forwarder;
pub mod init;
pub mod layer;
pub mod level;
pub mod registry;
pub mod rolling;
pub mod sink;

// Re-export main types
pub use assembler::{
    AssembledSinks, ERROR_SINK, LOGNCRASH_SINK, LOGS_SINK, LoggerBinding, LoggingAssembler,
    STDOUT_SINK, binding_table,
};
pub use config::LoggingConfig;
pub use encoder::{PATTERN, PatternEncoder};
pub use error::{LoggingError, Result};
pub use event::LogEvent;
pub use filter::{FilterReply, LevelFilter};
pub use forwarder::{LogForwarder, RemoteSink, build_request};
pub use init::{Logging, init_from_env, init_logging, logging};
pub use layer::RegistryLayer;
pub use level::Level;
pub use registry::{LoggerRegistry, ROOT_LOGGER};
pub use rolling::{FileSize, RollingFileSink, RollingPolicy};
pub use sink::{ConsoleSink, Sink};
