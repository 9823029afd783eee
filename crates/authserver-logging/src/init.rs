//! Process-wide logging initialization.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use logncrash_client::{HttpLogSender, HttpSenderConfig, LogSender};
use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::assembler::{AssembledSinks, LoggingAssembler};
use crate::config::LoggingConfig;
use crate::error::{LoggingError, Result};
use crate::layer::RegistryLayer;
use crate::registry::LoggerRegistry;

static LOGGING: OnceCell<Logging> = OnceCell::new();
static INIT_STARTED: AtomicBool = AtomicBool::new(false);

/// An assembled and bound logging pipeline.
#[derive(Debug)]
pub struct Logging {
    config: LoggingConfig,
    sinks: AssembledSinks,
    registry: Arc<LoggerRegistry>,
}

impl Logging {
    /// Assembles sinks and binds loggers without installing anything
    /// globally.
    ///
    /// # Errors
    ///
    /// Returns an error if assembly fails.
    pub fn new(config: LoggingConfig, sender: Arc<dyn LogSender>) -> Result<Self> {
        let assembler = LoggingAssembler::new(config, sender);
        let sinks = assembler.assemble()?;
        let registry = Arc::new(assembler.bind_loggers(&sinks));
        let config = assembler.config().clone();
        Ok(Self {
            config,
            sinks,
            registry,
        })
    }

    /// The configuration the pipeline was built from.
    #[must_use]
    pub const fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// The four started sinks.
    #[must_use]
    pub const fn sinks(&self) -> &AssembledSinks {
        &self.sinks
    }

    /// The bound loggers.
    #[must_use]
    pub fn registry(&self) -> &LoggerRegistry {
        &self.registry
    }

    /// A `tracing` layer feeding this pipeline, for callers composing their
    /// own subscriber.
    #[must_use]
    pub fn layer(&self) -> RegistryLayer {
        RegistryLayer::new(Arc::clone(&self.registry))
    }
}

/// Builds the pipeline and installs it as the global `tracing` subscriber.
///
/// May succeed once per process. Later calls return
/// [`LoggingError::AlreadyInitialized`]. A failed attempt may be retried.
///
/// # Errors
///
/// Returns an error if logging was already initialized, assembly fails, or
/// another global subscriber is already installed.
pub fn init_logging(config: LoggingConfig, sender: Arc<dyn LogSender>) -> Result<&'static Logging> {
    if INIT_STARTED.swap(true, Ordering::AcqRel) {
        return Err(LoggingError::AlreadyInitialized);
    }

    let result = install(config, sender);
    if result.is_err() {
        INIT_STARTED.store(false, Ordering::Release);
    }
    result
}

fn install(config: LoggingConfig, sender: Arc<dyn LogSender>) -> Result<&'static Logging> {
    let logging = Logging::new(config, sender)?;
    let layer = logging.layer();

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LoggingError::Subscriber(e.to_string()))?;

    LOGGING
        .try_insert(logging)
        .map_err(|_| LoggingError::AlreadyInitialized)
}

/// Loads `LOGNCRASH_*` settings from the environment and initializes logging
/// with an HTTP sender for the configured endpoint.
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid, the sender
/// cannot be created, or initialization fails.
pub fn init_from_env() -> Result<&'static Logging> {
    let config = LoggingConfig::from_env()?;
    let sender = HttpLogSender::new(
        HttpSenderConfig::new(config.endpoint.clone())?.with_timeout_secs(config.timeout_secs),
    )?;
    init_logging(config, Arc::new(sender))
}

/// The global pipeline, once [`init_logging`] has succeeded.
#[must_use]
pub fn logging() -> Option<&'static Logging> {
    LOGGING.get()
}
