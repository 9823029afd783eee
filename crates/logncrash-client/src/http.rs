//! HTTP delivery of log records to the ingestion endpoint.
//!
//! [`HttpLogSender`] hands each record to a dedicated worker thread that owns a
//! single-threaded tokio runtime and a `reqwest` client. `send_log` only
//! enqueues, so the logging call site never waits on the network. Records are
//! posted one at a time in the order they were enqueued; there is no retry.
//! The queue is bounded: when it is full the record is dropped, counted as
//! failed, and `send_log` returns [`ClientError::QueueFull`].
//!
//! The worker never logs delivery failures. It counts them instead, because
//! anything it logged could be forwarded back into the same queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::request::LogNCrashRequest;
use crate::sender::LogSender;

/// Default Log & Crash collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api-logncrash.cloud.toast.com/v2/log";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default number of records waiting for delivery.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for an [`HttpLogSender`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSenderConfig {
    /// URL the records are POSTed to.
    pub endpoint: String,
    /// Timeout in seconds for each request.
    pub timeout_secs: u64,
    /// Records that may wait for delivery before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for HttpSenderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl HttpSenderConfig {
    /// Creates a configuration for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidEndpoint` if the URL is empty or is not
    /// an `http`/`https` URL.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(ClientError::InvalidEndpoint {
                reason: "endpoint cannot be empty".to_string(),
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ClientError::InvalidEndpoint {
                reason: format!("endpoint must start with http:// or https://: {endpoint}"),
            });
        }

        Ok(Self {
            endpoint,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        })
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Sets the queue capacity. Values below 1 are treated as 1.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

#[derive(Debug, Default)]
struct DeliveryStats {
    sent: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Sends log records to the ingestion endpoint from a background worker.
#[derive(Debug)]
pub struct HttpLogSender {
    config: HttpSenderConfig,
    tx: Option<mpsc::Sender<LogNCrashRequest>>,
    worker: Option<JoinHandle<()>>,
    stats: Arc<DeliveryStats>,
}

impl HttpLogSender {
    /// Starts the delivery worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client, runtime, or worker thread cannot
    /// be created.
    pub fn new(config: HttpSenderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Runtime(e.to_string()))?;

        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(DeliveryStats::default());

        let endpoint = config.endpoint.clone();
        let worker_stats = Arc::clone(&stats);
        let worker = std::thread::Builder::new()
            .name("logncrash-sender".to_string())
            .spawn(move || runtime.block_on(deliver_all(client, endpoint, rx, worker_stats)))
            .map_err(|e| ClientError::Runtime(e.to_string()))?;

        info!(
            endpoint = %config.endpoint,
            timeout_secs = config.timeout_secs,
            queue_capacity = config.queue_capacity,
            "log sender started"
        );

        Ok(Self {
            config,
            tx: Some(tx),
            worker: Some(worker),
            stats,
        })
    }

    /// Returns the endpoint records are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Number of records the service accepted.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.stats.sent.load(Ordering::Relaxed)
    }

    /// Number of records that failed to deliver, including those dropped
    /// because the queue was full.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Description of the most recent delivery failure.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.stats.last_error.lock().clone()
    }

    /// Stops accepting records and waits for queued ones to be attempted.
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl LogSender for HttpLogSender {
    fn send_log(&self, request: &LogNCrashRequest) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(ClientError::Closed)?;
        tx.try_send(request.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                let err = ClientError::QueueFull;
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                *self.stats.last_error.lock() = Some(err.to_string());
                err
            }
            mpsc::error::TrySendError::Closed(_) => ClientError::Closed,
        })
    }
}

impl Drop for HttpLogSender {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn deliver_all(
    client: reqwest::Client,
    endpoint: String,
    mut rx: mpsc::Receiver<LogNCrashRequest>,
    stats: Arc<DeliveryStats>,
) {
    while let Some(request) = rx.recv().await {
        match deliver(&client, &endpoint, &request).await {
            Ok(()) => {
                stats.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                *stats.last_error.lock() = Some(e.to_string());
            }
        }
    }
}

async fn deliver(
    client: &reqwest::Client,
    endpoint: &str,
    request: &LogNCrashRequest,
) -> Result<()> {
    let response = client.post(endpoint).json(request).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::Status(status.as_u16()))
    }
}
