//! Sentry sink.
//!
//! Payloads are wrapped in an envelope holding a single `statsd` item and posted to the project's envelope endpoint.
//! Delivery happens on a background task fed by a bounded queue: capturing a payload never waits on the network, and
//! when the queue is full the payload is dropped.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering::Relaxed},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client};
use statsbridge_error::{generic_error, ErrorContext as _, GenericError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::MetricSink;

mod dsn;
pub use self::dsn::{Dsn, DsnError};

mod envelope;
use self::envelope::statsd_envelope;

const ENVELOPE_CONTENT_TYPE: &str = "application/x-sentry-envelope";
const SENTRY_AUTH_HEADER: &str = "X-Sentry-Auth";

/// Default timeout for a single envelope request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of payloads that can wait for delivery.
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Sentry sink configuration.
#[derive(Clone, Debug)]
pub struct SentrySinkConfiguration {
    /// Timeout for a single envelope request.
    pub request_timeout: Duration,

    /// Number of payloads that can wait for delivery before new payloads are dropped.
    pub queue_capacity: usize,
}

impl Default for SentrySinkConfiguration {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// A sink that forwards payloads to Sentry.
pub struct SentrySink {
    dsn: Arc<Dsn>,
    payloads_tx: mpsc::Sender<Bytes>,
    dropped: Arc<AtomicU64>,
}

impl SentrySink {
    /// Creates a new `SentrySink` and spawns its delivery task on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// If called outside of a Tokio runtime, if the queue capacity is zero, or if the HTTP client cannot be built, an
    /// error is returned.
    pub fn new(dsn: Dsn, config: SentrySinkConfiguration) -> Result<Self, GenericError> {
        if config.queue_capacity == 0 {
            return Err(generic_error!("Sentry sink queue capacity must be greater than zero."));
        }

        let runtime = tokio::runtime::Handle::try_current().error_context("Sentry sink requires a Tokio runtime.")?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .error_context("Failed to build HTTP client for Sentry sink.")?;

        let dsn = Arc::new(dsn);
        let (payloads_tx, payloads_rx) = mpsc::channel(config.queue_capacity);
        runtime.spawn(run_delivery(client, Arc::clone(&dsn), payloads_rx));

        debug!(
            project_id = dsn.project_id(),
            request_timeout = ?config.request_timeout,
            queue_capacity = config.queue_capacity,
            "Sentry sink started."
        );

        Ok(Self {
            dsn,
            payloads_tx,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Returns the DSN this sink delivers to.
    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Returns the number of payloads dropped because the delivery queue was full or closed.
    pub fn dropped_payloads(&self) -> u64 {
        self.dropped.load(Relaxed)
    }
}

impl MetricSink for SentrySink {
    fn capture_metric(&self, payload: Bytes) {
        if payload.is_empty() {
            trace!("Skipping empty metrics payload.");
            return;
        }

        match self.payloads_tx.try_send(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(payload)) => {
                self.dropped.fetch_add(1, Relaxed);
                warn!(
                    payload_len = payload.len(),
                    "Sentry delivery queue is full. Dropping metrics payload."
                );
            }
            Err(TrySendError::Closed(payload)) => {
                self.dropped.fetch_add(1, Relaxed);
                error!(
                    payload_len = payload.len(),
                    "Sentry delivery task has stopped. Dropping metrics payload."
                );
            }
        }
    }
}

async fn run_delivery(client: Client, dsn: Arc<Dsn>, mut payloads_rx: mpsc::Receiver<Bytes>) {
    let url = dsn.envelope_url();
    let auth = dsn.auth_header();

    while let Some(payload) = payloads_rx.recv().await {
        let envelope = match statsd_envelope(&dsn, &payload, Uuid::new_v4(), Utc::now()) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!(error = %e, "Failed to build Sentry envelope.");
                continue;
            }
        };

        let result = client
            .post(&url)
            .header(CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .header(SENTRY_AUTH_HEADER, &auth)
            .body(envelope)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                trace!(payload_len = payload.len(), "Delivered metrics payload to Sentry.");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Sentry rejected metrics payload.");
            }
            Err(e) => {
                warn!(error = %e, "Failed to deliver metrics payload to Sentry.");
            }
        }
    }

    debug!("Sentry delivery task stopped.");
}
