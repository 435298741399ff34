//! Remote-write intake.
//!
//! Serves `POST /api/v1/write`. Request bodies are decoded, translated, and forwarded to the sink before the response
//! is sent. Only a body that fails to decode fails the request; per-metric encoding failures are logged and the request
//! still succeeds.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Router,
};
use statsbridge_remote_write::decode_write_request;
use tracing::{debug, error, warn};

use crate::translate::SeriesDispatcher;

/// Path of the remote-write endpoint.
pub const REMOTE_WRITE_PATH: &str = "/api/v1/write";

/// Default maximum request body size, in bytes.
pub const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Shared state of the intake handlers.
#[derive(Clone)]
pub struct IntakeState {
    dispatcher: Arc<SeriesDispatcher>,
}

impl IntakeState {
    /// Creates a new `IntakeState` around the given dispatcher.
    pub fn new(dispatcher: SeriesDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Builds the intake router.
///
/// Bodies larger than `max_request_body_size` bytes are rejected with `413 Payload Too Large`.
pub fn intake_router(state: IntakeState, max_request_body_size: usize) -> Router {
    Router::new()
        .route(REMOTE_WRITE_PATH, post(handle_remote_write))
        .layer(DefaultBodyLimit::max(max_request_body_size))
        .with_state(state)
}

async fn handle_remote_write(State(state): State<IntakeState>, body: Bytes) -> (StatusCode, String) {
    debug!(body_len = body.len(), "Received remote-write payload.");

    let series = match decode_write_request(&body) {
        Ok(series) => series,
        Err(e) => {
            error!(error = %e, "Failed to decode remote-write payload.");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let outcome = state.dispatcher.process_batch(&series);
    if !outcome.errors.is_empty() {
        warn!(
            failed_events = outcome.errors.len(),
            "Some metrics in the remote-write payload could not be encoded."
        );
    }

    (StatusCode::OK, String::new())
}
