//! Telemetry sinks.
//!
//! A sink receives the encoded payload of one remote-write request and takes it from there. The hand-off is
//! fire-and-forget: sinks never report delivery failures back to the caller, and must not block it.
#![deny(warnings)]
#![deny(missing_docs)]

use std::sync::Mutex;

use bytes::Bytes;
use tracing::trace;

pub mod sentry;

/// A destination for encoded metric payloads.
pub trait MetricSink: Send + Sync {
    /// Captures an encoded payload.
    ///
    /// The payload is a sequence of newline-separated metric lines. Implementations must return promptly: any I/O
    /// happens in the background, and failures are logged rather than returned.
    fn capture_metric(&self, payload: Bytes);
}

/// A sink that discards every payload.
///
/// Used when no downstream is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlackholeSink;

impl MetricSink for BlackholeSink {
    fn capture_metric(&self, payload: Bytes) {
        trace!(payload_len = payload.len(), "Discarding metrics payload.");
    }
}

/// A sink that keeps every payload in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    payloads: Mutex<Vec<Bytes>>,
}

impl MemorySink {
    /// Creates a new, empty `MemorySink`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payloads captured so far, in capture order.
    pub fn payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the number of payloads captured so far.
    pub fn len(&self) -> usize {
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if no payload has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetricSink for MemorySink {
    fn capture_metric(&self, payload: Bytes) {
        self.payloads.lock().unwrap_or_else(|e| e.into_inner()).push(payload);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn MetricSink> = sink.clone();

        shared.capture_metric(Bytes::from_static(b"a:1|c||T1"));
        shared.capture_metric(Bytes::from_static(b"b:2|g||T2"));

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.payloads(),
            vec![Bytes::from_static(b"a:1|c||T1"), Bytes::from_static(b"b:2|g||T2")]
        );
    }

    #[test]
    fn blackhole_accepts_anything() {
        let sink: Arc<dyn MetricSink> = Arc::new(BlackholeSink);
        sink.capture_metric(Bytes::new());
        sink.capture_metric(Bytes::from_static(b"a:1|c||T1"));
    }
}
