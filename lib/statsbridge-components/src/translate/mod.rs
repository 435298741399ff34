//! Time series translation.
//!
//! Each series is mapped onto metric events as follows:
//!
//! - the `__name__` label is the metric name, and every other label becomes a tag
//! - each sample becomes a gauge, with the value truncated to an integer
//! - each exemplar becomes a duration, with the value read as nanoseconds
//! - each histogram becomes a histogram event carrying its total observation count
//!
//! Exemplar labels are merged into the series tags after the exemplar is emitted, so every exemplar also carries the
//! labels of the exemplars before it in the same series.

use std::{io::Write, sync::Arc, time::Duration};

use bytes::Bytes;
use statsbridge_remote_write::{TimeSeries, METRIC_NAME_LABEL};
use statsbridge_sink::MetricSink;
use statsbridge_statsd::{
    ClientError, MetricEvent, MetricValue, MetricsClient, MetricsClientBuilder, SampleRate, TagSet,
    DEFAULT_BUFFER_CAPACITY,
};
use tracing::{debug, warn};

/// Result of processing one batch of time series.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Encoded payload handed to the sink.
    pub payload: Bytes,

    /// Errors hit while encoding individual events, or while flushing.
    pub errors: Vec<ClientError>,
}

/// Translates batches of time series and forwards the encoded result to a sink.
///
/// Every batch gets its own metrics client, so nothing but the sink is shared between batches.
pub struct SeriesDispatcher {
    sink: Arc<dyn MetricSink>,
    buffer_capacity: usize,
    prefix: String,
}

impl SeriesDispatcher {
    /// Creates a new `SeriesDispatcher` that forwards to the given sink.
    pub fn new(sink: Arc<dyn MetricSink>) -> Self {
        Self {
            sink,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            prefix: String::new(),
        }
    }

    /// Sets the buffer capacity of the per-batch metrics client, in bytes.
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Sets the literal prefix prepended to every metric name.
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Translates a batch of time series, then hands the encoded payload to the sink.
    ///
    /// Failures to encode individual events are logged and collected in the outcome, and never stop the batch. The
    /// sink is called exactly once per batch, even when the payload is empty.
    pub fn process_batch(&self, series: &[TimeSeries]) -> BatchOutcome {
        let client = MetricsClientBuilder::new()
            .with_buffer_capacity(self.buffer_capacity)
            .with_prefix(self.prefix.as_str())
            .build(Vec::new());

        let mut errors = translate_series(&client, series);
        if let Err(e) = client.flush() {
            warn!(error = %e, "Failed to flush encoded metrics.");
            errors.push(e);
        }

        let payload = Bytes::from(client.into_writer());
        debug!(
            series = series.len(),
            payload_len = payload.len(),
            failed_events = errors.len(),
            "Translated remote-write batch."
        );

        self.sink.capture_metric(payload.clone());

        BatchOutcome { payload, errors }
    }
}

/// Translates time series into metric events on the given client.
///
/// Returns the errors hit along the way. The client is not flushed.
pub fn translate_series<W: Write>(client: &MetricsClient<W>, series: &[TimeSeries]) -> Vec<ClientError> {
    let mut errors = Vec::new();
    let mut record = |name: &str, result: Result<(), ClientError>| {
        if let Err(e) = result {
            warn!(metric_name = name, error = %e, "Failed to encode metric.");
            errors.push(e);
        }
    };

    for ts in series {
        let mut name = "";
        let mut tags = TagSet::new();
        for label in &ts.labels {
            if label.name == METRIC_NAME_LABEL {
                name = label.value.as_str();
            } else {
                tags.insert(label.name.as_str(), label.value.as_str());
            }
        }

        if name.is_empty() {
            debug!(tags = %tags, "Time series has no metric name.");
        }

        for sample in &ts.samples {
            let event = MetricEvent::new(name, MetricValue::Gauge(sample.value as i64), &tags, sample.timestamp);
            record(name, client.send(&event, SampleRate::unsampled()));
        }

        for exemplar in &ts.exemplars {
            let elapsed = Duration::from_nanos(exemplar.value as u64);
            let event = MetricEvent::new(name, MetricValue::Duration(elapsed), &tags, exemplar.timestamp);
            record(name, client.send(&event, SampleRate::unsampled()));

            tags.merge(
                exemplar
                    .labels
                    .iter()
                    .map(|label| (label.name.as_str(), label.value.as_str())),
            );
        }

        for histogram in &ts.histograms {
            let value = MetricValue::Histogram(histogram.total_count());
            let event = MetricEvent::new(name, value, &tags, histogram.timestamp());
            record(name, client.send(&event, SampleRate::unsampled()));
        }
    }

    errors
}
