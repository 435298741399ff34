use std::{
    fmt,
    io,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use rand::{rngs::StdRng, Rng as _, SeedableRng as _};
use snafu::{ResultExt as _, Snafu};

use crate::{
    event::{MetricEvent, MetricValue, SampleRate},
    tags::TagSet,
};

/// Default buffer capacity, in bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

/// Metrics client error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ClientError {
    /// The client was closed and can no longer be used.
    #[snafu(display("client closed"))]
    Closed,

    /// Buffered lines could not be written to the underlying writer.
    #[snafu(display("failed to write buffered metrics: {source}"))]
    Write {
        /// Error source.
        source: io::Error,
    },
}

/// Builder for [`MetricsClient`].
#[derive(Clone, Debug)]
pub struct MetricsClientBuilder {
    buffer_capacity: usize,
    prefix: String,
    seed: Option<u64>,
}

impl MetricsClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the buffer capacity, in bytes.
    ///
    /// Defaults to 256 bytes.
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Sets a prefix for every metric name.
    ///
    /// The prefix is literal: to turn `baz` into `foo.bar.baz`, the prefix must be `foo.bar.`, as no delimiter is
    /// inserted.
    pub fn with_prefix<P: Into<String>>(mut self, prefix: P) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Seeds the random number generator used for sampling, making sampling decisions reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the client on top of the given writer.
    pub fn build<W: io::Write>(self, writer: W) -> MetricsClient<W> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        MetricsClient {
            prefix: self.prefix,
            inner: Mutex::new(Inner {
                writer,
                buffer: Vec::with_capacity(self.buffer_capacity),
                capacity: self.buffer_capacity,
                rng,
                delivered: false,
                closed: false,
            }),
        }
    }
}

impl Default for MetricsClientBuilder {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            prefix: String::new(),
            seed: None,
        }
    }
}

struct Inner<W> {
    writer: W,
    buffer: Vec<u8>,
    capacity: usize,
    rng: StdRng,
    delivered: bool,
    closed: bool,
}

impl<W: io::Write> Inner<W> {
    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }

    fn flush_buffer(&mut self) -> Result<(), ClientError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        // Whatever happens, the buffered bytes are gone afterwards: a failed write may have been partially accepted,
        // and writing the same lines again would duplicate them.
        let result = self.writer.write_all(&self.buffer).and_then(|()| self.writer.flush());
        self.buffer.clear();
        result.context(Write)?;

        self.delivered = true;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<(), ClientError> {
        // Separate only from lines that are still buffered or already reached the writer.
        let separator: &[u8] = if self.delivered || !self.buffer.is_empty() {
            b"\n"
        } else {
            b""
        };
        let line_len = separator.len() + line.len();

        if self.capacity.saturating_sub(self.buffer.len()) < line_len {
            self.flush_buffer()?;
        }

        if line_len > self.capacity {
            // Lines larger than the whole buffer go straight to the writer, in one piece.
            let mut chunk = Vec::with_capacity(line_len);
            chunk.extend_from_slice(separator);
            chunk.extend_from_slice(line.as_bytes());
            self.writer
                .write_all(&chunk)
                .and_then(|()| self.writer.flush())
                .context(Write)?;
            self.delivered = true;
        } else {
            self.buffer.extend_from_slice(separator);
            self.buffer.extend_from_slice(line.as_bytes());
        }

        Ok(())
    }
}

/// A buffering, sampling metrics client.
///
/// Each metric event is rendered as one line and appended to an in-memory buffer of fixed capacity. Lines are
/// separated by `\n`. When a line does not fit in the remaining capacity, the buffered lines are written to the
/// underlying writer first, so lines are never split across two writes. Buffered lines reach the writer only when
/// the buffer overflows, or on [`flush`][Self::flush] and [`close`][Self::close].
///
/// All operations take `&self`: buffer access is serialized by an internal lock, so one client can be shared between
/// threads.
///
/// Once closed, every operation fails with [`ClientError::Closed`].
pub struct MetricsClient<W> {
    prefix: String,
    inner: Mutex<Inner<W>>,
}

impl<W: io::Write> MetricsClient<W> {
    /// Creates a new `MetricsClient` with default settings on top of the given writer.
    pub fn new(writer: W) -> Self {
        MetricsClientBuilder::default().build(writer)
    }

    fn lock(&self) -> MutexGuard<'_, Inner<W>> {
        // Buffer state stays consistent even if a writer panicked mid-flush, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sends a metric event at the given sample rate.
    ///
    /// Events dropped by sampling are not an error.
    ///
    /// # Errors
    ///
    /// If the client is closed, or if the buffer had to be flushed to make room for the line and writing to the
    /// underlying writer failed, an error is returned. In the latter case, both the previously buffered lines and this
    /// event are lost.
    pub fn send(&self, event: &MetricEvent<'_>, rate: SampleRate) -> Result<(), ClientError> {
        let mut line = String::with_capacity(self.prefix.len() + event.name().len() + 32);
        event.render(&self.prefix, &mut line);

        let mut inner = self.lock();
        inner.ensure_open()?;

        if !rate.is_unsampled() {
            if inner.rng.random::<f64>() < rate.rate() {
                line.push_str("|@");
                line.push_str(&rate.to_string());
            } else {
                return Ok(());
            }
        }

        inner.write_line(&line)
    }

    fn send_now(&self, name: &str, value: MetricValue, rate: SampleRate, tags: &TagSet) -> Result<(), ClientError> {
        let event = MetricEvent::new(name, value, tags, chrono::Utc::now().timestamp());
        self.send(&event, rate)
    }

    /// Increments the counter `name` by `count`, at the given sample rate.
    pub fn increment(&self, name: &str, count: i64, rate: SampleRate, tags: &TagSet) -> Result<(), ClientError> {
        self.send_now(name, MetricValue::Counter(count), rate, tags)
    }

    /// Increments the counter `name` by one.
    pub fn incr(&self, name: &str, tags: &TagSet) -> Result<(), ClientError> {
        self.increment(name, 1, SampleRate::unsampled(), tags)
    }

    /// Increments the counter `name` by `n`.
    pub fn incr_by(&self, name: &str, n: i64, tags: &TagSet) -> Result<(), ClientError> {
        self.increment(name, n, SampleRate::unsampled(), tags)
    }

    /// Decrements the counter `name` by `count`, at the given sample rate.
    pub fn decrement(&self, name: &str, count: i64, rate: SampleRate, tags: &TagSet) -> Result<(), ClientError> {
        self.increment(name, count.saturating_neg(), rate, tags)
    }

    /// Decrements the counter `name` by one.
    pub fn decr(&self, name: &str, tags: &TagSet) -> Result<(), ClientError> {
        self.decrement(name, 1, SampleRate::unsampled(), tags)
    }

    /// Decrements the counter `name` by `n`.
    pub fn decr_by(&self, name: &str, n: i64, tags: &TagSet) -> Result<(), ClientError> {
        self.decrement(name, n, SampleRate::unsampled(), tags)
    }

    /// Records time spent, in whole milliseconds.
    pub fn duration(&self, name: &str, duration: Duration, tags: &TagSet) -> Result<(), ClientError> {
        self.send_now(name, MetricValue::Duration(duration), SampleRate::unsampled(), tags)
    }

    /// Records a histogram observation count.
    pub fn histogram(&self, name: &str, value: u64, tags: &TagSet) -> Result<(), ClientError> {
        self.send_now(name, MetricValue::Histogram(value), SampleRate::unsampled(), tags)
    }

    /// Records an arbitrary point-in-time value.
    pub fn gauge(&self, name: &str, value: i64, tags: &TagSet) -> Result<(), ClientError> {
        self.send_now(name, MetricValue::Gauge(value), SampleRate::unsampled(), tags)
    }

    /// Records a unique occurrence of `value`.
    pub fn unique(&self, name: &str, value: i64, rate: SampleRate, tags: &TagSet) -> Result<(), ClientError> {
        self.send_now(name, MetricValue::Unique(value), rate, tags)
    }

    /// Writes any buffered lines to the underlying writer.
    ///
    /// Does nothing if the buffer is empty.
    ///
    /// # Errors
    ///
    /// If the client is closed, or writing to the underlying writer fails, an error is returned. The buffered lines are
    /// discarded either way.
    pub fn flush(&self) -> Result<(), ClientError> {
        let mut inner = self.lock();
        inner.ensure_open()?;
        inner.flush_buffer()
    }

    /// Flushes the buffer and closes the client.
    ///
    /// # Errors
    ///
    /// If the client is already closed, or the final flush fails, an error is returned. A client whose final flush
    /// failed stays open.
    pub fn close(&self) -> Result<(), ClientError> {
        let mut inner = self.lock();
        inner.ensure_open()?;
        inner.flush_buffer()?;
        inner.closed = true;
        Ok(())
    }

    /// Returns `true` if the client has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Consumes the client, returning the underlying writer.
    ///
    /// Lines still sitting in the buffer are discarded; call [`flush`][Self::flush] first to keep them.
    pub fn into_writer(self) -> W {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).writer
    }
}

impl<W> fmt::Debug for MetricsClient<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsClient").field("prefix", &self.prefix).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::*;

    /// Writer that records every write as a separate chunk.
    #[derive(Clone, Default)]
    struct ChunkRecorder {
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl ChunkRecorder {
        fn chunks(&self) -> Vec<String> {
            self.chunks
                .lock()
                .unwrap()
                .iter()
                .map(|c| String::from_utf8(c.clone()).unwrap())
                .collect()
        }

        fn output(&self) -> String {
            self.chunks().concat()
        }
    }

    impl io::Write for ChunkRecorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.chunks.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl io::Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn gauge<'a>(name: &'a str, value: i64, tags: &'a TagSet) -> MetricEvent<'a> {
        MetricEvent::new(name, MetricValue::Gauge(value), tags, 1000)
    }

    fn flushed(client: MetricsClient<Vec<u8>>) -> String {
        client.flush().unwrap();
        String::from_utf8(client.into_writer()).unwrap()
    }

    #[test]
    fn prefix() {
        let client = MetricsClientBuilder::new().with_prefix("foo.bar.baz.").build(Vec::new());
        client.incr("incr", &TagSet::new()).unwrap();

        let out = flushed(client);
        assert!(out.starts_with("foo.bar.baz.incr:1|c||T"), "unexpected output: {}", out);
    }

    #[test]
    fn named_operations() {
        type Op = Box<dyn Fn(&MetricsClient<Vec<u8>>) -> Result<(), ClientError>>;
        let cases: Vec<(Op, &str)> = vec![
            (Box::new(|c| c.incr("incr", &TagSet::new())), "incr:1|c||T"),
            (Box::new(|c| c.incr_by("incr", 5, &TagSet::new())), "incr:5|c||T"),
            (Box::new(|c| c.decr("decr", &TagSet::new())), "decr:-1|c||T"),
            (Box::new(|c| c.decr_by("decr", 3, &TagSet::new())), "decr:-3|c||T"),
            (
                Box::new(|c| c.duration("timing", Duration::from_nanos(123_456_789), &TagSet::new())),
                "timing:123|d||T",
            ),
            (Box::new(|c| c.histogram("hist", 7, &TagSet::new())), "hist:7|h||T"),
            (Box::new(|c| c.gauge("gauge", 300, &TagSet::new())), "gauge:300|g||T"),
            (Box::new(|c| c.gauge("gauge", -300, &TagSet::new())), "gauge:-300|g||T"),
            (
                Box::new(|c| c.unique("unique", 765, SampleRate::unsampled(), &TagSet::new())),
                "unique:765|s||T",
            ),
        ];

        for (op, expected_prefix) in cases {
            let client = MetricsClient::new(Vec::new());
            op(&client).unwrap();

            let out = flushed(client);
            assert!(out.starts_with(expected_prefix), "expected '{}...', got '{}'", expected_prefix, out);

            let timestamp = &out[expected_prefix.len()..];
            assert!(timestamp.parse::<i64>().is_ok(), "bad timestamp in '{}'", out);
        }
    }

    #[test]
    fn multiple_lines_are_newline_separated() {
        let tags = TagSet::from_iter([("foo", "bar"), ("baz", "foo")]);
        let none = TagSet::new();
        let client = MetricsClient::new(Vec::new());
        client
            .send(
                &MetricEvent::new("unique", MetricValue::Unique(765), &tags, 1000),
                SampleRate::unsampled(),
            )
            .unwrap();
        client
            .send(
                &MetricEvent::new("unique", MetricValue::Unique(765), &none, 1000),
                SampleRate::unsampled(),
            )
            .unwrap();

        assert_eq!(
            flushed(client),
            "unique:765|s|#baz:foo,foo:bar|T1000\nunique:765|s||T1000"
        );
    }

    #[test]
    fn nothing_written_until_flush() {
        let recorder = ChunkRecorder::default();
        let client = MetricsClient::new(recorder.clone());
        let tags = TagSet::new();

        client.send(&gauge("a", 1, &tags), SampleRate::unsampled()).unwrap();
        assert!(recorder.chunks().is_empty());

        client.flush().unwrap();
        assert_eq!(recorder.chunks(), vec!["a:1|g||T1000".to_string()]);

        // Flushing an empty buffer is a no-op.
        client.flush().unwrap();
        assert_eq!(recorder.chunks().len(), 1);
    }

    #[test]
    fn overflow_flushes_whole_lines() {
        let recorder = ChunkRecorder::default();
        let client = MetricsClientBuilder::new().with_buffer_capacity(64).build(recorder.clone());
        let tags = TagSet::from_iter([("foo", "bar")]);

        for _ in 0..40 {
            client
                .send(
                    &MetricEvent::new("unique", MetricValue::Unique(765), &tags, 1000),
                    SampleRate::unsampled(),
                )
                .unwrap();
        }

        // 27-byte lines, plus separators: two lines fit per 64-byte buffer.
        assert_eq!(recorder.chunks().len(), 19);
        client.flush().unwrap();
        assert_eq!(recorder.chunks().len(), 20);

        let line = "unique:765|s|#foo:bar|T1000";
        assert_eq!(recorder.output(), vec![line; 40].join("\n"));
        for chunk in recorder.chunks() {
            assert!(chunk.len() <= 64);
            for piece in chunk.strip_prefix('\n').unwrap_or(&chunk).split('\n') {
                assert_eq!(piece, line);
            }
        }
    }

    #[test]
    fn oversized_line_written_whole() {
        let recorder = ChunkRecorder::default();
        let client = MetricsClientBuilder::new().with_buffer_capacity(16).build(recorder.clone());
        let tags = TagSet::new();
        let long_name = "a".repeat(40);

        client.send(&gauge("x", 1, &tags), SampleRate::unsampled()).unwrap();
        client.send(&gauge(&long_name, 2, &tags), SampleRate::unsampled()).unwrap();
        client.send(&gauge("y", 3, &tags), SampleRate::unsampled()).unwrap();
        client.flush().unwrap();

        assert_eq!(
            recorder.chunks(),
            vec![
                "x:1|g||T1000".to_string(),
                format!("\n{}:2|g||T1000", long_name),
                "\ny:3|g||T1000".to_string(),
            ]
        );
    }

    #[test]
    fn zero_rate_drops_everything() {
        let client = MetricsClientBuilder::new().with_seed(7).build(Vec::new());
        let tags = TagSet::new();
        for rate in [0.0, -1.0, f64::NAN] {
            for _ in 0..1000 {
                client.send(&gauge("g", 1, &tags), SampleRate::new(rate)).unwrap();
            }
        }

        assert_eq!(flushed(client), "");
    }

    #[test]
    fn full_rate_keeps_everything_without_suffix() {
        let client = MetricsClientBuilder::new()
            .with_buffer_capacity(1 << 20)
            .with_seed(7)
            .build(Vec::new());
        let tags = TagSet::new();
        for rate in [1.0, 1.5] {
            for _ in 0..500 {
                client.send(&gauge("g", 1, &tags), SampleRate::new(rate)).unwrap();
            }
        }

        let out = flushed(client);
        assert_eq!(out.lines().count(), 1000);
        assert!(!out.contains("|@"));
    }

    #[test]
    fn partial_rate_tracks_acceptance_fraction() {
        const ATTEMPTS: usize = 20_000;

        for rate in [0.1, 0.25, 0.5, 0.9] {
            let client = MetricsClientBuilder::new()
                .with_buffer_capacity(1 << 22)
                .with_seed(42)
                .build(Vec::new());
            let tags = TagSet::new();
            for _ in 0..ATTEMPTS {
                client.send(&gauge("g", 1, &tags), SampleRate::new(rate)).unwrap();
            }

            let out = flushed(client);
            let suffix = format!("|@{}", rate);
            let accepted = out.lines().inspect(|line| assert!(line.ends_with(&suffix))).count();
            let observed = accepted as f64 / ATTEMPTS as f64;
            assert!((observed - rate).abs() < 0.02, "rate {}: observed {}", rate, observed);
        }
    }

    #[test]
    fn closed_client_rejects_operations() {
        let recorder = ChunkRecorder::default();
        let client = MetricsClient::new(recorder.clone());
        let tags = TagSet::new();

        client.send(&gauge("before", 1, &tags), SampleRate::unsampled()).unwrap();
        client.close().unwrap();
        assert!(client.is_closed());
        assert_eq!(recorder.output(), "before:1|g||T1000");

        assert!(matches!(
            client.send(&gauge("after", 1, &tags), SampleRate::unsampled()),
            Err(ClientError::Closed)
        ));
        assert!(matches!(client.incr("after", &tags), Err(ClientError::Closed)));
        assert!(matches!(client.flush(), Err(ClientError::Closed)));
        assert!(matches!(client.close(), Err(ClientError::Closed)));
        assert_eq!(recorder.output(), "before:1|g||T1000");
    }

    #[test]
    fn write_failures_are_surfaced() {
        let client = MetricsClientBuilder::new().with_buffer_capacity(16).build(BrokenWriter);
        let tags = TagSet::new();

        client.send(&gauge("a", 1, &tags), SampleRate::unsampled()).unwrap();
        assert!(matches!(
            client.send(&gauge("b", 2, &tags), SampleRate::unsampled()),
            Err(ClientError::Write { .. })
        ));

        client.send(&gauge("c", 3, &tags), SampleRate::unsampled()).unwrap();
        assert!(matches!(client.flush(), Err(ClientError::Write { .. })));

        // The failed flush dropped the buffer, so there is nothing left to write.
        client.flush().unwrap();
        assert!(matches!(client.close(), Ok(())));
    }

    /// Writer that fails the write calls at the given indices and records the rest.
    #[derive(Default)]
    struct FlakyWriter {
        fail_on: Vec<usize>,
        calls: usize,
        written: Vec<u8>,
    }

    impl io::Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink went away"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn written(client: MetricsClient<FlakyWriter>) -> String {
        String::from_utf8(client.into_writer().written).unwrap()
    }

    #[test]
    fn lost_lines_leave_no_separator_behind() {
        let writer = FlakyWriter {
            fail_on: vec![0],
            ..Default::default()
        };
        let client = MetricsClientBuilder::new().with_buffer_capacity(16).build(writer);
        let tags = TagSet::new();

        client.send(&gauge("a", 1, &tags), SampleRate::unsampled()).unwrap();
        assert!(matches!(
            client.send(&gauge("b", 2, &tags), SampleRate::unsampled()),
            Err(ClientError::Write { .. })
        ));
        client.send(&gauge("c", 3, &tags), SampleRate::unsampled()).unwrap();
        client.flush().unwrap();

        assert_eq!(written(client), "c:3|g||T1000");
    }

    #[test]
    fn separator_kept_after_earlier_delivery() {
        let writer = FlakyWriter {
            fail_on: vec![1],
            ..Default::default()
        };
        let client = MetricsClient::new(writer);
        let tags = TagSet::new();

        client.send(&gauge("a", 1, &tags), SampleRate::unsampled()).unwrap();
        client.flush().unwrap();
        client.send(&gauge("b", 2, &tags), SampleRate::unsampled()).unwrap();
        assert!(matches!(client.flush(), Err(ClientError::Write { .. })));
        client.send(&gauge("c", 3, &tags), SampleRate::unsampled()).unwrap();
        client.flush().unwrap();

        assert_eq!(written(client), "a:1|g||T1000\nc:3|g||T1000");
    }

    #[test]
    fn shared_between_threads() {
        let client = Arc::new(MetricsClientBuilder::new().with_buffer_capacity(64).build(ChunkRecorder::default()));
        let handles = (0..4)
            .map(|_| {
                let client = Arc::clone(&client);
                std::thread::spawn(move || {
                    let tags = TagSet::new();
                    for _ in 0..100 {
                        client.send(&gauge("t", 1, &tags), SampleRate::unsampled()).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        client.flush().unwrap();
        let client = Arc::into_inner(client).unwrap();
        let out = client.into_writer().output();
        assert_eq!(out.split('\n').count(), 400);
        assert!(out.split('\n').all(|line| line == "t:1|g||T1000"));
    }

    proptest! {
        #[test]
        fn lines_survive_arbitrary_flush_boundaries(
            capacity in 1usize..128,
            names in arb_vec("[a-z_.]{0,48}", 1..64),
        ) {
            let recorder = ChunkRecorder::default();
            let client = MetricsClientBuilder::new().with_buffer_capacity(capacity).build(recorder.clone());
            let tags = TagSet::from_iter([("env", "test")]);

            let mut expected = Vec::new();
            for (idx, name) in names.iter().enumerate() {
                let event = MetricEvent::new(name, MetricValue::Gauge(idx as i64), &tags, 1000);
                client.send(&event, SampleRate::unsampled()).unwrap();
                expected.push(format!("{}:{}|g|#env:test|T1000", name, idx));
            }
            client.flush().unwrap();

            prop_assert_eq!(recorder.output(), expected.join("\n"));

            let mut seen = Vec::new();
            for chunk in recorder.chunks() {
                let body = chunk.strip_prefix('\n').unwrap_or(&chunk);
                let pieces = body.split('\n').map(str::to_string).collect::<Vec<_>>();
                if pieces.len() > 1 {
                    prop_assert!(chunk.len() <= capacity);
                }
                seen.extend(pieces);
            }
            prop_assert_eq!(seen, expected);
        }
    }
}
