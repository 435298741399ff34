use std::{fmt, fmt::Write as _, time::Duration};

use crate::tags::TagSet;

/// Metric kinds, and their single-character wire codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricKind {
    /// Counter (`c`).
    Counter,

    /// Gauge (`g`).
    Gauge,

    /// Duration, in milliseconds (`d`).
    Duration,

    /// Histogram (`h`).
    Histogram,

    /// Unique occurrences, or set membership (`s`).
    Unique,
}

impl MetricKind {
    /// Returns the wire code for this kind.
    pub const fn code(self) -> char {
        match self {
            Self::Counter => 'c',
            Self::Gauge => 'g',
            Self::Duration => 'd',
            Self::Histogram => 'h',
            Self::Unique => 's',
        }
    }
}

/// A metric value, which also determines the metric kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    /// Signed delta applied to a counter. Decrements are negative.
    Counter(i64),

    /// Point-in-time value.
    Gauge(i64),

    /// Elapsed time. Rendered as whole milliseconds, truncated.
    Duration(Duration),

    /// Observation count.
    Histogram(u64),

    /// Set member token.
    Unique(i64),
}

impl MetricValue {
    /// Returns the kind of metric this value belongs to.
    pub const fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Duration(_) => MetricKind::Duration,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Unique(_) => MetricKind::Unique,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter(v) | Self::Gauge(v) | Self::Unique(v) => write!(f, "{}", v),
            Self::Duration(d) => write!(f, "{}", d.as_millis()),
            Self::Histogram(v) => write!(f, "{}", v),
        }
    }
}

/// Client-side sample rate.
///
/// Rates of 1.0 and above mean "unsampled": every event is kept and no rate is written. Rates below 1.0 keep each event
/// with that probability, and kept events carry the rate on the wire so the receiver can scale counts back up. Rates of
/// zero or below, and NaN, keep nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRate(f64);

impl SampleRate {
    /// Creates a new `SampleRate`.
    pub const fn new(rate: f64) -> Self {
        Self(rate)
    }

    /// Returns the rate that keeps every event.
    pub const fn unsampled() -> Self {
        Self(1.0)
    }

    /// Returns the raw rate.
    pub const fn rate(self) -> f64 {
        self.0
    }

    /// Returns `true` if every event is kept without a rate suffix.
    pub fn is_unsampled(self) -> bool {
        self.0 >= 1.0
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        Self::unsampled()
    }
}

impl From<f64> for SampleRate {
    fn from(rate: f64) -> Self {
        Self(rate)
    }
}

/// Renders the rate in shortest form, switching to exponent notation (`1e-07`, `1.5e+06`) when the decimal exponent is
/// below -4 or at least 6. The exponent always carries a sign and at least two digits.
impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rate = self.0;
        if !rate.is_finite() || rate == 0.0 {
            return write!(f, "{}", rate);
        }

        let scientific = format!("{:e}", rate);
        let parsed = scientific
            .split_once('e')
            .and_then(|(mantissa, exp)| exp.parse::<i32>().ok().map(|exp| (mantissa, exp)));
        match parsed {
            Some((mantissa, exp)) if !(-4..6).contains(&exp) => {
                let sign = if exp < 0 { '-' } else { '+' };
                write!(f, "{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
            }
            _ => write!(f, "{}", rate),
        }
    }
}

/// A single metric observation, ready to be encoded.
#[derive(Clone, Copy, Debug)]
pub struct MetricEvent<'a> {
    name: &'a str,
    value: MetricValue,
    tags: &'a TagSet,
    timestamp: i64,
}

impl<'a> MetricEvent<'a> {
    /// Creates a new `MetricEvent`.
    ///
    /// `timestamp` is in seconds since the Unix epoch.
    pub fn new(name: &'a str, value: MetricValue, tags: &'a TagSet, timestamp: i64) -> Self {
        Self {
            name,
            value,
            tags,
            timestamp,
        }
    }

    /// Returns the metric name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Returns the metric value.
    pub fn value(&self) -> MetricValue {
        self.value
    }

    /// Returns the metric kind.
    pub fn kind(&self) -> MetricKind {
        self.value.kind()
    }

    /// Returns the tags.
    pub fn tags(&self) -> &'a TagSet {
        self.tags
    }

    /// Returns the timestamp, in seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Appends the encoded line for this event, without the sample rate suffix, to `out`.
    pub(crate) fn render(&self, prefix: &str, out: &mut String) {
        // Writing into a `String` cannot fail.
        let _ = write!(
            out,
            "{}{}:{}|{}|{}|T{}",
            prefix,
            self.name,
            self.value,
            self.kind().code(),
            self.tags,
            self.timestamp
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(prefix: &str, event: MetricEvent<'_>) -> String {
        let mut out = String::new();
        event.render(prefix, &mut out);
        out
    }

    #[test]
    fn kind_codes() {
        assert_eq!(MetricValue::Counter(-1).kind().code(), 'c');
        assert_eq!(MetricValue::Gauge(0).kind().code(), 'g');
        assert_eq!(MetricValue::Duration(Duration::ZERO).kind().code(), 'd');
        assert_eq!(MetricValue::Histogram(0).kind().code(), 'h');
        assert_eq!(MetricValue::Unique(0).kind().code(), 's');
    }

    #[test]
    fn duration_rendered_as_truncated_milliseconds() {
        let cases = [
            (Duration::from_millis(350), "350"),
            (Duration::from_secs(5), "5000"),
            (Duration::from_nanos(50), "0"),
            (Duration::from_nanos(123_456_789), "123"),
        ];

        for (duration, expected) in cases {
            assert_eq!(MetricValue::Duration(duration).to_string(), expected);
        }
    }

    #[test]
    fn renders_full_line() {
        let tags = TagSet::from_iter([("job", "api")]);
        let event = MetricEvent::new("cpu_usage", MetricValue::Gauge(42), &tags, 1000);
        assert_eq!(render("", event), "cpu_usage:42|g|#job:api|T1000");
    }

    #[test]
    fn renders_empty_tags_as_empty_segment() {
        let tags = TagSet::new();
        let event = MetricEvent::new("decr", MetricValue::Counter(-1), &tags, 7);
        assert_eq!(render("", event), "decr:-1|c||T7");
    }

    #[test]
    fn prefix_is_prepended_verbatim() {
        let tags = TagSet::new();
        let event = MetricEvent::new("incr", MetricValue::Counter(1), &tags, 7);
        assert_eq!(render("foo.bar.baz.", event), "foo.bar.baz.incr:1|c||T7");
        assert_eq!(render("foo", event), "fooincr:1|c||T7");
    }

    #[test]
    fn sample_rate_boundaries() {
        assert!(SampleRate::unsampled().is_unsampled());
        assert!(SampleRate::new(1.5).is_unsampled());
        assert!(!SampleRate::new(0.999).is_unsampled());
        assert!(!SampleRate::new(0.0).is_unsampled());
        assert!(!SampleRate::new(f64::NAN).is_unsampled());
        assert_eq!(SampleRate::new(0.25).to_string(), "0.25");
    }

    #[test]
    fn sample_rate_switches_to_exponent_form() {
        let cases = [
            (0.5, "0.5"),
            (0.0001, "0.0001"),
            (0.00012, "0.00012"),
            (0.00001, "1e-05"),
            (1e-7, "1e-07"),
            (2.5e-7, "2.5e-07"),
            (1.5e-123, "1.5e-123"),
            (0.0, "0"),
            (123456.0, "123456"),
            (1234567.0, "1.234567e+06"),
        ];

        for (rate, expected) in cases {
            assert_eq!(SampleRate::new(rate).to_string(), expected, "rate {:e}", rate);
        }
    }
}
