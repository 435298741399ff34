use crate::proto;

/// Label whose value is the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// A label name/value pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
    /// Label name.
    pub name: String,

    /// Label value.
    pub value: String,
}

impl Label {
    /// Creates a new `Label`.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<proto::Label> for Label {
    fn from(label: proto::Label) -> Self {
        Self {
            name: label.name,
            value: label.value,
        }
    }
}

/// A float sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Sample value.
    pub value: f64,

    /// Timestamp, in seconds since the Unix epoch.
    pub timestamp: i64,
}

/// An exemplar.
#[derive(Clone, Debug, PartialEq)]
pub struct Exemplar {
    /// Exemplar value.
    pub value: f64,

    /// Timestamp, in seconds since the Unix epoch.
    pub timestamp: i64,

    /// Exemplar labels.
    pub labels: Vec<Label>,
}

/// A histogram, reduced to the data needed to compute its total observation count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HistogramSummary {
    count: Option<u64>,
    zero_count: u64,
    bucket_count: u64,
    timestamp: i64,
}

impl HistogramSummary {
    /// Creates a summary with an explicit total count.
    pub fn with_count(count: u64, timestamp: i64) -> Self {
        Self {
            count: Some(count),
            zero_count: 0,
            bucket_count: 0,
            timestamp,
        }
    }

    /// Creates a summary without an explicit total count, from the zero bucket and the absolute bucket counts.
    pub fn from_buckets<I>(zero_count: u64, buckets: I, timestamp: i64) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        Self {
            count: None,
            zero_count,
            bucket_count: buckets.into_iter().fold(0, u64::saturating_add),
            timestamp,
        }
    }

    /// Returns the total number of observations.
    ///
    /// The explicit count is used when present. Otherwise, the count is the zero bucket plus every populated bucket.
    pub fn total_count(&self) -> u64 {
        self.count
            .unwrap_or_else(|| self.zero_count.saturating_add(self.bucket_count))
    }

    /// Returns the timestamp, in seconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl From<proto::Histogram> for HistogramSummary {
    fn from(histogram: proto::Histogram) -> Self {
        let timestamp = millis_to_secs(histogram.timestamp);

        match histogram.count {
            Some(proto::histogram::Count::CountInt(count)) => Self::with_count(count, timestamp),
            Some(proto::histogram::Count::CountFloat(count)) => Self::with_count(float_count(count), timestamp),
            None => {
                let zero_count = match histogram.zero_count {
                    Some(proto::histogram::ZeroCount::ZeroCountInt(count)) => count,
                    Some(proto::histogram::ZeroCount::ZeroCountFloat(count)) => float_count(count),
                    None => 0,
                };

                let buckets = undelta(&histogram.negative_deltas)
                    .chain(undelta(&histogram.positive_deltas))
                    .chain(histogram.negative_counts.iter().copied().map(float_count))
                    .chain(histogram.positive_counts.iter().copied().map(float_count));

                Self::from_buckets(zero_count, buckets, timestamp)
            }
        }
    }
}

/// A decoded time series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    /// Labels, in the order they were received.
    pub labels: Vec<Label>,

    /// Float samples.
    pub samples: Vec<Sample>,

    /// Exemplars.
    pub exemplars: Vec<Exemplar>,

    /// Histograms.
    pub histograms: Vec<HistogramSummary>,
}

impl TimeSeries {
    /// Returns the metric name, if the series carries a `__name__` label.
    pub fn name(&self) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == METRIC_NAME_LABEL)
            .map(|label| label.value.as_str())
    }
}

impl From<proto::TimeSeries> for TimeSeries {
    fn from(series: proto::TimeSeries) -> Self {
        Self {
            labels: series.labels.into_iter().map(Label::from).collect(),
            samples: series
                .samples
                .into_iter()
                .map(|sample| Sample {
                    value: sample.value,
                    timestamp: millis_to_secs(sample.timestamp),
                })
                .collect(),
            exemplars: series
                .exemplars
                .into_iter()
                .map(|exemplar| Exemplar {
                    value: exemplar.value,
                    timestamp: millis_to_secs(exemplar.timestamp),
                    labels: exemplar.labels.into_iter().map(Label::from).collect(),
                })
                .collect(),
            histograms: series.histograms.into_iter().map(HistogramSummary::from).collect(),
        }
    }
}

fn millis_to_secs(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

// Float counts are truncated. Negative and NaN counts become zero.
fn float_count(count: f64) -> u64 {
    count as u64
}

// Integer bucket counts are delta encoded: each entry is the difference to the previous bucket's absolute count.
fn undelta(deltas: &[i64]) -> impl Iterator<Item = u64> + '_ {
    deltas.iter().scan(0i64, |current, delta| {
        *current = current.saturating_add(*delta);
        Some(u64::try_from(*current).unwrap_or(0))
    })
}
