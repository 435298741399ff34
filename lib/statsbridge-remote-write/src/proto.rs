//! Protobuf message types for the Prometheus remote-write protocol.
//!
//! Field numbers and types follow `prompb/types.proto` and `prompb/remote.proto` from Prometheus. Only decoding is
//! needed in the server path; [`encode_write_request`](crate::encode_write_request) uses the same types to build
//! request bodies.

use prost::Message;

/// Top-level remote-write request.
#[derive(Clone, PartialEq, Message)]
pub struct WriteRequest {
    /// Time series carried by this request.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,

    /// Metric metadata carried by this request.
    #[prost(message, repeated, tag = "3")]
    pub metadata: Vec<MetricMetadata>,
}

/// A single time series.
#[derive(Clone, PartialEq, Message)]
pub struct TimeSeries {
    /// Labels identifying the series, including `__name__`.
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,

    /// Float samples.
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,

    /// Exemplars.
    #[prost(message, repeated, tag = "3")]
    pub exemplars: Vec<Exemplar>,

    /// Native histograms.
    #[prost(message, repeated, tag = "4")]
    pub histograms: Vec<Histogram>,
}

/// A label name/value pair.
#[derive(Clone, PartialEq, Message)]
pub struct Label {
    /// Label name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Label value.
    #[prost(string, tag = "2")]
    pub value: String,
}

/// A float sample.
#[derive(Clone, PartialEq, Message)]
pub struct Sample {
    /// Sample value.
    #[prost(double, tag = "1")]
    pub value: f64,

    /// Timestamp, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

/// An exemplar: a sample annotated with extra labels, typically a trace ID.
#[derive(Clone, PartialEq, Message)]
pub struct Exemplar {
    /// Exemplar labels.
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,

    /// Exemplar value.
    #[prost(double, tag = "2")]
    pub value: f64,

    /// Timestamp, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

/// A native (sparse, exponential bucket) histogram.
#[derive(Clone, PartialEq, Message)]
pub struct Histogram {
    /// Total observation count, either integer or float.
    #[prost(oneof = "histogram::Count", tags = "1, 2")]
    pub count: Option<histogram::Count>,

    /// Sum of all observations.
    #[prost(double, tag = "3")]
    pub sum: f64,

    /// Bucket resolution schema.
    #[prost(sint32, tag = "4")]
    pub schema: i32,

    /// Width of the zero bucket.
    #[prost(double, tag = "5")]
    pub zero_threshold: f64,

    /// Observations in the zero bucket, either integer or float.
    #[prost(oneof = "histogram::ZeroCount", tags = "6, 7")]
    pub zero_count: Option<histogram::ZeroCount>,

    /// Spans of populated negative buckets.
    #[prost(message, repeated, tag = "8")]
    pub negative_spans: Vec<BucketSpan>,

    /// Negative bucket counts for integer histograms, delta encoded.
    #[prost(sint64, repeated, tag = "9")]
    pub negative_deltas: Vec<i64>,

    /// Negative bucket counts for float histograms, absolute.
    #[prost(double, repeated, tag = "10")]
    pub negative_counts: Vec<f64>,

    /// Spans of populated positive buckets.
    #[prost(message, repeated, tag = "11")]
    pub positive_spans: Vec<BucketSpan>,

    /// Positive bucket counts for integer histograms, delta encoded.
    #[prost(sint64, repeated, tag = "12")]
    pub positive_deltas: Vec<i64>,

    /// Positive bucket counts for float histograms, absolute.
    #[prost(double, repeated, tag = "13")]
    pub positive_counts: Vec<f64>,

    /// Counter reset hint.
    #[prost(enumeration = "histogram::ResetHint", tag = "14")]
    pub reset_hint: i32,

    /// Timestamp, in milliseconds since the Unix epoch.
    #[prost(int64, tag = "15")]
    pub timestamp: i64,
}

/// Nested types for [`Histogram`].
pub mod histogram {
    /// Total observation count.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Count {
        /// Integer count.
        #[prost(uint64, tag = "1")]
        CountInt(u64),

        /// Float count.
        #[prost(double, tag = "2")]
        CountFloat(f64),
    }

    /// Zero bucket count.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ZeroCount {
        /// Integer count.
        #[prost(uint64, tag = "6")]
        ZeroCountInt(u64),

        /// Float count.
        #[prost(double, tag = "7")]
        ZeroCountFloat(f64),
    }

    /// Whether the histogram follows a counter reset.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ResetHint {
        /// Unknown.
        Unknown = 0,

        /// A reset happened.
        Yes = 1,

        /// No reset happened.
        No = 2,

        /// The histogram is a gauge histogram.
        Gauge = 3,
    }
}

/// A run of consecutive buckets.
#[derive(Clone, PartialEq, Message)]
pub struct BucketSpan {
    /// Gap to the previous span, or the starting index for the first span.
    #[prost(sint32, tag = "1")]
    pub offset: i32,

    /// Number of consecutive buckets.
    #[prost(uint32, tag = "2")]
    pub length: u32,
}

/// Metadata describing a metric family.
#[derive(Clone, PartialEq, Message)]
pub struct MetricMetadata {
    /// Metric type.
    #[prost(enumeration = "MetricType", tag = "1")]
    pub r#type: i32,

    /// Metric family name.
    #[prost(string, tag = "2")]
    pub metric_family_name: String,

    /// Help text.
    #[prost(string, tag = "4")]
    pub help: String,

    /// Unit.
    #[prost(string, tag = "5")]
    pub unit: String,
}

/// Metric family type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MetricType {
    /// Unknown.
    Unknown = 0,

    /// Counter.
    Counter = 1,

    /// Gauge.
    Gauge = 2,

    /// Summary.
    Summary = 3,

    /// Histogram.
    Histogram = 4,

    /// Gauge histogram.
    GaugeHistogram = 5,

    /// Info.
    Info = 6,

    /// State set.
    Stateset = 7,
}
