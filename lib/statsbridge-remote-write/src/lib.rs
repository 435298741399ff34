//! Prometheus remote-write decoding.
//!
//! Remote-write requests are snappy-compressed (block format) protobuf `WriteRequest` messages. This crate decodes
//! them into a small owned data model ([`TimeSeries`] and friends) that carries only what the translation pipeline
//! needs, with timestamps already converted to whole seconds.
#![deny(warnings)]
#![deny(missing_docs)]

mod decode;
pub use self::decode::{decode_write_request, encode_write_request, DecodeError, EncodeError};

pub mod proto;

mod series;
pub use self::series::{Exemplar, HistogramSummary, Label, Sample, TimeSeries, METRIC_NAME_LABEL};
