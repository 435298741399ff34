//! Statsd-style line protocol encoding.
//!
//! Metric events are rendered as single lines of the form
//! `<prefix><name>:<value>|<kind>|<tags>|T<unix-seconds>[|@<rate>]` and accumulated by a [`MetricsClient`] into a
//! bounded buffer, which is written through to an underlying [`std::io::Write`] whenever it fills up or is flushed.
#![deny(warnings)]
#![deny(missing_docs)]

mod client;
pub use self::client::{ClientError, MetricsClient, MetricsClientBuilder, DEFAULT_BUFFER_CAPACITY};

mod event;
pub use self::event::{MetricEvent, MetricKind, MetricValue, SampleRate};

mod tags;
pub use self::tags::{format_tags, TagSet};
