use prost::Message as _;
use snafu::{ResultExt as _, Snafu};

use crate::{proto, TimeSeries};

/// Remote-write decode error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DecodeError {
    /// The body was not a valid snappy block.
    #[snafu(display("failed to decompress request body: {}", source))]
    Decompress {
        /// Error source.
        source: snap::Error,
    },

    /// The decompressed body was not a valid `WriteRequest` message.
    #[snafu(display("failed to decode write request: {}", source))]
    Protobuf {
        /// Error source.
        source: prost::DecodeError,
    },
}

/// Remote-write encode error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum EncodeError {
    /// The encoded message could not be compressed.
    #[snafu(display("failed to compress write request: {}", source))]
    Compress {
        /// Error source.
        source: snap::Error,
    },
}

/// Decodes a remote-write request body into its time series.
///
/// The body must be a snappy block (not the framed stream format) wrapping a protobuf `WriteRequest`. Timestamps are
/// converted from milliseconds to whole seconds. Metadata is ignored.
///
/// # Errors
///
/// If the body cannot be decompressed, or the decompressed bytes are not a valid `WriteRequest`, an error is returned.
pub fn decode_write_request(body: &[u8]) -> Result<Vec<TimeSeries>, DecodeError> {
    let decompressed = snap::raw::Decoder::new().decompress_vec(body).context(Decompress)?;
    let request = proto::WriteRequest::decode(decompressed.as_slice()).context(Protobuf)?;

    Ok(request.timeseries.into_iter().map(TimeSeries::from).collect())
}

/// Encodes a remote-write request body.
///
/// # Errors
///
/// If the encoded message cannot be compressed, an error is returned.
pub fn encode_write_request(request: &proto::WriteRequest) -> Result<Vec<u8>, EncodeError> {
    snap::raw::Encoder::new()
        .compress_vec(&request.encode_to_vec())
        .context(Compress)
}
