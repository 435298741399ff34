//! Building blocks of the remote-write bridge.
//!
//! [`translate`] turns decoded time series into encoded metric lines and hands them to a sink. [`intake`] exposes that
//! over HTTP as a remote-write endpoint.
#![deny(warnings)]
#![deny(missing_docs)]

pub mod intake;
pub mod translate;
