//! High-level application primitives.
//!
//! This crate provides the steps needed to bootstrap the process before serving anything: initializing logging and
//! selecting the cryptography provider used for TLS.
#![deny(warnings)]
#![deny(missing_docs)]

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "tls")]
pub mod tls;

/// Common imports.
pub mod prelude {
    #[cfg(feature = "logging")]
    pub use super::logging::{fatal_and_exit, initialize_logging};
    #[cfg(feature = "tls")]
    pub use super::tls::initialize_tls;
}
