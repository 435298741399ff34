//! Error plumbing for the bridge's bootstrap path.
//!
//! Request-path failures stay typed: decoding a remote-write body yields a `DecodeError` that becomes the 500 response
//! text, and per-line encoder failures are `ClientError`s that are logged and collected. Everything that can only stop
//! the process (loading configuration, reading TLS material, starting the Sentry forwarder, binding the listener) is
//! reported as a [`GenericError`], with [`ErrorContext`] attaching a one-line description of the step that failed.
//! `main` prints the whole chain and exits.
#![deny(warnings)]
#![deny(missing_docs)]

use std::fmt::Display;

/// An opaque error with an attached chain of causes.
pub type GenericError = anyhow::Error;

/// Creates a [`GenericError`].
///
/// Accepts a string literal, a format string with arguments (as `std::format!` does), or any value that implements
/// `Debug` and `Display`. When given a value implementing `std::error::Error`, its source chain is preserved.
#[macro_export]
macro_rules! generic_error {
    ($msg:literal $(,)?) => { $crate::_anyhow!($msg) };
    ($err:expr $(,)?) => { $crate::_anyhow!($err) };
    ($fmt:expr, $($arg:tt)*) => { $crate::_anyhow!($fmt, $($arg)*) };
}

#[doc(hidden)]
pub use anyhow::anyhow as _anyhow;

mod private {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}

/// Attaches human-readable context to a failed result.
///
/// This mirrors `anyhow::Context`, but under different method names so it can be imported next to `snafu::ResultExt`
/// without the two sets of extension methods colliding.
pub trait ErrorContext<T, E>: private::Sealed {
    /// Wraps the error with the given context.
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error with context that is only built if an error actually occurred.
    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T, E> for Result<T, E>
where
    Result<T, E>: anyhow::Context<T, E>,
{
    fn error_context<C>(self, context: C) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
    {
        <Self as anyhow::Context<T, E>>::context(self, context)
    }

    fn with_error_context<C, F>(self, f: F) -> Result<T, GenericError>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        <Self as anyhow::Context<T, E>>::with_context(self, f)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn error_context_wraps_source() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let err = result.error_context("Failed to open configuration file.").unwrap_err();

        assert_eq!(err.to_string(), "Failed to open configuration file.");
        assert_eq!(err.root_cause().to_string(), "no such file");
    }

    #[test]
    fn context_layers_keep_whole_chain() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "access denied"));
        let err = result
            .error_context("Failed to read server key.")
            .with_error_context(|| format!("Failed to build TLS configuration for {}.", "127.0.0.1:3000"))
            .unwrap_err();

        let chain = err.chain().map(|e| e.to_string()).collect::<Vec<_>>();
        assert_eq!(
            chain,
            vec![
                "Failed to build TLS configuration for 127.0.0.1:3000.",
                "Failed to read server key.",
                "access denied",
            ]
        );
    }

    #[test]
    fn generic_error_macro_formats() {
        let err = generic_error!("buffer capacity must be at least {} bytes", 1);
        assert_eq!(err.to_string(), "buffer capacity must be at least 1 bytes");
    }
}
