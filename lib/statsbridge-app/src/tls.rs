//! TLS.

use statsbridge_error::{generic_error, GenericError};

/// Initializes the TLS subsystem.
///
/// Installs AWS-LC as the process-wide cryptography provider, which both the TLS listener and the outbound HTTP client
/// rely on.
///
/// ## Errors
///
/// If the TLS subsystem was already initialized, an error will be returned.
pub fn initialize_tls() -> Result<(), GenericError> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| generic_error!("Failed to install AWS-LC as default cryptography provider. This is likely due to a conflicting provider already being installed."))
}
