use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use rustls::{
    pki_types::{CertificateDer, PrivateKeyDer},
    server::WebPkiClientVerifier,
    RootCertStore, ServerConfig,
};
use statsbridge_error::{generic_error, ErrorContext as _, GenericError};
use tracing::warn;

use crate::config::TlsConfiguration;

/// How client certificates are requested and verified.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClientAuthenticationType {
    /// Client certificates are not requested.
    #[default]
    NoClientCert,

    /// Client certificates are requested but optional.
    RequestClientCert,

    /// Client certificates are required.
    RequireAnyClientCert,

    /// Client certificates are optional, and verified when present.
    VerifyClientCertIfGiven,

    /// Client certificates are required and verified.
    RequireAndVerifyClientCert,
}

impl ClientAuthenticationType {
    /// Parses a client authentication type by name.
    ///
    /// Unknown names fall back to [`NoClientCert`][Self::NoClientCert].
    pub fn from_name(name: &str) -> Self {
        match name {
            "" | "NoClientCert" => Self::NoClientCert,
            "RequestClientCert" => Self::RequestClientCert,
            "RequireAnyClientCert" => Self::RequireAnyClientCert,
            "VerifyClientCertIfGiven" => Self::VerifyClientCertIfGiven,
            "RequireAndVerifyClientCert" => Self::RequireAndVerifyClientCert,
            other => {
                warn!(
                    client_authentication_type = other,
                    "Unknown client authentication type. Client certificates will not be requested."
                );
                Self::NoClientCert
            }
        }
    }

    /// Returns `true` if connections without a client certificate are rejected.
    ///
    /// Presented certificates are always verified against the configured CA: rustls has no mode that accepts a client
    /// certificate without verifying it.
    pub fn requires_client_cert(self) -> bool {
        matches!(self, Self::RequireAnyClientCert | Self::RequireAndVerifyClientCert)
    }
}

/// Builds the server-side TLS configuration for the intake listener.
///
/// The server certificate chain, private key, and client CA bundle must all be configured, even when client
/// certificates are not requested. TLS 1.2 and 1.3 are supported.
///
/// # Errors
///
/// If any of the files is missing or unreadable, holds no usable PEM data, or the certificate and key do not match, an
/// error is returned.
pub fn build_server_config(tls: &TlsConfiguration) -> Result<ServerConfig, GenericError> {
    let cert_chain = load_certificates(&tls.server_certificate_path)
        .error_context("Failed to read server certificate.")?;
    let key = load_private_key(&tls.server_key_path).error_context("Failed to read server key.")?;
    let ca_certs = load_certificates(&tls.certificate_authority_path)
        .error_context("Failed to read client CA root.")?;

    let mut roots = RootCertStore::empty();
    for cert in ca_certs {
        roots.add(cert).error_context("Invalid CA certificate.")?;
    }

    let auth_type = ClientAuthenticationType::from_name(&tls.client_authentication_type);
    let builder = ServerConfig::builder();
    let builder = match auth_type {
        ClientAuthenticationType::NoClientCert => builder.with_no_client_auth(),
        _ => {
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots));
            let verifier = if auth_type.requires_client_cert() {
                verifier.build()
            } else {
                verifier.allow_unauthenticated().build()
            };
            builder.with_client_cert_verifier(verifier.error_context("Failed to build client certificate verifier.")?)
        }
    };

    let mut config = builder
        .with_single_cert(cert_chain, key)
        .error_context("Failed to pair server certificate and key.")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn load_certificates(path: &str) -> Result<Vec<CertificateDer<'static>>, GenericError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(generic_error!("No certificates found in '{}'.", path));
    }
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, GenericError> {
    let mut reader = open(path)?;
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| generic_error!("No private key found in '{}'.", path))
}

fn open(path: &str) -> Result<BufReader<File>, GenericError> {
    if path.is_empty() {
        return Err(generic_error!("Path is not configured."));
    }
    let file = File::open(Path::new(path)).with_error_context(|| format!("Failed to open '{}'.", path))?;
    Ok(BufReader::new(file))
}
