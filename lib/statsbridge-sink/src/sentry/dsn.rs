use std::{fmt, str::FromStr};

use snafu::{ResultExt as _, Snafu};
use url::Url;

/// DSN parse error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum DsnError {
    /// The DSN is not a valid URL.
    #[snafu(display("invalid DSN: {}", source))]
    InvalidUrl {
        /// Error source.
        source: url::ParseError,
    },

    /// The DSN uses a scheme other than `http` or `https`.
    #[snafu(display("unsupported DSN scheme '{}'", scheme))]
    UnsupportedScheme {
        /// Scheme found in the DSN.
        scheme: String,
    },

    /// The DSN has no public key.
    #[snafu(display("DSN is missing the public key"))]
    MissingPublicKey,

    /// The DSN has no host.
    #[snafu(display("DSN is missing the host"))]
    MissingHost,

    /// The DSN has no project ID.
    #[snafu(display("DSN is missing the project ID"))]
    MissingProjectId,
}

/// A parsed Sentry DSN.
///
/// DSNs have the form `{scheme}://{public_key}[:{secret_key}]@{host}[:{port}]/[{path}/]{project_id}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dsn {
    raw: String,
    scheme: String,
    public_key: String,
    secret_key: Option<String>,
    host: String,
    port: Option<u16>,
    path: String,
    project_id: String,
}

impl Dsn {
    /// Parses a DSN.
    ///
    /// # Errors
    ///
    /// If the DSN is not a valid URL, uses a scheme other than `http`/`https`, or is missing the public key, host, or
    /// project ID, an error is returned.
    pub fn parse(raw: &str) -> Result<Self, DsnError> {
        let url = Url::parse(raw).context(InvalidUrl)?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(DsnError::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }

        let public_key = url.username();
        if public_key.is_empty() {
            return Err(DsnError::MissingPublicKey);
        }

        let host = url.host_str().filter(|host| !host.is_empty()).ok_or(DsnError::MissingHost)?;

        let trimmed_path = url.path().trim_matches('/');
        let (path, project_id) = match trimmed_path.rsplit_once('/') {
            Some((path, project_id)) => (path, project_id),
            None => ("", trimmed_path),
        };
        if project_id.is_empty() {
            return Err(DsnError::MissingProjectId);
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: scheme.to_string(),
            public_key: public_key.to_string(),
            secret_key: url.password().map(str::to_string),
            host: host.to_string(),
            port: url.port(),
            path: path.to_string(),
            project_id: project_id.to_string(),
        })
    }

    /// Returns the public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Returns the project ID.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Returns the URL that envelopes for this DSN are posted to.
    pub fn envelope_url(&self) -> String {
        let mut url = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = self.port {
            url.push_str(&format!(":{}", port));
        }
        url.push('/');
        if !self.path.is_empty() {
            url.push_str(&self.path);
            url.push('/');
        }
        url.push_str(&format!("api/{}/envelope/", self.project_id));
        url
    }

    /// Returns the value of the `X-Sentry-Auth` header for requests made with this DSN.
    pub fn auth_header(&self) -> String {
        let mut header = format!(
            "Sentry sentry_version=7, sentry_client=statsbridge/{}, sentry_key={}",
            env!("CARGO_PKG_VERSION"),
            self.public_key
        );
        if let Some(secret_key) = &self.secret_key {
            header.push_str(&format!(", sentry_secret={}", secret_key));
        }
        header
    }
}

impl FromStr for Dsn {
    type Err = DsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
