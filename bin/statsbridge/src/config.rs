use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use figment::{
    providers::{Data, Env, Json, Serialized, Yaml},
    Figment,
};
use serde::{
    de::{Error, Unexpected},
    Deserialize, Deserializer, Serialize,
};
use serde_with::{serde_as, DeserializeAs};
use snafu::{ResultExt as _, Snafu};
use statsbridge_components::intake::DEFAULT_MAX_REQUEST_BODY_SIZE;
use statsbridge_sink::sentry::{SentrySinkConfiguration, DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
use statsbridge_statsd::DEFAULT_BUFFER_CAPACITY;

const CONFIG_FILE_PATH_ENV_VAR: &str = "CONFIG_FILE_PATH";
const DEBUG_ENV_VAR: &str = "DEBUG";
const DEFAULT_LISTEN_ADDRESS: &str = "127.0.0.1:3000";

// Environment variables that override configuration values, and the configuration keys they map to.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LISTEN_ADDRESS", "listen_address"),
    ("TLS_CERTIFICATE_AUTHORITY_PATH", "tls.certificate_authority_path"),
    ("TLS_SERVER_CERTIFICATE_PATH", "tls.server_certificate_path"),
    ("TLS_SERVER_KEY_PATH", "tls.server_key_path"),
    ("TLS_CLIENT_AUTHENTICATION_TYPE", "tls.client_authentication_type"),
    ("SENTRY_DSN", "sentry_dsn"),
];

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// The configuration file does not exist.
    #[snafu(display("Configuration file '{}' does not exist.", path.display()))]
    FileNotFound {
        /// Path to the configuration file.
        path: PathBuf,
    },

    /// The configuration file exists but cannot be read with the current permissions.
    #[snafu(display("Missing permission to read configuration file '{}'.", path.display()))]
    PermissionDenied {
        /// Path to the configuration file.
        path: PathBuf,
    },

    /// The configuration file could not be read.
    #[snafu(display("Failed to read configuration file '{}': {}", path.display(), source))]
    ReadFile {
        /// Path to the configuration file.
        path: PathBuf,

        /// Error source.
        source: io::Error,
    },

    /// The configuration file extension is not one of the supported formats.
    #[snafu(display(
        "Configuration file '{}' has an unsupported format. Expected a .json, .yaml, or .yml file.",
        path.display()
    ))]
    UnsupportedFormat {
        /// Path to the configuration file.
        path: PathBuf,
    },

    /// The configuration values could not be parsed.
    #[snafu(display("Invalid configuration: {}", source))]
    Invalid {
        /// Error source.
        source: figment::Error,
    },
}

/// TLS settings for the intake listener.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfiguration {
    /// Path to the PEM bundle of CA certificates used to verify client certificates.
    pub certificate_authority_path: String,

    /// Path to the PEM server certificate chain.
    pub server_certificate_path: String,

    /// Path to the PEM server private key.
    pub server_key_path: String,

    /// Client authentication type, such as `RequireAndVerifyClientCert`.
    pub client_authentication_type: String,
}

impl TlsConfiguration {
    /// Returns `true` if the listener should serve TLS.
    pub fn is_enabled(&self) -> bool {
        !self.server_certificate_path.is_empty()
    }
}

/// Metric encoding settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsdConfiguration {
    /// Size of the per-request encoding buffer, in bytes.
    pub buffer_size: usize,

    /// Literal prefix for every metric name.
    pub prefix: String,
}

impl Default for StatsdConfiguration {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_CAPACITY,
            prefix: String::new(),
        }
    }
}

/// Sentry delivery settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfiguration {
    /// Timeout for a single envelope request, in seconds.
    pub request_timeout_secs: u64,

    /// Number of payloads that can wait for delivery.
    pub queue_capacity: usize,
}

impl ForwarderConfiguration {
    /// Returns the Sentry sink configuration.
    pub fn sink_configuration(&self) -> SentrySinkConfiguration {
        SentrySinkConfiguration {
            request_timeout: std::time::Duration::from_secs(self.request_timeout_secs),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl Default for ForwarderConfiguration {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Process configuration.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Configuration {
    /// Address the intake server listens on.
    pub listen_address: String,

    /// TLS settings.
    pub tls: TlsConfiguration,

    /// Sentry DSN. When unset or empty, metrics are discarded.
    pub sentry_dsn: Option<String>,

    /// Enables debug logging.
    #[serde_as(deserialize_as = "PermissiveBool")]
    pub debug: bool,

    /// Metric encoding settings.
    pub statsd: StatsdConfiguration,

    /// Sentry delivery settings.
    pub forwarder: ForwarderConfiguration,

    /// Maximum accepted request body size, in bytes.
    pub max_request_body_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            tls: TlsConfiguration::default(),
            sentry_dsn: None,
            debug: false,
            statsd: StatsdConfiguration::default(),
            forwarder: ForwarderConfiguration::default(),
            max_request_body_size: DEFAULT_MAX_REQUEST_BODY_SIZE,
        }
    }
}

impl Configuration {
    /// Loads the configuration.
    ///
    /// Values are layered, from lowest to highest priority: built-in defaults, the configuration file, and environment
    /// variables. The configuration file is taken from `CONFIG_FILE_PATH` if set, or `cli_path` otherwise, and is
    /// optional. `DEBUG` accepts `1`, `0`, `t`, `f`, `true`, and `false` in any case, and is ignored if it holds anything
    /// else.
    ///
    /// # Errors
    ///
    /// If the configuration file cannot be read, has an unsupported extension, or if any value is invalid, an error is
    /// returned.
    pub fn load(cli_path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let file_path = std::env::var_os(CONFIG_FILE_PATH_ENV_VAR)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .or_else(|| cli_path.map(Path::to_path_buf));

        let mut figment = Figment::from(Serialized::defaults(Configuration::default()));
        if let Some(path) = file_path {
            figment = merge_file(figment, &path)?;
        }

        figment = figment.merge(
            Env::raw()
                .only(&ENV_OVERRIDES.iter().map(|(var, _)| *var).collect::<Vec<_>>())
                .map(|var| env_override_key(var.as_str()).into()),
        );

        if let Some(debug) = std::env::var(DEBUG_ENV_VAR).ok().as_deref().and_then(parse_bool) {
            figment = figment.merge(Serialized::default("debug", debug));
        }

        figment.extract().context(Invalid)
    }

    /// Returns the Sentry DSN, if one is configured.
    pub fn sentry_dsn(&self) -> Option<&str> {
        self.sentry_dsn.as_deref().filter(|dsn| !dsn.is_empty())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment, ConfigurationError> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    let is_json = match extension {
        "json" => true,
        "yaml" | "yml" => false,
        _ => return UnsupportedFormat { path }.fail(),
    };

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return FileNotFound { path }.fail(),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return PermissionDenied { path }.fail(),
        Err(e) => return Err(e).context(ReadFile { path }),
    };

    Ok(if is_json {
        figment.merge(Data::<Json>::string(&contents))
    } else {
        figment.merge(Data::<Yaml>::string(&contents))
    })
}

fn env_override_key(var: &str) -> String {
    ENV_OVERRIDES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(var))
        .map(|(_, key)| key.to_string())
        .unwrap_or_else(|| var.to_lowercase())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

/// Permissively deserializes a boolean.
///
/// Accepts a native boolean, `1` or `0` as a number, or any string accepted for the `DEBUG` environment variable.
struct PermissiveBool;

impl<'de> DeserializeAs<'de, bool> for PermissiveBool {
    fn deserialize_as<D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;

        impl<'vde> serde::de::Visitor<'vde> for Visitor {
            type Value = bool;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, string, or integer")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: Error,
            {
                Ok(value)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: Error,
            {
                parse_bool(value).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Str(value), &"1, 0, t, f, true, or false (case insensitive)")
                })
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match value {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(Error::invalid_value(Unexpected::Signed(value), &"0 or 1")),
                }
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: Error,
            {
                match value {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(Error::invalid_value(Unexpected::Unsigned(value), &"0 or 1")),
                }
            }
        }

        deserializer.deserialize_any(Visitor)
    }
}
