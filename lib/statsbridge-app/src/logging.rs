//! Logging.

use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{
    layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _, EnvFilter, Layer,
};

const LOG_LEVEL_ENV_VAR: &str = "STATSBRIDGE_LOG_LEVEL";
const LOG_FORMAT_JSON_ENV_VAR: &str = "STATSBRIDGE_LOG_FORMAT_JSON";

/// Logs a message to standard error and exits the process with a non-zero exit code.
pub fn fatal_and_exit(message: String) -> ! {
    eprintln!("FATAL: {}", message);
    std::process::exit(1);
}

/// Initializes the logging subsystem for `tracing`.
///
/// This function reads the `STATSBRIDGE_LOG_LEVEL` environment variable to determine the log filtering directives to
/// use. If the environment variable is not set, `default_level` is used, falling back to `INFO`. Additionally, it reads
/// the `STATSBRIDGE_LOG_FORMAT_JSON` environment variable to determine which output format to use. If it is set to
/// `true` or `1`, the logs will be formatted as JSON. If it is set to any other value, or not set at all, the logs will
/// default to a compact, human-readable format.
///
/// # Errors
///
/// If the logging subsystem was already initialized, an error will be returned.
pub fn initialize_logging(default_level: Option<LevelFilter>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let is_json = json_format_enabled(std::env::var(LOG_FORMAT_JSON_ENV_VAR).ok().as_deref());

    // Load our level filtering directives from the environment, or fallback to INFO if the environment variable is not
    // specified.
    let level_filter = EnvFilter::builder()
        .with_default_directive(default_level.unwrap_or(LevelFilter::INFO).into())
        .with_env_var(LOG_LEVEL_ENV_VAR)
        .from_env_lossy();

    if is_json {
        tracing_subscriber::registry()
            .with(initialize_tracing_json().with_filter(level_filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(initialize_tracing_compact().with_filter(level_filter))
            .try_init()?;
    }

    Ok(())
}

fn json_format_enabled(value: Option<&str>) -> bool {
    value
        .map(|s| s.trim().to_lowercase())
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false)
}

fn initialize_tracing_json<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new()
        .json()
        .flatten_event(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

fn initialize_tracing_compact<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::Layer::new().compact().with_target(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_format_flag() {
        assert!(json_format_enabled(Some("true")));
        assert!(json_format_enabled(Some(" TRUE ")));
        assert!(json_format_enabled(Some("1")));
        assert!(!json_format_enabled(Some("json")));
        assert!(!json_format_enabled(Some("0")));
        assert!(!json_format_enabled(None));
    }

    #[test]
    fn second_initialization_fails() {
        let _ = initialize_logging(Some(LevelFilter::DEBUG));
        assert!(initialize_logging(None).is_err());
    }
}
