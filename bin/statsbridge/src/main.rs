//! Prometheus remote-write to statsd bridge.
//!
//! Accepts remote-write requests over HTTP(S), re-encodes every sample, exemplar, and histogram as a statsd-style line,
//! and forwards the lines of each request to Sentry as one `statsd` envelope item.
#![deny(warnings)]
#![deny(missing_docs)]

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use statsbridge_app::prelude::*;
use statsbridge_components::{
    intake::{intake_router, IntakeState},
    translate::SeriesDispatcher,
};
use statsbridge_error::{ErrorContext as _, GenericError};
use statsbridge_sink::{
    sentry::{Dsn, SentrySink},
    BlackholeSink, MetricSink,
};
use tokio::net::TcpListener;
use tracing::{error, info, level_filters::LevelFilter, warn};

mod config;
use self::config::Configuration;

mod server;
use self::server::{serve, shutdown_signal};

mod tls;
use self::tls::build_server_config;

#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Path to the configuration file (JSON or YAML).
    ///
    /// The `CONFIG_FILE_PATH` environment variable takes precedence over this flag.
    #[arg(long = "config-file")]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Configuration::load(cli.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => fatal_and_exit(format!("failed to load configuration: {}", e)),
    };

    let default_level = if config.debug { LevelFilter::DEBUG } else { LevelFilter::INFO };
    if let Err(e) = initialize_logging(Some(default_level)) {
        fatal_and_exit(format!("failed to initialize logging: {}", e));
    }

    if let Err(e) = initialize_tls() {
        fatal_and_exit(format!("failed to initialize TLS: {}", e));
    }

    match run(config).await {
        Ok(()) => info!("statsbridge stopped."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config: Configuration) -> Result<(), GenericError> {
    info!("statsbridge starting...");

    let sink: Arc<dyn MetricSink> = match config.sentry_dsn() {
        Some(dsn) => {
            let dsn = Dsn::parse(dsn).error_context("Invalid Sentry DSN.")?;
            info!(project_id = dsn.project_id(), "Forwarding metrics to Sentry.");
            Arc::new(SentrySink::new(dsn, config.forwarder.sink_configuration())?)
        }
        None => {
            warn!("No Sentry DSN configured. Metrics will be discarded.");
            Arc::new(BlackholeSink)
        }
    };

    let dispatcher = SeriesDispatcher::new(sink)
        .with_buffer_capacity(config.statsd.buffer_size)
        .with_prefix(config.statsd.prefix.as_str());
    let router = intake_router(IntakeState::new(dispatcher), config.max_request_body_size);

    let tls_config = if config.tls.is_enabled() {
        Some(build_server_config(&config.tls).error_context("Failed to configure TLS.")?)
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_error_context(|| format!("Failed to bind to {}.", config.listen_address))?;

    serve(listener, router, tls_config, shutdown_signal()).await
}
