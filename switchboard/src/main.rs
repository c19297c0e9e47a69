mod config;

use clap::{Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use redirect::errors::RedirectError;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve campaign links
    Redirect {
        #[arg(long)]
        config_file_path: PathBuf,
    },
    /// Load and validate a config file, then exit
    ValidateConfig {
        #[arg(long)]
        config_file_path: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] redirect::config::ValidationError),
    #[error(transparent)]
    Redirect(#[from] RedirectError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Redirect { config_file_path } => run_redirect(&config_file_path),
        CliCommand::ValidateConfig { config_file_path } => validate_config(&config_file_path),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1);
    }
}

fn validate_config(path: &std::path::Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    config.redirect.validate()?;
    println!(
        "{}: ok ({} campaigns)",
        path.display(),
        config.redirect.campaigns.len()
    );
    Ok(())
}

fn run_redirect(path: &std::path::Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    let logging = config.logging.unwrap_or_default();

    // Held until exit so pending events are flushed.
    let sentry_guard = logging.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });
    init_tracing(&logging);

    if let Err(e) = serve(config.metrics.as_ref(), config.redirect) {
        report_failure(&e);
        drop(sentry_guard);
        process::exit(1);
    }

    Ok(())
}

fn serve(
    metrics_config: Option<&MetricsConfig>,
    redirect_config: redirect::config::Config,
) -> Result<(), CliError> {
    if let Some(metrics_config) = metrics_config {
        init_statsd(metrics_config)?;
    }
    shared::metrics_defs::describe_all(rotation::metrics_defs::ALL_METRICS);
    shared::metrics_defs::describe_all(redirect::metrics_defs::ALL_METRICS);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(redirect::run(redirect_config))?;

    Ok(())
}

/// Must run after `init_tracing`.
fn report_failure(e: &CliError) {
    tracing::error!(error = %e, "redirect service stopped");
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let sentry_layer = logging
        .sentry_dsn
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_layer)
        .init();
}

fn init_statsd(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("switchboard"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "metrics exporter installed"
    );
    Ok(())
}
