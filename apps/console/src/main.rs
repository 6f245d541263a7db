//! Tees Console - command-line entry point

use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use tees_console::{cli, config::Config, logging};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = cli::Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(Some(path.as_path())),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard = logging::init_logging(&config.logging, cli.log_level.as_deref())
        .context("Failed to initialize logging")?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        "Starting tees-console"
    );

    cli::run(cli, config).await
}
