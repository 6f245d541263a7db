//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::commands::audit::{run_audit, AuditCommand};
use crate::commands::monitor::{run_health, run_metrics, MetricsArgs};
use crate::commands::runtime::{
    run_rate_limit, run_security, show_config, show_tracing, RateLimitCommand, SecurityCommand,
};
use crate::commands::session::{run_session, run_sessions, SessionCommand, SessionsCommand};
use crate::commands::Context;
use crate::config::Config;

/// Operator console for the Tees storefront runtime control plane
#[derive(Parser, Debug)]
#[command(name = "tees-console")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./tees-console.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overrides the configuration
    #[arg(long, global = true, env = "TEES_CONSOLE_BASE_URL")]
    pub base_url: Option<String>,

    /// Bearer token, overrides the stored session
    #[arg(long, global = true, env = "TEES_CONSOLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Local sign-in state
    #[command(subcommand)]
    Session(SessionCommand),

    /// Show the full runtime configuration snapshot
    Config,

    /// View or change rate limiting
    #[command(subcommand)]
    RateLimit(RateLimitCommand),

    /// View or change security headers
    #[command(subcommand)]
    Security(SecurityCommand),

    /// Show the request id header and recent request ids
    Tracing,

    /// Show server metrics
    Metrics(MetricsArgs),

    /// Check liveness and readiness; exits non-zero when either is unhealthy
    Health,

    /// Browse, follow or clear the audit trail
    #[command(subcommand)]
    Audit(AuditCommand),

    /// Revoke user sessions on the server
    #[command(subcommand)]
    Sessions(SessionsCommand),
}

impl Cli {
    /// Apply flag overrides on top of file and environment settings.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
    }
}

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let ctx = Context::new(config, cli.token, cli.json)?;

    let code = match cli.command {
        Commands::Session(command) => run_session(&ctx, command).await?,
        Commands::Config => {
            show_config(&ctx).await?;
            ExitCode::SUCCESS
        }
        Commands::RateLimit(command) => {
            run_rate_limit(&ctx, command).await?;
            ExitCode::SUCCESS
        }
        Commands::Security(command) => {
            run_security(&ctx, command).await?;
            ExitCode::SUCCESS
        }
        Commands::Tracing => {
            show_tracing(&ctx).await?;
            ExitCode::SUCCESS
        }
        Commands::Metrics(args) => run_metrics(&ctx, args).await?,
        Commands::Health => run_health(&ctx).await?,
        Commands::Audit(command) => run_audit(&ctx, command).await?,
        Commands::Sessions(command) => run_sessions(&ctx, command).await?,
    };
    Ok(code)
}
