//! `config`, `rate-limit`, `security` and `tracing` commands

use clap::{Args, Subcommand};
use serde::Serialize;
use tees_admin_client::{
    PathOverride, RateLimitAlgorithm, RateLimitConfig, RoleOverride, SecurityConfig,
};

use super::Context;
use crate::audit::format_timestamp;
use crate::draft::{ConfigDraft, ConfigSection, FieldChange, SaveOutcome};
use crate::error::Result;
use crate::monitor::{ConfigOverview, TracingView};

#[derive(Args, Debug, Clone, Copy)]
pub struct SaveArgs {
    /// Show the change without sending it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum RateLimitCommand {
    /// Show the active rate-limit settings
    Show,

    /// Change the algorithm, global limit or window
    Set {
        #[arg(long)]
        algorithm: Option<RateLimitAlgorithm>,

        /// Requests allowed per window
        #[arg(long)]
        global_max: Option<u64>,

        /// Window length in milliseconds
        #[arg(long)]
        window_ms: Option<u64>,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Add or update a path-prefix override
    SetOverride {
        #[arg(long)]
        path: String,

        #[arg(long)]
        max: u64,

        #[arg(long, default_value = "fixed")]
        algorithm: RateLimitAlgorithm,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove a path-prefix override
    RemoveOverride {
        #[arg(long)]
        path: String,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Add or update a role override
    SetRoleOverride {
        #[arg(long)]
        role: String,

        #[arg(long)]
        path: String,

        #[arg(long)]
        max: u64,

        #[arg(long, default_value = "fixed")]
        algorithm: RateLimitAlgorithm,

        #[command(flatten)]
        save: SaveArgs,
    },

    /// Remove a role override
    RemoveRoleOverride {
        #[arg(long)]
        role: String,

        #[arg(long)]
        path: String,

        #[command(flatten)]
        save: SaveArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum SecurityCommand {
    /// Show the security header toggles
    Show,

    /// Change security header toggles
    Set {
        /// Serve CSP in report-only mode (true/false)
        #[arg(long)]
        csp_report_only: Option<bool>,

        /// Send Cross-Origin-Embedder-Policy (true/false)
        #[arg(long)]
        coep: Option<bool>,

        #[command(flatten)]
        save: SaveArgs,
    },
}

pub async fn show_config(ctx: &Context) -> anyhow::Result<()> {
    let overview = ConfigOverview::fetch(ctx.client.as_ref()).await?;
    if ctx.json {
        return ctx.print_json(&overview);
    }

    println!("Runtime configuration ({})", ctx.config.api.base_url);
    println!("Overrides are in-memory only and reset when the server restarts.");
    if !overview.versions.is_empty() {
        println!();
        println!("Versions:");
        for (name, version) in &overview.versions {
            println!("  {name:<12} {}", display_json(version));
        }
    }
    println!();
    print_rate_limit(&overview.config.rate_limit);
    println!();
    print_security(&overview.config.security);
    println!();
    println!(
        "Request id header: {}",
        overview.config.tracing.request_id_header
    );
    for (key, value) in &overview.config.extra {
        println!("{key}: {value}");
    }
    Ok(())
}

pub async fn show_tracing(ctx: &Context) -> anyhow::Result<()> {
    let view = TracingView::fetch(ctx.client.as_ref()).await?;
    if ctx.json {
        return ctx.print_json(&view);
    }

    println!("Request id header: {}", view.request_id_header);
    if view.recent.is_empty() {
        println!("No recent request ids.");
        return Ok(());
    }
    println!("Recent request ids (newest first):");
    for entry in &view.recent {
        println!("  {}  {}", format_timestamp(&entry.timestamp), entry.id);
    }
    Ok(())
}

pub async fn run_rate_limit(ctx: &Context, command: RateLimitCommand) -> anyhow::Result<()> {
    let mut draft = ConfigDraft::<RateLimitConfig>::new();
    draft.load(ctx.client.as_ref()).await?;

    let save = match command {
        RateLimitCommand::Show => {
            let Some(config) = draft.server() else {
                return Ok(());
            };
            if ctx.json {
                return ctx.print_json(config);
            }
            print_rate_limit(config);
            for warning in config.duplicate_warnings() {
                eprintln!("warning: {warning}");
            }
            return Ok(());
        }
        RateLimitCommand::Set {
            algorithm,
            global_max,
            window_ms,
            save,
        } => {
            if let Some(algorithm) = algorithm {
                draft.set_algorithm(algorithm)?;
            }
            if let Some(max) = global_max {
                draft.set_global_max(max)?;
            }
            if let Some(window_ms) = window_ms {
                draft.set_window_ms(window_ms)?;
            }
            save
        }
        RateLimitCommand::SetOverride {
            path,
            max,
            algorithm,
            save,
        } => {
            let entry = PathOverride {
                path_prefix: path,
                max,
                algorithm,
            };
            match draft.find_path_override(&entry.path_prefix) {
                Some(index) => draft.update_path_override(index, entry)?,
                None => draft.add_path_override(entry)?,
            }
            save
        }
        RateLimitCommand::RemoveOverride { path, save } => {
            remove_path_override(&mut draft, &path)?;
            save
        }
        RateLimitCommand::SetRoleOverride {
            role,
            path,
            max,
            algorithm,
            save,
        } => {
            let entry = RoleOverride {
                role,
                path_prefix: path,
                max,
                algorithm,
            };
            match draft.find_role_override(&entry.role, &entry.path_prefix) {
                Some(index) => draft.update_role_override(index, entry)?,
                None => draft.add_role_override(entry)?,
            }
            save
        }
        RateLimitCommand::RemoveRoleOverride { role, path, save } => {
            let index = draft.find_role_override(&role, &path).ok_or_else(|| {
                crate::Error::InvalidInput(format!("no role override for {role}@{path}"))
            })?;
            draft.remove_role_override(index)?;
            save
        }
    };

    finish(ctx, &mut draft, save).await
}

pub async fn run_security(ctx: &Context, command: SecurityCommand) -> anyhow::Result<()> {
    let mut draft = ConfigDraft::<SecurityConfig>::new();
    draft.load(ctx.client.as_ref()).await?;

    match command {
        SecurityCommand::Show => {
            if let Some(config) = draft.server() {
                if ctx.json {
                    return ctx.print_json(config);
                }
                print_security(config);
            }
            Ok(())
        }
        SecurityCommand::Set {
            csp_report_only,
            coep,
            save,
        } => {
            if let Some(enabled) = csp_report_only {
                draft.set_csp_report_only(enabled)?;
            }
            if let Some(enabled) = coep {
                draft.set_enable_coep(enabled)?;
            }
            finish(ctx, &mut draft, save).await
        }
    }
}

fn remove_path_override(draft: &mut ConfigDraft<RateLimitConfig>, path: &str) -> Result<()> {
    let index = draft
        .find_path_override(path)
        .ok_or_else(|| crate::Error::InvalidInput(format!("no path override for {path}")))?;
    draft.remove_path_override(index)?;
    Ok(())
}

/// Show the pending change, then save it unless this is a dry run.
/// Result of a `set` command, printed as the single document in `--json` mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveReport<'a, S> {
    section: &'static str,
    changes: Vec<String>,
    dry_run: bool,
    saved: bool,
    config: Option<&'a S>,
}

impl<'a, S: ConfigSection> SaveReport<'a, S> {
    fn new(draft: &'a ConfigDraft<S>, changes: &[FieldChange], dry_run: bool, saved: bool) -> Self {
        Self {
            section: S::NAME,
            changes: changes.iter().map(ToString::to_string).collect(),
            dry_run,
            saved,
            config: if saved { draft.server() } else { draft.draft() },
        }
    }
}

async fn finish<S: ConfigSection>(
    ctx: &Context,
    draft: &mut ConfigDraft<S>,
    save: SaveArgs,
) -> anyhow::Result<()> {
    let changes = draft.diff();
    for warning in draft.warnings() {
        eprintln!("warning: {warning}");
    }

    let saved = if changes.is_empty() {
        false
    } else if save.dry_run {
        draft.validate()?;
        false
    } else {
        draft.save(ctx.client.as_ref()).await? == SaveOutcome::Saved
    };

    if ctx.json {
        return ctx.print_json(&SaveReport::new(draft, &changes, save.dry_run, saved));
    }

    if changes.is_empty() {
        println!("No changes.");
        return Ok(());
    }
    println!("Changes to {}:", S::NAME);
    for change in &changes {
        println!("  {change}");
    }
    if saved {
        println!("Saved. The override lasts until the server restarts.");
    } else if save.dry_run {
        println!("Dry run, nothing sent.");
    }
    Ok(())
}

fn print_rate_limit(config: &RateLimitConfig) {
    println!("Rate limiting");
    println!("  Algorithm:  {}", config.algorithm);
    println!(
        "  Global max: {} requests per {} ms",
        config.global_max, config.window_ms
    );

    if config.overrides.is_empty() {
        println!("  Path overrides: none");
    } else {
        println!("  Path overrides:");
        for o in &config.overrides {
            println!("    {:<28} {:>8}  {}", o.path_prefix, o.max, o.algorithm);
        }
    }

    if config.role_overrides.is_empty() {
        println!("  Role overrides: none");
    } else {
        println!("  Role overrides:");
        for o in &config.role_overrides {
            println!(
                "    {:<12} {:<28} {:>8}  {}",
                o.role, o.path_prefix, o.max, o.algorithm
            );
        }
    }
}

fn print_security(config: &SecurityConfig) {
    println!("Security headers");
    println!("  CSP report-only: {}", on_off(config.csp_report_only));
    println!("  COEP:            {}", on_off(config.enable_coep));
    for (key, value) in &config.extra {
        println!("  {key}: {value}");
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn display_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRuntime;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_report_after_save() {
        let api = FakeRuntime::new();
        let mut draft = ConfigDraft::<RateLimitConfig>::new();
        draft.load(&api).await.unwrap();
        draft.set_global_max(300).unwrap();
        let changes = draft.diff();
        draft.save(&api).await.unwrap();

        let report = serde_json::to_value(SaveReport::new(&draft, &changes, false, true)).unwrap();
        assert_eq!(report["section"], "rate limit");
        assert_eq!(report["changes"], json!(["globalMax: 120 -> 300"]));
        assert_eq!(report["saved"], true);
        assert_eq!(report["dryRun"], false);
        assert_eq!(report["config"]["globalMax"], 300);
    }

    #[tokio::test]
    async fn test_save_report_dry_run_shows_draft() {
        let api = FakeRuntime::new();
        let mut draft = ConfigDraft::<SecurityConfig>::new();
        draft.load(&api).await.unwrap();
        draft.set_enable_coep(true).unwrap();
        let changes = draft.diff();

        let report = serde_json::to_value(SaveReport::new(&draft, &changes, true, false)).unwrap();
        assert_eq!(report["saved"], false);
        assert_eq!(report["dryRun"], true);
        assert_eq!(report["config"]["enableCOEP"], true);
        assert_eq!(api.put_count(), 0);
    }
}
