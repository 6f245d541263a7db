//! `audit` commands

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{ArgGroup, Args, Subcommand};
use std::collections::HashSet;
use std::process::ExitCode;
use std::time::Duration;
use tees_admin_client::{AdminClient, AuditLogEntry};

use super::{confirm, Context};
use crate::audit::{format_timestamp, AuditFilter, AuditView, AuditViewer, ClearMode, TailMode};

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long)]
    pub category: Option<String>,

    /// Actor id, username or email
    #[arg(long)]
    pub actor: Option<String>,

    #[arg(long)]
    pub action: Option<String>,

    #[arg(long)]
    pub target_type: Option<String>,

    #[arg(long)]
    pub target_id: Option<String>,

    /// Free-text search
    #[arg(short = 'q', long = "search")]
    pub q: Option<String>,

    /// Entries per page
    #[arg(long)]
    pub limit: Option<u32>,
}

impl FilterArgs {
    fn apply_to(self, filter: &mut AuditFilter) {
        *filter = AuditFilter {
            category: self.category,
            actor: self.actor,
            action: self.action,
            target_type: self.target_type,
            target_id: self.target_id,
            q: self.q,
            limit: self.limit,
        };
    }
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// List known audit categories
    Categories,

    /// List audit entries, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Keep loading pages until the end of the trail
        #[arg(long)]
        all: bool,
    },

    /// Show one entry in full
    Show {
        id: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Page the entry is on
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Follow the trail, re-polling until interrupted
    Tail {
        #[command(flatten)]
        filter: FilterArgs,

        /// Poll interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Delete audit entries (irreversible)
    Clear(ClearArgs),
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("scope").required(true).args(["all", "before"])))]
pub struct ClearArgs {
    /// Delete every entry
    #[arg(long)]
    pub all: bool,

    /// Delete entries created before this time (RFC 3339 or YYYY-MM-DD)
    #[arg(long, num_args = 0..=1, value_parser = parse_cutoff)]
    pub before: Option<Option<DateTime<Utc>>>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

pub async fn run_audit(ctx: &Context, command: AuditCommand) -> anyhow::Result<ExitCode> {
    let viewer = AuditViewer::new(
        ctx.client.clone(),
        ctx.config.audit.page_size,
        ctx.config.tail_interval(),
    );

    match command {
        AuditCommand::Categories => {
            let categories = viewer.categories().await?;
            if ctx.json {
                ctx.print_json(&categories)?;
            } else {
                for category in categories {
                    println!("{category}");
                }
            }
        }
        AuditCommand::List { filter, page, all } => {
            viewer.edit_filter(|f| filter.apply_to(f)).await;
            viewer.go_to_page(page).await?;
            if all {
                while viewer.load_more().await? {}
            }
            let view = viewer.view();
            if ctx.json {
                ctx.print_json(&view.entries)?;
            } else {
                print_view(&view);
            }
        }
        AuditCommand::Show { id, filter, page } => {
            viewer.edit_filter(|f| filter.apply_to(f)).await;
            viewer.go_to_page(page).await?;
            let Some(entry) = viewer.detail(&id) else {
                eprintln!("No entry {id} on page {page}. Narrow the filters or pick another page.");
                return Ok(ExitCode::FAILURE);
            };
            if ctx.json {
                ctx.print_json(&entry)?;
            } else {
                print_entry(&entry);
            }
        }
        AuditCommand::Tail { filter, interval } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| ctx.config.tail_interval());
            if interval.is_zero() {
                anyhow::bail!("--interval must be at least 1 second");
            }
            let viewer = AuditViewer::new(ctx.client.clone(), ctx.config.audit.page_size, interval);
            viewer.edit_filter(|f| filter.apply_to(f)).await;
            tail(viewer, interval).await?;
        }
        AuditCommand::Clear(args) => return clear(ctx, &viewer, args).await,
    }
    Ok(ExitCode::SUCCESS)
}

async fn tail(mut viewer: AuditViewer<AdminClient>, interval: Duration) -> anyhow::Result<()> {
    tracing::debug!(filter = ?viewer.filter().await, "Starting audit tail");
    viewer.apply().await?;

    let mut seen = HashSet::new();
    print_new(&viewer.view(), &mut seen);

    let mut updates = viewer.subscribe();
    viewer.start_tail();
    eprintln!(
        "Following audit trail every {}s, Ctrl-C to stop.",
        interval.as_secs()
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                if let Some(error) = &view.poll_error {
                    eprintln!("poll failed: {error}");
                }
                print_new(&view, &mut seen);
            }
            _ = tokio::time::sleep(interval) => {
                if viewer.tail_mode() == TailMode::Static {
                    eprintln!("Tail stopped.");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    viewer.stop_tail();
    Ok(())
}

async fn clear(
    ctx: &Context,
    viewer: &AuditViewer<AdminClient>,
    args: ClearArgs,
) -> anyhow::Result<ExitCode> {
    let mode = if args.all {
        ClearMode::Everything
    } else {
        ClearMode::Before(args.before.flatten())
    };

    let Some(pending) = viewer.prepare_clear(mode) else {
        eprintln!("Nothing cleared: --before needs a timestamp.");
        return Ok(ExitCode::FAILURE);
    };

    if !args.yes && !confirm(format!("This will {pending}.")).await? {
        eprintln!("Aborted.");
        return Ok(ExitCode::SUCCESS);
    }

    let result = viewer.confirm_clear(pending).await?;
    if ctx.json {
        ctx.print_json(&result)?;
    } else {
        match result.deleted {
            Some(n) => println!("Deleted {n} audit entries."),
            None => println!("Audit entries deleted."),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Accepts RFC 3339 timestamps or plain dates (midnight UTC).
pub fn parse_cutoff(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("invalid timestamp '{value}' (use RFC 3339 or YYYY-MM-DD)"))
}

fn print_view(view: &AuditView) {
    if view.entries.is_empty() {
        println!("No audit entries.");
        return;
    }
    for entry in &view.entries {
        print_row(entry);
    }
    let total = view
        .total
        .map(|t| format!(" of {t}"))
        .unwrap_or_default();
    println!();
    println!(
        "Page {}, {} entries{total}{}",
        view.page,
        view.entries.len(),
        if view.has_more { ", more available" } else { "" }
    );
}

fn print_new(view: &AuditView, seen: &mut HashSet<String>) {
    // Entries arrive newest first; print oldest first so new lines append.
    for entry in view.entries.iter().rev() {
        if seen.insert(entry.id.clone()) {
            print_row(entry);
        }
    }
}

fn print_row(entry: &AuditLogEntry) {
    println!(
        "{}  {:<24} {:<16} {:<12} {}",
        format_timestamp(&entry.created_at),
        entry.id,
        entry.actor_label(),
        entry.category.as_deref().unwrap_or("-"),
        entry.action
    );
}

fn print_entry(entry: &AuditLogEntry) {
    println!("Id:        {}", entry.id);
    println!("Time:      {}", format_timestamp(&entry.created_at));
    println!("Actor:     {}", entry.actor_label());
    if let Some(actor) = &entry.actor {
        if let Some(email) = &actor.email {
            println!("Email:     {email}");
        }
    }
    println!("Action:    {}", entry.action);
    println!("Category:  {}", entry.category.as_deref().unwrap_or("-"));
    if let Some(target) = &entry.target_type {
        println!(
            "Target:    {target} {}",
            entry.target_id.as_deref().unwrap_or("")
        );
    }
    if let Some(ip) = &entry.ip {
        println!("IP:        {ip}");
    }
    if let Some(agent) = &entry.user_agent {
        println!("Agent:     {agent}");
    }
    if !entry.meta.is_null() {
        println!("Meta:");
        let meta = serde_json::to_string_pretty(&entry.meta).unwrap_or_default();
        for line in meta.lines() {
            println!("  {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_cutoff() {
        assert_eq!(
            parse_cutoff("2024-04-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_cutoff("2024-04-01T10:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 1, 8, 30, 0).unwrap()
        );
        assert!(parse_cutoff("last tuesday").is_err());
    }

    #[test]
    fn test_filter_args_replace_inputs() {
        let mut filter = AuditFilter {
            category: Some("auth".into()),
            ..Default::default()
        };
        FilterArgs {
            q: Some("coep".into()),
            limit: Some(5),
            ..Default::default()
        }
        .apply_to(&mut filter);

        assert_eq!(filter.category, None);
        assert_eq!(filter.q.as_deref(), Some("coep"));
        assert_eq!(filter.limit, Some(5));
    }
}
