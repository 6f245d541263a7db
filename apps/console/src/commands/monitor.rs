//! `metrics` and `health` commands

use clap::Args;
use serde_json::json;
use std::process::ExitCode;
use tees_admin_client::HealthReport;
use tees_metrics_text::MetricSet;

use super::{format_bytes, format_duration, Context};
use crate::error::Result;
use crate::monitor::{HealthView, MetricsOverview, MetricsView};

#[derive(Args, Debug, Default)]
pub struct MetricsArgs {
    /// Show only samples of this metric
    #[arg(long, conflicts_with = "prefix")]
    pub name: Option<String>,

    /// Show only metrics whose name starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// List every sample instead of the overview
    #[arg(long)]
    pub raw: bool,
}

pub async fn run_metrics(ctx: &Context, args: MetricsArgs) -> anyhow::Result<ExitCode> {
    let (set, overview) = match MetricsView::fetch(ctx.client.as_ref()).await? {
        MetricsView::Disabled => {
            if ctx.json {
                ctx.print_json(&json!({ "enabled": false }))?;
            } else {
                println!("Metrics are disabled on this server.");
            }
            return Ok(ExitCode::SUCCESS);
        }
        MetricsView::Enabled { set, overview } => (set, overview),
    };

    let selected = match (&args.name, &args.prefix) {
        (Some(name), _) => {
            let only = set.filter(|n| n == name.as_str());
            if only.is_empty() {
                eprintln!("No metric named {name}.");
                return Ok(ExitCode::FAILURE);
            }
            Some(only)
        }
        (None, Some(prefix)) => Some(set.filter_prefix(prefix)),
        (None, None) if args.raw => Some(set.clone()),
        (None, None) => None,
    };

    if ctx.json {
        match &selected {
            Some(selected) => ctx.print_json(selected)?,
            None => ctx.print_json(&json!({ "enabled": true, "overview": overview }))?,
        }
        return Ok(ExitCode::SUCCESS);
    }

    match selected {
        Some(selected) => print_samples(&selected),
        None => print_overview(&overview, &set),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn run_health(ctx: &Context) -> anyhow::Result<ExitCode> {
    let view = HealthView::fetch(ctx.client.as_ref()).await;

    if ctx.json {
        ctx.print_json(&json!({
            "health": report_json(&view.health),
            "readiness": report_json(&view.readiness),
        }))?;
    } else {
        print_report("Health", &view.health);
        print_report("Readiness", &view.readiness);
    }

    Ok(if view.all_healthy() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_overview(overview: &MetricsOverview, set: &MetricSet) {
    let number = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{v:.0}"));

    println!("Requests served:       {}", number(overview.http_requests));
    println!(
        "Resident memory:       {}",
        overview
            .resident_memory_bytes
            .map_or("n/a".to_string(), format_bytes)
    );
    println!(
        "Heap used:             {}",
        overview.heap_used_bytes.map_or("n/a".to_string(), format_bytes)
    );
    println!(
        "Event loop lag:        {}",
        overview
            .event_loop_lag_seconds
            .map_or("n/a".to_string(), |s| format!("{:.1} ms", s * 1000.0))
    );
    println!(
        "Rate-limit rejections: {}",
        number(overview.rate_limit_rejections)
    );
    println!(
        "Uptime:                {}",
        overview.uptime_seconds.map_or("n/a".to_string(), format_duration)
    );
    println!();
    println!(
        "{} metrics, {} samples. Use --raw, --name or --prefix for details.",
        set.len(),
        set.sample_count()
    );
}

fn print_samples(set: &MetricSet) {
    for (name, samples) in set.iter() {
        println!("{name}");
        for sample in samples {
            println!("  {:<80} {}", sample.line, sample.value);
        }
    }
}

fn report_json(report: &Result<HealthReport>) -> serde_json::Value {
    match report {
        Ok(report) => json!(report),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn print_report(label: &str, report: &Result<HealthReport>) {
    match report {
        Ok(report) => {
            println!("{label}: {}", report.status);
            for (key, value) in &report.details {
                println!("  {key}: {value}");
            }
        }
        Err(e) => println!("{label}: unavailable ({e})"),
    }
}
