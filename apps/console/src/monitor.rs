//! Read-only views over metrics, health, tracing and the config snapshot

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tees_admin_client::{
    HealthReport, MetricsResponse, MonitorApi, RecentRequestId, RuntimeApi, RuntimeConfig,
};
use tees_metrics_text::MetricSet;

use crate::error::Result;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const RESIDENT_MEMORY_BYTES: &str = "process_resident_memory_bytes";
pub const HEAP_USED_BYTES: &str = "nodejs_heap_size_used_bytes";
pub const EVENT_LOOP_LAG_SECONDS: &str = "nodejs_eventloop_lag_seconds";
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "rate_limit_rejections_total";
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";

/// Headline numbers from well-known metric names. Absent names stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsOverview {
    pub http_requests: Option<f64>,
    pub resident_memory_bytes: Option<f64>,
    pub heap_used_bytes: Option<f64>,
    pub event_loop_lag_seconds: Option<f64>,
    pub rate_limit_rejections: Option<f64>,
    pub uptime_seconds: Option<f64>,
}

impl MetricsOverview {
    pub fn from_set(set: &MetricSet, now: DateTime<Utc>) -> Self {
        let uptime_seconds = set.first(PROCESS_START_TIME_SECONDS).and_then(|start| {
            let now = now.timestamp_millis() as f64 / 1000.0;
            (start > 0.0 && now >= start).then_some(now - start)
        });

        Self {
            http_requests: set.sum(HTTP_REQUESTS_TOTAL),
            resident_memory_bytes: set.first(RESIDENT_MEMORY_BYTES),
            heap_used_bytes: set.first(HEAP_USED_BYTES),
            event_loop_lag_seconds: set.first(EVENT_LOOP_LAG_SECONDS),
            rate_limit_rejections: set.sum(RATE_LIMIT_REJECTIONS_TOTAL),
            uptime_seconds,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricsView {
    /// The server has metrics switched off.
    Disabled,
    Enabled {
        set: MetricSet,
        overview: MetricsOverview,
    },
}

impl MetricsView {
    pub async fn fetch(api: &dyn MonitorApi) -> Result<Self> {
        Ok(Self::from_response(api.metrics().await?, Utc::now()))
    }

    pub fn from_response(response: MetricsResponse, now: DateTime<Utc>) -> Self {
        match response {
            MetricsResponse::Disabled => Self::Disabled,
            MetricsResponse::Enabled(text) => {
                let set = tees_metrics_text::parse(&text);
                let overview = MetricsOverview::from_set(&set, now);
                Self::Enabled { set, overview }
            }
        }
    }
}

/// Liveness and readiness, fetched together but failing independently.
#[derive(Debug)]
pub struct HealthView {
    pub health: Result<HealthReport>,
    pub readiness: Result<HealthReport>,
}

impl HealthView {
    pub async fn fetch(api: &dyn MonitorApi) -> Self {
        let (health, readiness) = tokio::join!(api.health(), api.readiness());
        Self {
            health: health.map_err(Into::into),
            readiness: readiness.map_err(Into::into),
        }
    }

    pub fn all_healthy(&self) -> bool {
        let ok = |r: &Result<HealthReport>| r.as_ref().is_ok_and(|r| r.status.is_healthy());
        ok(&self.health) && ok(&self.readiness)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracingView {
    pub request_id_header: String,
    /// Newest first.
    pub recent: Vec<RecentRequestId>,
}

impl TracingView {
    pub async fn fetch(api: &dyn RuntimeApi) -> Result<Self> {
        Ok(Self::from_snapshot(&api.get_config().await?))
    }

    pub fn from_snapshot(snapshot: &RuntimeConfig) -> Self {
        let mut recent = snapshot.tracing.recent_request_ids.clone();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            request_id_header: snapshot.tracing.request_id_header.clone(),
            recent,
        }
    }
}

/// Whole snapshot for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigOverview {
    pub config: RuntimeConfig,
    pub versions: Map<String, JsonValue>,
    /// Overrides live in server memory and are lost on restart.
    pub ephemeral: bool,
}

impl ConfigOverview {
    pub async fn fetch(api: &dyn RuntimeApi) -> Result<Self> {
        let config = api.get_config().await?;
        Ok(Self {
            versions: config.versions.clone(),
            config,
            ephemeral: true,
        })
    }
}
