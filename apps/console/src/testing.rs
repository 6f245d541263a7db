//! In-memory admin API used by unit tests.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tees_admin_client::{
    AuditApi, AuditLogEntry, AuditPage, AuditQuery, ClearAuditRequest, ClearAuditResult, Error,
    RateLimitConfig, Result, RuntimeApi, RuntimeConfig, SecurityConfig,
};

pub(crate) struct FakeRuntime {
    config: Mutex<RuntimeConfig>,
    puts: Mutex<Vec<JsonValue>>,
    reject: Mutex<Option<String>>,
    gets: AtomicUsize,
    echo: bool,
}

impl FakeRuntime {
    pub(crate) fn new() -> Self {
        let config = serde_json::from_value(json!({
            "rateLimit": {
                "algorithm": "fixed",
                "globalMax": 120,
                "windowMs": 60000,
                "overrides": [{"pathPrefix": "/api/designs", "max": 40, "algorithm": "sliding"}],
                "roleOverrides": [{"role": "admin", "pathPrefix": "/admin", "max": 1000, "algorithm": "fixed"}]
            },
            "security": {"cspReportOnly": false, "enableCOEP": false},
            "tracing": {
                "requestIdHeader": "x-request-id",
                "recentRequestIds": [
                    {"id": "older", "timestamp": 1714550000000i64},
                    {"id": "newer", "timestamp": 1714560000000i64}
                ]
            },
            "versions": {"app": "2.3.0", "node": "20.11.1"}
        }))
        .expect("fixture config");

        Self {
            config: Mutex::new(config),
            puts: Mutex::new(Vec::new()),
            reject: Mutex::new(None),
            gets: AtomicUsize::new(0),
            echo: true,
        }
    }

    pub(crate) fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    pub(crate) fn reject_next_put(&self, message: &str) {
        *self.reject.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn last_put(&self) -> Option<JsonValue> {
        self.puts.lock().unwrap().last().cloned()
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub(crate) fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    fn apply(&self, body: JsonValue, update: impl FnOnce(&mut RuntimeConfig)) -> Result<Option<RuntimeConfig>> {
        if let Some(message) = self.reject.lock().unwrap().take() {
            return Err(Error::Validation(message));
        }
        self.puts.lock().unwrap().push(body);
        let mut config = self.config.lock().unwrap();
        update(&mut config);
        Ok(self.echo.then(|| config.clone()))
    }
}

#[async_trait]
impl RuntimeApi for FakeRuntime {
    async fn get_config(&self) -> Result<RuntimeConfig> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.config.lock().unwrap().clone())
    }

    async fn update_rate_limit(&self, config: &RateLimitConfig) -> Result<Option<RuntimeConfig>> {
        let body = serde_json::to_value(config)?;
        self.apply(body, |c| c.rate_limit = config.clone())
    }

    async fn update_security(&self, config: &SecurityConfig) -> Result<Option<RuntimeConfig>> {
        let body = serde_json::to_value(config)?;
        self.apply(body, |c| c.security = config.clone())
    }
}

/// Serves `total` synthetic entries, newest first.
pub(crate) struct FakeAudit {
    total: usize,
    echo_page: bool,
    queries: Mutex<Vec<AuditQuery>>,
    clears: Mutex<Vec<ClearAuditRequest>>,
}

impl FakeAudit {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            echo_page: true,
            queries: Mutex::new(Vec::new()),
            clears: Mutex::new(Vec::new()),
        }
    }

    /// Leaves `page` out of every response, like servers that only send `hasMore`.
    pub(crate) fn without_page_echo(total: usize) -> Self {
        Self {
            echo_page: false,
            ..Self::new(total)
        }
    }

    pub(crate) fn pages_requested(&self) -> Vec<u32> {
        self.queries.lock().unwrap().iter().map(|q| q.page).collect()
    }

    pub(crate) fn fetches(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub(crate) fn last_query(&self) -> Option<AuditQuery> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub(crate) fn clears(&self) -> Vec<ClearAuditRequest> {
        self.clears.lock().unwrap().clone()
    }

    fn entry(n: usize) -> AuditLogEntry {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        AuditLogEntry {
            id: format!("log-{n}"),
            created_at: base - ChronoDuration::minutes(n as i64),
            actor: None,
            action: "runtime.rate_limit.update".to_string(),
            category: Some("runtime".to_string()),
            target_type: None,
            target_id: None,
            ip: None,
            user_agent: None,
            meta: JsonValue::Null,
        }
    }
}

#[async_trait]
impl AuditApi for FakeAudit {
    async fn categories(&self) -> Result<Vec<String>> {
        Ok(vec!["auth".to_string(), "runtime".to_string()])
    }

    async fn logs(&self, query: &AuditQuery) -> Result<AuditPage> {
        self.queries.lock().unwrap().push(query.clone());

        let limit = query.limit.unwrap_or(50) as usize;
        let start = (query.page.max(1) as usize - 1) * limit;
        let end = (start + limit).min(self.total);
        let items = (start..end).map(Self::entry).collect();

        Ok(AuditPage {
            items,
            page: self.echo_page.then(|| query.page.max(1)),
            has_more: end < self.total,
            total: Some(self.total as u64),
        })
    }

    async fn clear(&self, request: &ClearAuditRequest) -> Result<ClearAuditResult> {
        self.clears.lock().unwrap().push(request.clone());
        Ok(ClearAuditResult {
            deleted: Some(self.total as u64),
        })
    }
}
