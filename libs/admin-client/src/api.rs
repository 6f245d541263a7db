//! Async seams over the admin API
//!
//! [`crate::AdminClient`] implements every trait here against HTTP. Console
//! components depend on the traits so they can be driven by in-memory
//! implementations in tests.

use crate::models::{
    AuditPage, AuditQuery, ClearAuditRequest, ClearAuditResult, HealthReport, RateLimitConfig,
    RuntimeConfig, SecurityConfig,
};
use crate::Result;
use async_trait::async_trait;

/// Runtime configuration endpoints.
#[async_trait]
pub trait RuntimeApi: Send + Sync {
    /// Fetch the full snapshot.
    async fn get_config(&self) -> Result<RuntimeConfig>;

    /// Replace the rate-limit sub-record.
    ///
    /// Returns the echoed snapshot when the server sends one back.
    async fn update_rate_limit(&self, config: &RateLimitConfig) -> Result<Option<RuntimeConfig>>;

    /// Replace the security sub-record.
    async fn update_security(&self, config: &SecurityConfig) -> Result<Option<RuntimeConfig>>;
}

/// Audit trail endpoints.
#[async_trait]
pub trait AuditApi: Send + Sync {
    async fn categories(&self) -> Result<Vec<String>>;

    async fn logs(&self, query: &AuditQuery) -> Result<AuditPage>;

    /// Irreversible.
    async fn clear(&self, request: &ClearAuditRequest) -> Result<ClearAuditResult>;
}

/// Metrics body, or the fact that the endpoint is switched off.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricsResponse {
    Enabled(String),
    Disabled,
}

/// Observability endpoints.
#[async_trait]
pub trait MonitorApi: Send + Sync {
    async fn metrics(&self) -> Result<MetricsResponse>;

    async fn health(&self) -> Result<HealthReport>;

    async fn readiness(&self) -> Result<HealthReport>;
}

/// Session revocation endpoints.
#[async_trait]
pub trait SessionsApi: Send + Sync {
    /// Revoke a single session by token id.
    async fn revoke_session(&self, jti: &str) -> Result<()>;

    /// Revoke every session of a user.
    async fn revoke_user_sessions(&self, user_id: &str) -> Result<()>;
}
