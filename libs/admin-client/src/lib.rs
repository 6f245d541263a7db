//! Tees Admin API Client
//!
//! Async client for the runtime admin control plane of the Tees storefront
//! server: runtime configuration (rate limiting, security headers, tracing),
//! Prometheus metrics, health and readiness probes, the audit trail and
//! session revocation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tees_admin_client::{AdminClient, RuntimeApi, Session, TokenStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(Session::new(TokenStore::default_location()));
//! let client = AdminClient::new("http://localhost:5000", session)?;
//! let config = client.get_config().await?;
//! println!("rate limit: {} per {} ms", config.rate_limit.global_max, config.rate_limit.window_ms);
//! # Ok(())
//! # }
//! ```
pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod session;

pub use api::{AuditApi, MetricsResponse, MonitorApi, RuntimeApi, SessionsApi};
pub use client::{AdminClient, ClientOptions};
pub use error::{Error, ErrorKind, Result};
pub use models::{
    AuditActor, AuditLogEntry, AuditPage, AuditQuery, ClearAuditRequest, ClearAuditResult,
    HealthReport, PathOverride, RateLimitAlgorithm, RateLimitConfig, RecentRequestId,
    RoleOverride, RuntimeConfig, SecurityConfig, ServiceStatus, SessionUser, TracingConfig,
};
pub use session::{Session, SessionState, TokenStore};
