//! HTTP client for the admin API

use crate::api::{AuditApi, MetricsResponse, MonitorApi, RuntimeApi, SessionsApi};
use crate::error::{Error, Result};
use crate::models::{
    AuditPage, AuditQuery, ClearAuditRequest, ClearAuditResult, HealthReport, RateLimitConfig,
    RuntimeConfig, SecurityConfig, SessionUser,
};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::header::HeaderName;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const RUNTIME_CONFIG_PATH: &str = "admin/runtime/config";
const RATE_LIMIT_PATH: &str = "admin/runtime/rate-limit";
const SECURITY_PATH: &str = "admin/runtime/security";
const METRICS_PATH: &str = "metrics";
const HEALTH_PATH: &str = "health";
const READINESS_PATH: &str = "readiness";
const AUDIT_CATEGORIES_PATH: &str = "admin/audit/categories";
const AUDIT_LOGS_PATH: &str = "admin/audit/logs";
const AUDIT_PATH: &str = "admin/audit";
const SESSIONS_PATH: &str = "admin/sessions";
const CURRENT_USER_PATH: &str = "auth/me";

/// Client construction options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Header carrying a fresh correlation id on every request.
    pub request_id_header: String,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_id_header: "x-request-id".to_string(),
            user_agent: format!("tees-admin-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// Fail locally when no token is known.
    Required,
    /// Attach the token when there is one.
    Optional,
}

/// Client for the admin API.
pub struct AdminClient {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
    request_id_header: HeaderName,
    /// Set once `/admin/audit/logs` answered 404; older servers list under `/admin/audit`.
    legacy_audit_route: AtomicBool,
}

impl AdminClient {
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self> {
        Self::with_options(base_url, session, ClientOptions::default())
    }

    pub fn with_options(base_url: &str, session: Arc<Session>, options: ClientOptions) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let request_id_header = HeaderName::from_bytes(options.request_id_header.as_bytes())
            .map_err(|e| {
                Error::Validation(format!(
                    "invalid request id header '{}': {e}",
                    options.request_id_header
                ))
            })?;

        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
            request_id_header,
            legacy_audit_route: AtomicBool::new(false),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the current token against the server and mark the session ready.
    pub async fn validate_session(&self) -> Result<SessionUser> {
        let response = self
            .send(Method::GET, CURRENT_USER_PATH, Auth::Required, |r| r)
            .await?;
        let response = check(response, CURRENT_USER_PATH).await?;
        let user = match read_json::<UserEnvelope>(response).await? {
            UserEnvelope::Wrapped { user } => user,
            UserEnvelope::Bare(user) => user,
        };
        self.session.mark_ready(user.clone()).await;
        tracing::info!(user = %user.display_name(), "Session validated");
        Ok(user)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn send<F>(&self, method: Method, path: &str, auth: Auth, build: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
    {
        let url = self.endpoint(path)?;
        let request_id = Uuid::new_v4().to_string();

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(self.request_id_header.clone(), request_id.as_str());

        self.session.init().await?;
        match auth {
            Auth::Required => {
                request = request.bearer_auth(self.session.require_token().await?);
            }
            Auth::Optional => {
                if let Some(token) = self.session.token().await {
                    request = request.bearer_auth(token);
                }
            }
        }

        let started = Instant::now();
        let response = build(request).send().await.map_err(|e| {
            tracing::warn!(
                method = %method,
                path = %path,
                request_id = %request_id,
                error = %e,
                "Admin API request failed"
            );
            Error::Transport(e)
        })?;

        let status = response.status();
        tracing::debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            request_id = %request_id,
            "Admin API call"
        );

        if status == StatusCode::UNAUTHORIZED {
            self.session.expire().await;
            return Err(Error::Unauthorized);
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, auth: Auth) -> Result<T> {
        let response = self.send(Method::GET, path, auth, |r| r).await?;
        let response = check(response, path).await?;
        read_json(response).await
    }

    async fn report(&self, path: &str) -> Result<HealthReport> {
        let response = self.send(Method::GET, path, Auth::Optional, |r| r).await?;

        // Not-ready services answer 503 with a regular status body.
        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(|_| Error::Status {
                status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                message: error_message(&String::from_utf8_lossy(&bytes))
                    .unwrap_or_else(|| "service unavailable".to_string()),
            });
        }

        let response = check(response, path).await?;
        read_json(response).await
    }

    async fn put_section<B>(&self, path: &str, body: &B) -> Result<Option<RuntimeConfig>>
    where
        B: serde::Serialize + Sync,
    {
        let response = self
            .send(Method::PUT, path, Auth::Required, |r| r.json(body))
            .await?;
        let response = check(response, path).await?;
        let bytes = response.bytes().await?;
        Ok(parse_snapshot(&bytes))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .send(Method::DELETE, path, Auth::Required, |r| r)
            .await?;
        check(response, path).await?;
        Ok(())
    }

    async fn audit_page(&self, path: &str, query: &AuditQuery) -> Result<AuditPage> {
        let params = query.to_params();
        let response = self
            .send(Method::GET, path, Auth::Required, |r| r.query(&params))
            .await?;
        let response = check(response, path).await?;
        read_json(response).await
    }
}

#[async_trait]
impl RuntimeApi for AdminClient {
    async fn get_config(&self) -> Result<RuntimeConfig> {
        self.get_json(RUNTIME_CONFIG_PATH, Auth::Required).await
    }

    async fn update_rate_limit(&self, config: &RateLimitConfig) -> Result<Option<RuntimeConfig>> {
        tracing::info!(
            algorithm = %config.algorithm,
            global_max = config.global_max,
            window_ms = config.window_ms,
            overrides = config.overrides.len(),
            role_overrides = config.role_overrides.len(),
            "Updating rate limit configuration"
        );
        self.put_section(RATE_LIMIT_PATH, config).await
    }

    async fn update_security(&self, config: &SecurityConfig) -> Result<Option<RuntimeConfig>> {
        tracing::info!(
            csp_report_only = config.csp_report_only,
            enable_coep = config.enable_coep,
            "Updating security header configuration"
        );
        self.put_section(SECURITY_PATH, config).await
    }
}

#[async_trait]
impl AuditApi for AdminClient {
    async fn categories(&self) -> Result<Vec<String>> {
        let categories = match self
            .get_json::<CategoriesEnvelope>(AUDIT_CATEGORIES_PATH, Auth::Required)
            .await?
        {
            CategoriesEnvelope::Wrapped { categories } => categories,
            CategoriesEnvelope::Bare(categories) => categories,
        };
        Ok(categories)
    }

    async fn logs(&self, query: &AuditQuery) -> Result<AuditPage> {
        if !self.legacy_audit_route.load(Ordering::Relaxed) {
            match self.audit_page(AUDIT_LOGS_PATH, query).await {
                Err(Error::NotFound(_)) => {
                    tracing::debug!("Audit log route not found, falling back to {}", AUDIT_PATH);
                    self.legacy_audit_route.store(true, Ordering::Relaxed);
                }
                other => return other,
            }
        }
        self.audit_page(AUDIT_PATH, query).await
    }

    async fn clear(&self, request: &ClearAuditRequest) -> Result<ClearAuditResult> {
        tracing::warn!(request = ?request, "Clearing audit logs");
        let response = self
            .send(Method::DELETE, AUDIT_PATH, Auth::Required, |r| r.json(request))
            .await?;
        let response = check(response, AUDIT_PATH).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(ClearAuditResult::default());
        }
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }
}

#[async_trait]
impl MonitorApi for AdminClient {
    async fn metrics(&self) -> Result<MetricsResponse> {
        let response = self
            .send(Method::GET, METRICS_PATH, Auth::Optional, |r| r)
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Metrics endpoint not found, treating metrics as disabled");
            return Ok(MetricsResponse::Disabled);
        }
        let response = check(response, METRICS_PATH).await?;
        Ok(MetricsResponse::Enabled(response.text().await?))
    }

    async fn health(&self) -> Result<HealthReport> {
        self.report(HEALTH_PATH).await
    }

    async fn readiness(&self) -> Result<HealthReport> {
        self.report(READINESS_PATH).await
    }
}

#[async_trait]
impl SessionsApi for AdminClient {
    async fn revoke_session(&self, jti: &str) -> Result<()> {
        let path = format!("{}/{}", SESSIONS_PATH, urlencoding::encode(jti));
        self.delete(&path).await?;
        tracing::info!(jti = %jti, "Session revoked");
        Ok(())
    }

    async fn revoke_user_sessions(&self, user_id: &str) -> Result<()> {
        let path = format!("{}/user/{}", SESSIONS_PATH, urlencoding::encode(user_id));
        self.delete(&path).await?;
        tracing::info!(user_id = %user_id, "All user sessions revoked");
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserEnvelope {
    Wrapped { user: SessionUser },
    Bare(SessionUser),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoriesEnvelope {
    Wrapped { categories: Vec<String> },
    Bare(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotEnvelope {
    Bare(Box<RuntimeConfig>),
    Wrapped { config: Box<RuntimeConfig> },
}

/// Map non-success statuses onto the error taxonomy.
async fn check(response: Response, path: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        StatusCode::NOT_FOUND => Error::NotFound(path.to_string()),
        _ => Error::Status {
            status: status.as_u16(),
            message,
        },
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Update responses echo the effective snapshot, bare or under `config`.
fn parse_snapshot(bytes: &[u8]) -> Option<RuntimeConfig> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice::<SnapshotEnvelope>(bytes) {
        Ok(SnapshotEnvelope::Bare(config)) | Ok(SnapshotEnvelope::Wrapped { config }) => {
            Some(*config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Update response carried no snapshot");
            None
        }
    }
}

/// Best-effort human message from an error body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message", "msg"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        if let Some(errors) = value.get("errors").and_then(|v| v.as_array()) {
            let joined = errors
                .iter()
                .filter_map(|e| {
                    e.as_str()
                        .map(str::to_string)
                        .or_else(|| e.get("message").and_then(|m| m.as_str()).map(str::to_string))
                })
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return Some(joined);
            }
        }
    }

    Some(body.chars().take(200).collect())
}
