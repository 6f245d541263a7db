//! In-process admin API for console integration tests.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};
use tees_admin_client::{AdminClient, Session};

pub const TOKEN: &str = "console-test-token";

#[derive(Default)]
pub struct Recorded {
    pub config: Value,
    pub puts: Vec<Value>,
    pub reject_next_put: Option<String>,
    pub audit_total: usize,
    pub audit_queries: Vec<HashMap<String, String>>,
    pub clears: Vec<Value>,
}

#[derive(Clone)]
pub struct AdminStub {
    pub recorded: Arc<Mutex<Recorded>>,
}

impl AdminStub {
    pub fn new() -> Self {
        let recorded = Recorded {
            config: json!({
                "rateLimit": {
                    "algorithm": "sliding",
                    "globalMax": 200,
                    "windowMs": 60000,
                    "overrides": [{"pathPrefix": "/api/generate", "max": 10, "algorithm": "token_bucket"}],
                    "roleOverrides": [],
                    "burst": 20
                },
                "security": {"cspReportOnly": true, "enableCOEP": false},
                "tracing": {"requestIdHeader": "x-request-id", "recentRequestIds": []},
                "versions": {"app": "2.3.0"}
            }),
            audit_total: 7,
            ..Default::default()
        };
        Self {
            recorded: Arc::new(Mutex::new(recorded)),
        }
    }

    pub fn reject_next_put(&self, message: &str) {
        self.recorded.lock().unwrap().reject_next_put = Some(message.to_string());
    }

    pub fn puts(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().puts.clone()
    }

    pub fn audit_queries(&self) -> Vec<HashMap<String, String>> {
        self.recorded.lock().unwrap().audit_queries.clone()
    }

    pub fn clears(&self) -> Vec<Value> {
        self.recorded.lock().unwrap().clears.clone()
    }

    /// Serve on an ephemeral port and return a client pointed at it.
    pub async fn spawn(&self) -> AdminClient {
        init_tracing();

        let app = Router::new()
            .route("/admin/runtime/config", get(get_config))
            .route("/admin/runtime/rate-limit", put(put_rate_limit))
            .route("/admin/runtime/security", put(put_security))
            .route("/admin/audit/logs", get(audit_logs))
            .route("/admin/audit", axum::routing::delete(audit_clear))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        AdminClient::new(
            &format!("http://{addr}"),
            Arc::new(Session::with_token(TOKEN, None)),
        )
        .unwrap()
    }
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}

async fn get_config(State(stub): State<AdminStub>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(stub.recorded.lock().unwrap().config.clone()).into_response()
}

fn record_put(stub: &AdminStub, key: &str, body: Value) -> Result<Value, Response> {
    let mut recorded = stub.recorded.lock().unwrap();
    if let Some(message) = recorded.reject_next_put.take() {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"message": message}))).into_response());
    }
    recorded.puts.push(body.clone());
    recorded.config[key] = body;
    Ok(recorded.config.clone())
}

async fn put_rate_limit(
    State(stub): State<AdminStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match record_put(&stub, "rateLimit", body) {
        Ok(config) => Json(json!({"config": config})).into_response(),
        Err(response) => response,
    }
}

async fn put_security(
    State(stub): State<AdminStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    match record_put(&stub, "security", body) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

async fn audit_logs(
    State(stub): State<AdminStub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(50);

    let mut recorded = stub.recorded.lock().unwrap();
    recorded.audit_queries.push(params);
    let total = recorded.audit_total;

    let start = (page - 1) * limit;
    let end = (start + limit).min(total);
    let items: Vec<Value> = (start..end)
        .map(|n| {
            json!({
                "_id": format!("entry-{n}"),
                "createdAt": 1714564800000i64 - (n as i64) * 60_000,
                "actor": {"username": "ada"},
                "action": "runtime.security.update",
                "category": "runtime",
                "meta": {"n": n}
            })
        })
        .collect();

    Json(json!({
        "items": items,
        "page": page,
        "hasMore": end < total,
        "total": total
    }))
    .into_response()
}

async fn audit_clear(
    State(stub): State<AdminStub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut recorded = stub.recorded.lock().unwrap();
    let deleted = recorded.audit_total;
    recorded.audit_total = 0;
    recorded.clears.push(body);
    Json(json!({"deleted": deleted})).into_response()
}
