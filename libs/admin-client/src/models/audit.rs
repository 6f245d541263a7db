use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditActor {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A single audit trail record. Read-only from the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(deserialize_with = "crate::models::de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub actor: Option<AuditActor>,
    pub action: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub meta: JsonValue,
}

impl AuditLogEntry {
    pub fn actor_label(&self) -> &str {
        self.actor
            .as_ref()
            .and_then(|a| a.username.as_deref().or(a.email.as_deref()))
            .unwrap_or("system")
    }
}

/// Filter and paging parameters for `/admin/audit/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub category: Option<String>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    /// 1-indexed.
    pub page: u32,
    pub limit: Option<u32>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            category: None,
            actor: None,
            action: None,
            target_type: None,
            target_id: None,
            q: None,
            page: 1,
            limit: None,
        }
    }
}

impl AuditQuery {
    /// Query-string pairs. Empty filters are omitted.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let filters = [
            ("category", &self.category),
            ("actor", &self.actor),
            ("action", &self.action),
            ("targetType", &self.target_type),
            ("targetId", &self.target_id),
            ("q", &self.q),
        ];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, value.to_string()));
            }
        }
        params.push(("page", self.page.max(1).to_string()));
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// One page of audit entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAuditPage")]
pub struct AuditPage {
    pub items: Vec<AuditLogEntry>,
    /// Page number echoed by the server, when it sends one.
    pub page: Option<u32>,
    pub has_more: bool,
    pub total: Option<u64>,
}

/// The list arrives under `items` on newer servers and `logs` on older ones.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAuditPage {
    #[serde(default)]
    items: Option<Vec<AuditLogEntry>>,
    #[serde(default)]
    logs: Option<Vec<AuditLogEntry>>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    has_more: Option<bool>,
    #[serde(default)]
    total: Option<u64>,
}

impl From<RawAuditPage> for AuditPage {
    fn from(raw: RawAuditPage) -> Self {
        Self {
            items: raw.items.or(raw.logs).unwrap_or_default(),
            page: raw.page.filter(|p| *p > 0),
            has_more: raw.has_more.unwrap_or(false),
            total: raw.total,
        }
    }
}

/// Body for `DELETE /admin/audit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ClearAuditRequest {
    Everything { everything: bool },
    Before { before: String },
}

impl ClearAuditRequest {
    pub fn everything() -> Self {
        Self::Everything { everything: true }
    }

    /// Delete entries whose `createdAt` is before `cutoff`.
    pub fn before(cutoff: DateTime<Utc>) -> Self {
        Self::Before {
            before: cutoff.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearAuditResult {
    #[serde(alias = "deletedCount", default)]
    pub deleted: Option<u64>,
}
