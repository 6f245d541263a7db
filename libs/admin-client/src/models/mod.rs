//! Wire models for the admin API

mod audit;
mod health;
mod runtime;

pub use audit::{
    AuditActor, AuditLogEntry, AuditPage, AuditQuery, ClearAuditRequest, ClearAuditResult,
};
pub use health::{HealthReport, ServiceStatus};
pub use runtime::{
    PathOverride, RateLimitAlgorithm, RateLimitConfig, RecentRequestId, RoleOverride,
    RuntimeConfig, SecurityConfig, TracingConfig, MIN_GLOBAL_MAX, MIN_WINDOW_MS,
};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated user as reported by `/auth/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl SessionUser {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("unknown")
    }
}

/// Timestamps arrive either as epoch milliseconds or as RFC 3339 strings.
pub(crate) fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Raw::Float(ms) => Utc
            .timestamp_millis_opt(ms as i64)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {ms}"))),
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{text}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(deserialize_with = "de_timestamp")]
        at: DateTime<Utc>,
    }

    #[test]
    fn test_timestamp_forms() {
        let a: Stamped = serde_json::from_value(json!({"at": 1_700_000_000_000i64})).unwrap();
        let b: Stamped = serde_json::from_value(json!({"at": "2023-11-14T22:13:20.000Z"})).unwrap();
        assert_eq!(a.at, b.at);
        assert!(serde_json::from_value::<Stamped>(json!({"at": "yesterday"})).is_err());
    }

    #[test]
    fn test_session_user_display_name() {
        let user: SessionUser =
            serde_json::from_value(json!({"_id": "u1", "email": "ops@tees.example"})).unwrap();
        assert_eq!(user.display_name(), "ops@tees.example");
        assert_eq!(user.id.as_deref(), Some("u1"));
    }
}
