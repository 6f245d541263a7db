use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Overall status reported by `/health` and `/readiness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    #[serde(alias = "healthy", alias = "up", alias = "OK")]
    Ok,
    Ready,
    Degraded,
    #[serde(alias = "not-ready", alias = "notReady")]
    NotReady,
    #[serde(alias = "down", alias = "unhealthy", alias = "fail")]
    Error,
    #[serde(other)]
    Unknown,
}

impl ServiceStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Ok | Self::Ready)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::NotReady => "not_ready",
            Self::Error => "error",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Health or readiness report. Everything besides `status` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    #[serde(flatten)]
    pub details: Map<String, JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_aliases() {
        let report: HealthReport =
            serde_json::from_value(json!({"status": "healthy", "uptime": 12.5})).unwrap();
        assert_eq!(report.status, ServiceStatus::Ok);
        assert!(report.status.is_healthy());
        assert_eq!(report.details.get("uptime"), Some(&json!(12.5)));

        let report: HealthReport =
            serde_json::from_value(json!({"status": "not_ready", "db": "connecting"})).unwrap();
        assert_eq!(report.status, ServiceStatus::NotReady);
        assert!(!report.status.is_healthy());
    }

    #[test]
    fn test_unknown_status() {
        let report: HealthReport = serde_json::from_value(json!({"status": "meh"})).unwrap();
        assert_eq!(report.status, ServiceStatus::Unknown);
    }
}
