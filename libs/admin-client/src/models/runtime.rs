//! Runtime configuration snapshot as served by `/admin/runtime/config`
//!
//! Overrides set through these records are ephemeral: the server keeps them in
//! memory only and they take precedence over its environment defaults until
//! the next restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Lowest accepted `globalMax`.
pub const MIN_GLOBAL_MAX: u64 = 1;
/// Lowest accepted `windowMs`.
pub const MIN_WINDOW_MS: u64 = 1000;

/// Full runtime configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub versions: Map<String, JsonValue>,
    /// Fields this client does not model, kept so nothing is lost on display.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAlgorithm {
    #[default]
    Fixed,
    Sliding,
    TokenBucket,
}

impl RateLimitAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Sliding => "sliding",
            Self::TokenBucket => "token_bucket",
        }
    }

    pub fn all() -> [RateLimitAlgorithm; 3] {
        [Self::Fixed, Self::Sliding, Self::TokenBucket]
    }
}

impl fmt::Display for RateLimitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RateLimitAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "sliding" => Ok(Self::Sliding),
            "token_bucket" | "token-bucket" | "tokenbucket" => Ok(Self::TokenBucket),
            other => Err(format!(
                "unknown rate limit algorithm '{other}' (expected fixed, sliding or token_bucket)"
            )),
        }
    }
}

/// Per path-prefix limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOverride {
    pub path_prefix: String,
    pub max: u64,
    #[serde(default)]
    pub algorithm: RateLimitAlgorithm,
}

/// Per role and path-prefix limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleOverride {
    pub role: String,
    pub path_prefix: String,
    pub max: u64,
    #[serde(default)]
    pub algorithm: RateLimitAlgorithm,
}

/// Rate limiting sub-record. Sent whole on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    pub algorithm: RateLimitAlgorithm,
    pub global_max: u64,
    pub window_ms: u64,
    #[serde(default)]
    pub overrides: Vec<PathOverride>,
    #[serde(default)]
    pub role_overrides: Vec<RoleOverride>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl RateLimitConfig {
    /// Invariant violations. Empty when the record may be sent.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.global_max < MIN_GLOBAL_MAX {
            problems.push(format!("globalMax must be >= {MIN_GLOBAL_MAX}"));
        }
        if self.window_ms < MIN_WINDOW_MS {
            problems.push(format!("windowMs must be >= {MIN_WINDOW_MS}"));
        }
        for o in &self.overrides {
            if o.path_prefix.trim().is_empty() {
                problems.push("path override with empty pathPrefix".to_string());
            }
            if o.max < 1 {
                problems.push(format!("override {} must allow at least 1 request", o.path_prefix));
            }
        }
        for o in &self.role_overrides {
            if o.role.trim().is_empty() {
                problems.push(format!("role override on {} has empty role", o.path_prefix));
            }
            if o.path_prefix.trim().is_empty() {
                problems.push(format!("role override for {} has empty pathPrefix", o.role));
            }
            if o.max < 1 {
                problems.push(format!(
                    "role override {}@{} must allow at least 1 request",
                    o.role, o.path_prefix
                ));
            }
        }
        problems
    }

    /// Duplicate `pathPrefix` / `role+pathPrefix` entries.
    ///
    /// Not an error: how the server resolves duplicates is not known, so the
    /// list is reported and sent unchanged.
    pub fn duplicate_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut seen = HashSet::new();
        for o in &self.overrides {
            if !seen.insert(o.path_prefix.as_str()) {
                warnings.push(format!("duplicate path override for {}", o.path_prefix));
            }
        }

        let mut seen = HashSet::new();
        for o in &self.role_overrides {
            if !seen.insert((o.role.as_str(), o.path_prefix.as_str())) {
                warnings.push(format!(
                    "duplicate role override for {}@{}",
                    o.role, o.path_prefix
                ));
            }
        }
        warnings
    }
}

/// Security header toggles. Sent whole on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Serve CSP as `Content-Security-Policy-Report-Only`.
    #[serde(rename = "cspReportOnly", default)]
    pub csp_report_only: bool,
    /// Emit `Cross-Origin-Embedder-Policy`.
    #[serde(rename = "enableCOEP", default)]
    pub enable_coep: bool,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracingConfig {
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,
    #[serde(default)]
    pub recent_request_ids: Vec<RecentRequestId>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            request_id_header: default_request_id_header(),
            recent_request_ids: Vec::new(),
        }
    }
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentRequestId {
    pub id: String,
    #[serde(deserialize_with = "crate::models::de_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> JsonValue {
        json!({
            "rateLimit": {
                "algorithm": "sliding",
                "globalMax": 300,
                "windowMs": 60000,
                "overrides": [{"pathPrefix": "/api/generate", "max": 10, "algorithm": "token_bucket"}],
                "roleOverrides": [{"role": "admin", "pathPrefix": "/admin", "max": 1000, "algorithm": "fixed"}]
            },
            "security": {"cspReportOnly": true, "enableCOEP": false, "hsts": true},
            "tracing": {
                "requestIdHeader": "x-correlation-id",
                "recentRequestIds": [
                    {"id": "a1", "timestamp": 1700000000000i64},
                    {"id": "b2", "timestamp": "2024-03-01T12:00:00.000Z"}
                ]
            },
            "versions": {"node": "20.11.0", "app": "1.4.2"},
            "ephemeral": true
        })
    }

    #[test]
    fn test_deserialize_snapshot() {
        let config: RuntimeConfig = serde_json::from_value(sample()).unwrap();
        assert_eq!(config.rate_limit.algorithm, RateLimitAlgorithm::Sliding);
        assert_eq!(config.rate_limit.global_max, 300);
        assert_eq!(config.rate_limit.overrides[0].algorithm, RateLimitAlgorithm::TokenBucket);
        assert_eq!(config.rate_limit.role_overrides[0].role, "admin");
        assert!(config.security.csp_report_only);
        assert_eq!(config.security.extra.get("hsts"), Some(&json!(true)));
        assert_eq!(config.tracing.request_id_header, "x-correlation-id");
        assert_eq!(config.tracing.recent_request_ids.len(), 2);
        assert_eq!(
            config.tracing.recent_request_ids[0].timestamp.timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(config.versions.get("app"), Some(&json!("1.4.2")));
        assert_eq!(config.extra.get("ephemeral"), Some(&json!(true)));
    }

    #[test]
    fn test_security_serializes_wire_names_and_extras() {
        let config: RuntimeConfig = serde_json::from_value(sample()).unwrap();
        let body = serde_json::to_value(&config.security).unwrap();
        assert_eq!(
            body,
            json!({"cspReportOnly": true, "enableCOEP": false, "hsts": true})
        );
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("fixed".parse::<RateLimitAlgorithm>(), Ok(RateLimitAlgorithm::Fixed));
        assert_eq!(
            "Token-Bucket".parse::<RateLimitAlgorithm>(),
            Ok(RateLimitAlgorithm::TokenBucket)
        );
        assert!("leaky".parse::<RateLimitAlgorithm>().is_err());
        assert_eq!(RateLimitAlgorithm::TokenBucket.to_string(), "token_bucket");
    }

    #[test]
    fn test_problems() {
        let mut config: RuntimeConfig = serde_json::from_value(sample()).unwrap();
        assert!(config.rate_limit.problems().is_empty());

        config.rate_limit.global_max = 0;
        config.rate_limit.window_ms = 999;
        let problems = config.rate_limit.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("globalMax"));
        assert!(problems[1].contains("windowMs"));
    }

    #[test]
    fn test_duplicates_are_warnings_not_problems() {
        let mut config: RuntimeConfig = serde_json::from_value(sample()).unwrap();
        let dup = config.rate_limit.overrides[0].clone();
        config.rate_limit.overrides.push(dup);
        let dup = config.rate_limit.role_overrides[0].clone();
        config.rate_limit.role_overrides.push(dup);

        assert!(config.rate_limit.problems().is_empty());
        assert_eq!(config.rate_limit.duplicate_warnings().len(), 2);
    }
}
