//! Console configuration
//!
//! Layered with the `config` crate, lowest precedence first:
//! 1. built-in defaults
//! 2. `tees-console.toml` in the working directory (or an explicit `--config` file)
//! 3. `TEES_CONSOLE__<SECTION>__<KEY>` environment variables (`.env` is honoured)
//!
//! Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tees_admin_client::{ClientOptions, TokenStore};
use url::Url;

const ENV_PREFIX: &str = "TEES_CONSOLE";
const DEFAULT_FILE: &str = "tees-console";

/// Interval at which tail mode re-polls the audit trail.
pub const DEFAULT_TAIL_INTERVAL_SECONDS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the storefront API, e.g. `https://api.teesfromthepast.example`.
    pub base_url: String,
    pub timeout_seconds: u64,
    /// Correlation header sent with each request.
    pub request_id_header: String,
    /// Bearer token. Takes precedence over the persisted session.
    #[serde(default)]
    pub token: Option<String>,
    /// Session file; defaults to the user config directory.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Store tokens set through `session set-token`.
    pub persist_session: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub page_size: u32,
    pub tail_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
}

impl Config {
    /// Load from defaults, `tees-console.toml` and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Like [`Config::load`] but with an explicit, required file.
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("api.base_url", "http://localhost:5000")?
            .set_default("api.timeout_seconds", 30)?
            .set_default("api.request_id_header", "x-request-id")?
            .set_default("api.persist_session", true)?
            .set_default("audit.page_size", 50)?
            .set_default("audit.tail_interval_seconds", DEFAULT_TAIL_INTERVAL_SECONDS as i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("logging.file_enabled", false)?
            .set_default("logging.file_directory", "logs")?
            .set_default("logging.file_prefix", "tees-console")?
            .set_default("logging.file_rotation", "daily")?;

        let builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_FILE).required(false)),
        };

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.api.base_url)
            .map_err(|e| format!("api.base_url is not a valid URL ({e}): {}", self.api.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            ));
        }
        if url.host().is_none() {
            return Err(format!("api.base_url has no host: {}", self.api.base_url));
        }
        if self.api.timeout_seconds == 0 {
            return Err("api.timeout_seconds must be greater than 0".to_string());
        }
        if self.api.request_id_header.trim().is_empty() {
            return Err("api.request_id_header must not be empty".to_string());
        }
        if self.audit.page_size == 0 || self.audit.page_size > 500 {
            return Err("audit.page_size must be between 1 and 500".to_string());
        }
        if self.audit.tail_interval_seconds == 0 {
            return Err("audit.tail_interval_seconds must be greater than 0".to_string());
        }
        match self.logging.file_rotation.as_str() {
            "daily" | "hourly" | "minutely" | "never" => {}
            other => return Err(format!("logging.file_rotation is invalid: {other}")),
        }
        Ok(())
    }

    pub fn tail_interval(&self) -> Duration {
        Duration::from_secs(self.audit.tail_interval_seconds)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.api.timeout_seconds),
            request_id_header: self.api.request_id_header.clone(),
            ..Default::default()
        }
    }

    pub fn token_store(&self) -> Option<TokenStore> {
        match &self.api.session_file {
            Some(path) => Some(TokenStore::new(path.clone())),
            None => TokenStore::default_location(),
        }
    }
}
