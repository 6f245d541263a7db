//! Subcommand implementations
//!
//! Each command prints its result to stdout, either as text or as JSON when
//! `--json` is set. Logs go to stderr.

pub mod audit;
pub mod monitor;
pub mod runtime;
pub mod session;

use anyhow::Context as _;
use serde::Serialize;
use std::sync::Arc;
use tees_admin_client::{AdminClient, Session, TokenStore};

use crate::config::Config;

/// Everything a command needs to talk to the server.
pub struct Context {
    pub config: Config,
    pub client: Arc<AdminClient>,
    pub store: Option<TokenStore>,
    pub json: bool,
}

impl Context {
    /// Build the client. An explicit token (flag or config) is used as is and
    /// never written to or removed from the session file.
    pub fn new(config: Config, token: Option<String>, json: bool) -> anyhow::Result<Self> {
        let store = config.token_store();
        let session = match token.or_else(|| config.api.token.clone()) {
            Some(token) => Session::with_token(token, None),
            None => Session::new(store.clone()),
        };

        let client = AdminClient::with_options(
            &config.api.base_url,
            Arc::new(session),
            config.client_options(),
        )
        .with_context(|| format!("Invalid API base URL: {}", config.api.base_url))?;

        Ok(Self {
            config,
            client: Arc::new(client),
            store,
            json,
        })
    }

    /// Print `value` as pretty JSON.
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Ask for confirmation on stdin. Only an explicit `yes` counts.
pub(crate) async fn confirm(prompt: String) -> anyhow::Result<bool> {
    let answer = tokio::task::spawn_blocking(move || {
        use std::io::Write;

        eprint!("{prompt} Type 'yes' to continue: ");
        std::io::stderr().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok::<_, std::io::Error>(answer)
    })
    .await
    .context("Confirmation prompt failed")??;

    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

pub(crate) fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub(crate) fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, secs) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else {
        format!("{minutes}m {secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_session_file(dir: &std::path::Path) -> Config {
        let mut config = Config::load_from(None).unwrap();
        config.api.session_file = Some(dir.join("session.json"));
        config.api.persist_session = true;
        config
    }

    #[tokio::test]
    async fn test_explicit_token_is_never_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(config_with_session_file(dir.path()), Some("flag".into()), false)
            .unwrap();

        let stored_at = ctx.client.session().set_token("fresh", true).await.unwrap();
        assert_eq!(stored_at, None);
        assert!(!dir.path().join("session.json").exists());
        assert_eq!(ctx.client.session().token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_stored_session_token_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(config_with_session_file(dir.path()), None, false).unwrap();

        let stored_at = ctx.client.session().set_token("fresh", true).await.unwrap();
        assert_eq!(stored_at, Some(dir.path().join("session.json")));
        assert_eq!(
            ctx.store.as_ref().unwrap().load().unwrap().as_deref(),
            Some("fresh")
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(52_428_800.0), "50.0 MiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.0), "0m 42s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
        assert_eq!(format_duration(90_061.0), "1d 1h 1m");
    }
}
