//! Operator session context
//!
//! The session is an explicit object handed to [`crate::AdminClient`] rather
//! than ambient state. Lifecycle:
//!
//! ```text
//! Uninitialized --init--> Pending(token) --validate--> Ready { token, user }
//!                    \                         \
//!                     `-> Uninitialized         `-> Expired
//! ```
//!
//! Any 401 from the API moves the session to `Expired` and forgets the
//! persisted token.

use crate::error::{Error, Result};
use crate::models::SessionUser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No token known yet.
    Uninitialized,
    /// A token is known but has not been checked against the server.
    Pending { token: String },
    /// Token validated.
    Ready { token: String, user: SessionUser },
    /// The server rejected the token.
    Expired,
}

impl SessionState {
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Pending { token } | Self::Ready { token, .. } => Some(token),
            Self::Uninitialized | Self::Expired => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Pending { .. } => "pending",
            Self::Ready { .. } => "ready",
            Self::Expired => "expired",
        }
    }
}

/// Persisted bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// File-backed token persistence.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/tees-console/session.json`
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("tees-console").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let stored: StoredToken = serde_json::from_str(&raw)?;
        if stored.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(stored.token))
    }

    pub fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&stored)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Shared session context.
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionState>,
    store: Option<TokenStore>,
}

impl Session {
    pub fn new(store: Option<TokenStore>) -> Self {
        Self {
            state: RwLock::new(SessionState::Uninitialized),
            store,
        }
    }

    /// Session seeded with an explicit token (flag or environment).
    pub fn with_token(token: impl Into<String>, store: Option<TokenStore>) -> Self {
        Self {
            state: RwLock::new(SessionState::Pending {
                token: token.into(),
            }),
            store,
        }
    }

    /// Read the persisted token when no token is known yet.
    pub async fn init(&self) -> Result<SessionState> {
        let mut state = self.state.write().await;
        if matches!(*state, SessionState::Uninitialized) {
            if let Some(store) = &self.store {
                match store.load() {
                    Ok(Some(token)) => {
                        tracing::debug!(path = %store.path().display(), "Loaded persisted session token");
                        *state = SessionState::Pending { token };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            path = %store.path().display(),
                            error = %e,
                            "Ignoring unreadable session file"
                        );
                    }
                }
            }
        }
        Ok(state.clone())
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token().map(str::to_string)
    }

    /// Token for an authenticated call.
    pub async fn require_token(&self) -> Result<String> {
        match &*self.state.read().await {
            SessionState::Pending { token } | SessionState::Ready { token, .. } => {
                Ok(token.clone())
            }
            SessionState::Expired => Err(Error::NoSession(
                "session expired; set a new token".to_string(),
            )),
            SessionState::Uninitialized => Err(Error::NoSession(
                "no token configured; set one with `session set-token`".to_string(),
            )),
        }
    }

    /// Replace the token, optionally persisting it.
    ///
    /// Returns the file the token was written to. `None` when nothing was
    /// persisted, either because `persist` is off or the session has no store.
    pub async fn set_token(
        &self,
        token: impl Into<String>,
        persist: bool,
    ) -> Result<Option<PathBuf>> {
        let token = token.into();
        let stored_at = match (&self.store, persist) {
            (Some(store), true) => {
                store.save(&token)?;
                Some(store.path().to_path_buf())
            }
            _ => None,
        };
        *self.state.write().await = SessionState::Pending { token };
        Ok(stored_at)
    }

    pub(crate) async fn mark_ready(&self, user: SessionUser) {
        let mut state = self.state.write().await;
        if let Some(token) = state.token().map(str::to_string) {
            *state = SessionState::Ready { token, user };
        }
    }

    /// Forget the token after the server rejected it.
    pub async fn expire(&self) {
        let mut state = self.state.write().await;
        if matches!(*state, SessionState::Expired) {
            return;
        }
        *state = SessionState::Expired;
        drop(state);

        tracing::warn!("Session expired; stored token discarded");
        self.forget_stored();
    }

    /// Explicit logout.
    pub async fn logout(&self) -> Result<()> {
        *self.state.write().await = SessionState::Uninitialized;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        Ok(())
    }

    fn forget_stored(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "Failed to remove session file");
            }
        }
    }
}
