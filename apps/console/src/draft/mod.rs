//! Editable copies of runtime configuration sections
//!
//! A [`ConfigDraft`] holds the last snapshot the server reported next to a
//! local working copy. Edits touch only the working copy; the draft is dirty
//! while the two differ structurally. Saving sends the whole working copy.

mod rate_limit;
mod security;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use tees_admin_client::{RuntimeApi, RuntimeConfig};

use crate::error::{Error, Result};

/// A sub-record of [`RuntimeConfig`] that is replaced as a unit.
#[async_trait]
pub trait ConfigSection: Clone + PartialEq + fmt::Debug + Serialize + Send + Sync {
    /// Human-readable section name used in logs and errors.
    const NAME: &'static str;

    fn from_snapshot(snapshot: &RuntimeConfig) -> Self;

    /// Invariant violations that block a save.
    fn problems(&self) -> Vec<String>;

    /// Suspicious but allowed content.
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }

    async fn put(&self, api: &dyn RuntimeApi) -> tees_admin_client::Result<Option<RuntimeConfig>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Idle,
    Loading,
    Loaded,
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Draft matched the server; nothing was sent.
    Unchanged,
    Saved,
}

/// One top-level field that differs between server and draft.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub server: JsonValue,
    pub draft: JsonValue,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.server, self.draft)
    }
}

#[derive(Debug)]
pub struct ConfigDraft<S: ConfigSection> {
    state: DraftState,
    server: Option<S>,
    draft: Option<S>,
}

impl<S: ConfigSection> Default for ConfigDraft<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ConfigSection> ConfigDraft<S> {
    pub fn new() -> Self {
        Self {
            state: DraftState::Idle,
            server: None,
            draft: None,
        }
    }

    /// Draft seeded from a snapshot that was already fetched.
    pub fn from_snapshot(snapshot: &RuntimeConfig) -> Self {
        let mut draft = Self::new();
        draft.accept(S::from_snapshot(snapshot));
        draft
    }

    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Last snapshot reported by the server.
    pub fn server(&self) -> Option<&S> {
        self.server.as_ref()
    }

    /// Local working copy.
    pub fn draft(&self) -> Option<&S> {
        self.draft.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        match (&self.server, &self.draft) {
            (Some(server), Some(draft)) => server != draft,
            _ => false,
        }
    }

    /// Fetch the section, replacing both snapshot and working copy.
    pub async fn load(&mut self, api: &dyn RuntimeApi) -> Result<()> {
        let previous = self.state;
        self.state = DraftState::Loading;

        match api.get_config().await {
            Ok(snapshot) => {
                if self.is_dirty() {
                    tracing::info!(section = S::NAME, "Reload discarded local edits");
                }
                self.accept(S::from_snapshot(&snapshot));
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                tracing::warn!(section = S::NAME, error = %e, "Failed to load runtime config");
                Err(e.into())
            }
        }
    }

    /// Mutate the working copy.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> Result<R> {
        let draft = self.draft.as_mut().ok_or(Error::NotLoaded(S::NAME))?;
        Ok(f(draft))
    }

    pub fn validate(&self) -> Result<()> {
        let draft = self.draft.as_ref().ok_or(Error::NotLoaded(S::NAME))?;
        let problems = draft.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidDraft(problems))
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.draft.as_ref().map(S::warnings).unwrap_or_default()
    }

    /// Send the working copy when it differs from the server snapshot.
    ///
    /// On failure the working copy is left exactly as it was, still dirty.
    pub async fn save(&mut self, api: &dyn RuntimeApi) -> Result<SaveOutcome> {
        let draft = self.draft.clone().ok_or(Error::NotLoaded(S::NAME))?;
        if !self.is_dirty() {
            return Ok(SaveOutcome::Unchanged);
        }
        self.validate()?;
        for warning in draft.warnings() {
            tracing::warn!(section = S::NAME, "{warning}");
        }

        self.state = DraftState::Saving;
        let echoed = match draft.put(api).await {
            Ok(echoed) => echoed,
            Err(e) => {
                self.state = DraftState::Loaded;
                tracing::warn!(section = S::NAME, error = %e, "Save rejected");
                return Err(e.into());
            }
        };

        let server = match echoed {
            Some(snapshot) => S::from_snapshot(&snapshot),
            None => match api.get_config().await {
                Ok(snapshot) => S::from_snapshot(&snapshot),
                Err(e) => {
                    tracing::warn!(
                        section = S::NAME,
                        error = %e,
                        "Saved, but reload failed; assuming the server took the draft as sent"
                    );
                    draft
                }
            },
        };

        tracing::info!(section = S::NAME, "Runtime config saved");
        self.accept(server);
        Ok(SaveOutcome::Saved)
    }

    /// Throw away local edits.
    pub fn discard(&mut self) {
        if let Some(server) = &self.server {
            self.draft = Some(server.clone());
        }
    }

    /// Top-level fields that differ, in serialization order of the draft.
    pub fn diff(&self) -> Vec<FieldChange> {
        let (Some(server), Some(draft)) = (&self.server, &self.draft) else {
            return Vec::new();
        };
        let server = to_object(server);
        let draft = to_object(draft);

        let mut changes = Vec::new();
        for (field, value) in &draft {
            let before = server.get(field).cloned().unwrap_or(JsonValue::Null);
            if &before != value {
                changes.push(FieldChange {
                    field: field.clone(),
                    server: before,
                    draft: value.clone(),
                });
            }
        }
        for (field, value) in &server {
            if !draft.contains_key(field) {
                changes.push(FieldChange {
                    field: field.clone(),
                    server: value.clone(),
                    draft: JsonValue::Null,
                });
            }
        }
        changes
    }

    fn accept(&mut self, server: S) {
        self.draft = Some(server.clone());
        self.server = Some(server);
        self.state = DraftState::Loaded;
    }
}

fn to_object<S: Serialize>(section: &S) -> serde_json::Map<String, JsonValue> {
    match serde_json::to_value(section) {
        Ok(JsonValue::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}
