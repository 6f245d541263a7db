use async_trait::async_trait;
use tees_admin_client::{
    PathOverride, RateLimitAlgorithm, RateLimitConfig, RoleOverride, RuntimeApi, RuntimeConfig,
};

use super::{ConfigDraft, ConfigSection};
use crate::error::{Error, Result};

#[async_trait]
impl ConfigSection for RateLimitConfig {
    const NAME: &'static str = "rate limit";

    fn from_snapshot(snapshot: &RuntimeConfig) -> Self {
        snapshot.rate_limit.clone()
    }

    fn problems(&self) -> Vec<String> {
        RateLimitConfig::problems(self)
    }

    fn warnings(&self) -> Vec<String> {
        self.duplicate_warnings()
    }

    async fn put(&self, api: &dyn RuntimeApi) -> tees_admin_client::Result<Option<RuntimeConfig>> {
        api.update_rate_limit(self).await
    }
}

impl ConfigDraft<RateLimitConfig> {
    pub fn set_algorithm(&mut self, algorithm: RateLimitAlgorithm) -> Result<()> {
        self.edit(|c| c.algorithm = algorithm)
    }

    pub fn set_global_max(&mut self, max: u64) -> Result<()> {
        self.edit(|c| c.global_max = max)
    }

    pub fn set_window_ms(&mut self, window_ms: u64) -> Result<()> {
        self.edit(|c| c.window_ms = window_ms)
    }

    /// Append a path override. Duplicates are kept and reported by
    /// [`ConfigDraft::warnings`].
    pub fn add_path_override(&mut self, entry: PathOverride) -> Result<()> {
        self.edit(|c| c.overrides.push(entry))
    }

    pub fn update_path_override(&mut self, index: usize, entry: PathOverride) -> Result<()> {
        self.edit(|c| match c.overrides.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(out_of_range("path override", index, c.overrides.len())),
        })?
    }

    pub fn remove_path_override(&mut self, index: usize) -> Result<PathOverride> {
        self.edit(|c| {
            if index < c.overrides.len() {
                Ok(c.overrides.remove(index))
            } else {
                Err(out_of_range("path override", index, c.overrides.len()))
            }
        })?
    }

    /// Index of the first path override for `path_prefix`.
    pub fn find_path_override(&self, path_prefix: &str) -> Option<usize> {
        self.draft()?
            .overrides
            .iter()
            .position(|o| o.path_prefix == path_prefix)
    }

    pub fn add_role_override(&mut self, entry: RoleOverride) -> Result<()> {
        self.edit(|c| c.role_overrides.push(entry))
    }

    pub fn update_role_override(&mut self, index: usize, entry: RoleOverride) -> Result<()> {
        self.edit(|c| match c.role_overrides.get_mut(index) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(out_of_range("role override", index, c.role_overrides.len())),
        })?
    }

    pub fn remove_role_override(&mut self, index: usize) -> Result<RoleOverride> {
        self.edit(|c| {
            if index < c.role_overrides.len() {
                Ok(c.role_overrides.remove(index))
            } else {
                Err(out_of_range("role override", index, c.role_overrides.len()))
            }
        })?
    }

    pub fn find_role_override(&self, role: &str, path_prefix: &str) -> Option<usize> {
        self.draft()?
            .role_overrides
            .iter()
            .position(|o| o.role == role && o.path_prefix == path_prefix)
    }
}

fn out_of_range(what: &str, index: usize, len: usize) -> Error {
    Error::InvalidInput(format!("no {what} at index {index} ({len} present)"))
}
