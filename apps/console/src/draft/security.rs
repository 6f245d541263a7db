use async_trait::async_trait;
use tees_admin_client::{RuntimeApi, RuntimeConfig, SecurityConfig};

use super::{ConfigDraft, ConfigSection};
use crate::error::Result;

#[async_trait]
impl ConfigSection for SecurityConfig {
    const NAME: &'static str = "security";

    fn from_snapshot(snapshot: &RuntimeConfig) -> Self {
        snapshot.security.clone()
    }

    // Both toggles are plain booleans.
    fn problems(&self) -> Vec<String> {
        Vec::new()
    }

    async fn put(&self, api: &dyn RuntimeApi) -> tees_admin_client::Result<Option<RuntimeConfig>> {
        api.update_security(self).await
    }
}

impl ConfigDraft<SecurityConfig> {
    /// Serve the content security policy in report-only mode.
    pub fn set_csp_report_only(&mut self, enabled: bool) -> Result<()> {
        self.edit(|c| c.csp_report_only = enabled)
    }

    /// Emit `Cross-Origin-Embedder-Policy: require-corp`.
    pub fn set_enable_coep(&mut self, enabled: bool) -> Result<()> {
        self.edit(|c| c.enable_coep = enabled)
    }
}
