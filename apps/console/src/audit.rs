//! Audit trail browsing with optional live tail
//!
//! Filter inputs are edited without touching the server. [`AuditViewer::apply`]
//! or the next tail poll picks them up. Every fetch publishes a fresh
//! [`AuditView`] on a watch channel so a renderer can follow along.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tees_admin_client::{AuditApi, AuditLogEntry, AuditQuery, ClearAuditRequest, ClearAuditResult};
use tokio::sync::{watch, RwLock};

use crate::error::Result;
use crate::schedule::PollHandle;

/// Editable filter inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub category: Option<String>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    /// Free-text search.
    pub q: Option<String>,
    /// Page size; the viewer default applies when unset.
    pub limit: Option<u32>,
}

impl AuditFilter {
    fn to_query(&self, page: u32, default_limit: u32) -> AuditQuery {
        AuditQuery {
            category: self.category.clone(),
            actor: self.actor.clone(),
            action: self.action.clone(),
            target_type: self.target_type.clone(),
            target_id: self.target_id.clone(),
            q: self.q.clone(),
            page: page.max(1),
            limit: Some(self.limit.unwrap_or(default_limit)),
        }
    }
}

/// What the viewer currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditView {
    pub entries: Vec<AuditLogEntry>,
    /// Last page fetched, 1-indexed. Zero before the first fetch.
    pub page: u32,
    pub has_more: bool,
    pub total: Option<u64>,
    /// Filter the entries were fetched with.
    pub applied: AuditFilter,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Error from the most recent background poll, cleared on success.
    pub poll_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageMode {
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    Static,
    Tailing,
}

/// What a clear request should remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    Everything,
    Before(Option<DateTime<Utc>>),
}

/// A clear request awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClear {
    request: ClearAuditRequest,
}

impl PendingClear {
    pub fn request(&self) -> &ClearAuditRequest {
        &self.request
    }
}

impl fmt::Display for PendingClear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.request {
            ClearAuditRequest::Everything { .. } => f.write_str("delete ALL audit log entries"),
            ClearAuditRequest::Before { before } => {
                write!(f, "delete audit log entries created before {before}")
            }
        }
    }
}

struct Shared<A> {
    api: Arc<A>,
    inputs: RwLock<AuditFilter>,
    view: watch::Sender<AuditView>,
    page_size: u32,
}

impl<A: AuditApi> Shared<A> {
    async fn fetch(&self, page: u32, mode: PageMode) -> Result<()> {
        let filter = self.inputs.read().await.clone();
        let query = filter.to_query(page, self.page_size);
        let result = self.api.logs(&query).await?;
        let page = result.page.unwrap_or(query.page);

        tracing::debug!(
            page,
            count = result.items.len(),
            has_more = result.has_more,
            "Fetched audit page"
        );

        self.view.send_modify(|view| {
            match mode {
                PageMode::Replace => view.entries = result.items,
                PageMode::Append => view.entries.extend(result.items),
            }
            view.page = page;
            view.has_more = result.has_more;
            view.total = result.total;
            view.applied = filter;
            view.fetched_at = Some(Utc::now());
            view.poll_error = None;
        });
        Ok(())
    }

    async fn poll(&self) -> ControlFlow<()> {
        let page = self.view.borrow().page.max(1);
        match self.fetch(page, PageMode::Replace).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(e) if e.is_session_expired() => {
                tracing::warn!(error = %e, "Stopping audit tail");
                self.view.send_modify(|view| view.poll_error = Some(e.to_string()));
                ControlFlow::Break(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Audit tail poll failed");
                self.view.send_modify(|view| view.poll_error = Some(e.to_string()));
                ControlFlow::Continue(())
            }
        }
    }
}

pub struct AuditViewer<A> {
    shared: Arc<Shared<A>>,
    tail: Option<PollHandle>,
    tail_interval: Duration,
}

impl<A: AuditApi + 'static> AuditViewer<A> {
    pub fn new(api: Arc<A>, page_size: u32, tail_interval: Duration) -> Self {
        let (view, _) = watch::channel(AuditView::default());
        Self {
            shared: Arc::new(Shared {
                api,
                inputs: RwLock::new(AuditFilter::default()),
                view,
                page_size,
            }),
            tail: None,
            tail_interval,
        }
    }

    pub async fn filter(&self) -> AuditFilter {
        self.shared.inputs.read().await.clone()
    }

    /// Change filter inputs. Nothing is fetched.
    pub async fn edit_filter(&self, f: impl FnOnce(&mut AuditFilter)) {
        f(&mut *self.shared.inputs.write().await);
    }

    /// Fetch page 1 with the current inputs.
    pub async fn apply(&self) -> Result<()> {
        self.shared.fetch(1, PageMode::Replace).await
    }

    /// Re-fetch the current page. Does not reset the tail timer.
    pub async fn refresh(&self) -> Result<()> {
        let page = self.view().page.max(1);
        self.shared.fetch(page, PageMode::Replace).await
    }

    /// Fetch an arbitrary page with the current inputs.
    pub async fn go_to_page(&self, page: u32) -> Result<()> {
        self.shared.fetch(page.max(1), PageMode::Replace).await
    }

    /// Replace the view with the next page. `false` when there is none.
    pub async fn next_page(&self) -> Result<bool> {
        let view = self.view();
        if !view.has_more {
            return Ok(false);
        }
        self.shared.fetch(view.page + 1, PageMode::Replace).await?;
        Ok(true)
    }

    pub async fn prev_page(&self) -> Result<bool> {
        let page = self.view().page;
        if page <= 1 {
            return Ok(false);
        }
        self.shared.fetch(page - 1, PageMode::Replace).await?;
        Ok(true)
    }

    /// Append the next page to the entries already shown.
    pub async fn load_more(&self) -> Result<bool> {
        let view = self.view();
        if !view.has_more {
            return Ok(false);
        }
        self.shared.fetch(view.page + 1, PageMode::Append).await?;
        Ok(true)
    }

    pub fn view(&self) -> AuditView {
        self.shared.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuditView> {
        self.shared.view.subscribe()
    }

    pub fn detail(&self, id: &str) -> Option<AuditLogEntry> {
        self.shared
            .view
            .borrow()
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(self.shared.api.categories().await?)
    }

    pub fn tail_mode(&self) -> TailMode {
        match &self.tail {
            Some(handle) if handle.is_running() => TailMode::Tailing,
            _ => TailMode::Static,
        }
    }

    /// Begin re-polling the current query. `false` if already tailing.
    pub fn start_tail(&mut self) -> bool {
        if self.tail_mode() == TailMode::Tailing {
            return false;
        }
        let shared = self.shared.clone();
        self.tail = Some(PollHandle::start(self.tail_interval, move || {
            let shared = shared.clone();
            async move { shared.poll().await }
        }));
        tracing::info!(interval_secs = self.tail_interval.as_secs(), "Audit tail started");
        true
    }

    pub fn stop_tail(&mut self) {
        if let Some(mut handle) = self.tail.take() {
            handle.stop();
            tracing::info!("Audit tail stopped");
        }
    }

    /// First half of a clear. `None` when there is nothing to send.
    pub fn prepare_clear(&self, mode: ClearMode) -> Option<PendingClear> {
        let request = match mode {
            ClearMode::Everything => ClearAuditRequest::everything(),
            ClearMode::Before(Some(cutoff)) => ClearAuditRequest::before(cutoff),
            ClearMode::Before(None) => {
                tracing::warn!("Clear before requires a timestamp; nothing sent");
                return None;
            }
        };
        Some(PendingClear { request })
    }

    /// Send a confirmed clear, then reload page 1.
    pub async fn confirm_clear(&self, pending: PendingClear) -> Result<ClearAuditResult> {
        let result = self.shared.api.clear(&pending.request).await?;
        tracing::warn!(
            request = ?pending.request,
            deleted = ?result.deleted,
            "Audit logs cleared"
        );
        if let Err(e) = self.apply().await {
            tracing::warn!(error = %e, "Reload after clear failed");
        }
        Ok(result)
    }
}

/// `2024-05-01T12:00:00Z` style timestamp for listings.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
