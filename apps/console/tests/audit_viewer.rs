//! Audit viewer driven through the real HTTP client.

mod support;

use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::AdminStub;
use tees_console::audit::{AuditViewer, ClearMode};

#[tokio::test]
async fn filters_and_paging_reach_the_server() {
    let stub = AdminStub::new();
    let client = Arc::new(stub.spawn().await);
    let viewer = AuditViewer::new(client, 3, Duration::from_secs(5));

    viewer
        .edit_filter(|f| {
            f.category = Some("runtime".into());
            f.q = Some("security".into());
        })
        .await;
    assert!(stub.audit_queries().is_empty());

    viewer.apply().await.unwrap();
    assert!(viewer.next_page().await.unwrap());
    assert!(viewer.load_more().await.unwrap());

    let view = viewer.view();
    assert_eq!(view.page, 3);
    assert_eq!(view.entries.len(), 4);
    assert!(!view.has_more);
    assert_eq!(view.entries[0].actor_label(), "ada");

    let queries = stub.audit_queries();
    let pages: Vec<_> = queries.iter().map(|q| q["page"].clone()).collect();
    assert_eq!(pages, ["1", "2", "3"]);
    assert!(queries
        .iter()
        .all(|q| q["category"] == "runtime" && q["q"] == "security" && q["limit"] == "3"));
}

#[tokio::test]
async fn confirmed_clear_sends_cutoff_and_reloads() {
    let stub = AdminStub::new();
    let client = Arc::new(stub.spawn().await);
    let viewer = AuditViewer::new(client, 50, Duration::from_secs(5));

    assert!(viewer.prepare_clear(ClearMode::Before(None)).is_none());
    assert!(stub.clears().is_empty());

    let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let pending = viewer.prepare_clear(ClearMode::Before(Some(cutoff))).unwrap();
    let result = viewer.confirm_clear(pending).await.unwrap();

    assert_eq!(result.deleted, Some(7));
    assert_eq!(stub.clears(), vec![json!({"before": "2024-03-01T00:00:00.000Z"})]);
    assert!(viewer.view().entries.is_empty());
}
