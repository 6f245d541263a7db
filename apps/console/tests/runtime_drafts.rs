//! Config drafts driven through the real HTTP client.

mod support;

use std::collections::BTreeSet;
use support::AdminStub;
use tees_admin_client::{PathOverride, RateLimitAlgorithm, RateLimitConfig, SecurityConfig};
use tees_console::draft::{ConfigDraft, SaveOutcome};
use tees_console::Error;

fn keys(value: &serde_json::Value) -> BTreeSet<String> {
    value.as_object().unwrap().keys().cloned().collect()
}

#[tokio::test]
async fn rate_limit_save_sends_whole_record_including_unknown_fields() {
    let stub = AdminStub::new();
    let client = stub.spawn().await;

    let mut draft = ConfigDraft::<RateLimitConfig>::new();
    draft.load(&client).await.unwrap();
    draft
        .add_path_override(PathOverride {
            path_prefix: "/api/checkout".into(),
            max: 25,
            algorithm: RateLimitAlgorithm::Fixed,
        })
        .unwrap();

    assert_eq!(draft.save(&client).await.unwrap(), SaveOutcome::Saved);

    let puts = stub.puts();
    assert_eq!(puts.len(), 1);
    let expected: BTreeSet<String> = [
        "algorithm",
        "globalMax",
        "windowMs",
        "overrides",
        "roleOverrides",
        "burst",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(keys(&puts[0]), expected);
    assert_eq!(puts[0]["overrides"].as_array().unwrap().len(), 2);
    assert!(!draft.is_dirty());
}

#[tokio::test]
async fn rejected_save_keeps_the_draft() {
    let stub = AdminStub::new();
    let client = stub.spawn().await;

    let mut draft = ConfigDraft::<RateLimitConfig>::new();
    draft.load(&client).await.unwrap();
    draft.set_window_ms(5_000).unwrap();
    let edited = draft.draft().cloned();

    stub.reject_next_put("windowMs below node minimum");
    let err = draft.save(&client).await.unwrap_err();
    match err {
        Error::Api(tees_admin_client::Error::Validation(message)) => {
            assert_eq!(message, "windowMs below node minimum")
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    assert_eq!(draft.draft().cloned(), edited);
    assert!(draft.is_dirty());

    // A retry goes through once the server accepts it.
    assert_eq!(draft.save(&client).await.unwrap(), SaveOutcome::Saved);
    assert_eq!(draft.server().unwrap().window_ms, 5_000);
}

#[tokio::test]
async fn security_save_without_body_reloads_snapshot() {
    let stub = AdminStub::new();
    let client = stub.spawn().await;

    let mut draft = ConfigDraft::<SecurityConfig>::new();
    draft.load(&client).await.unwrap();
    draft.set_csp_report_only(false).unwrap();
    draft.set_enable_coep(true).unwrap();

    assert_eq!(draft.save(&client).await.unwrap(), SaveOutcome::Saved);
    let server = draft.server().unwrap();
    assert!(!server.csp_report_only);
    assert!(server.enable_coep);
    assert!(!draft.is_dirty());

    assert_eq!(draft.save(&client).await.unwrap(), SaveOutcome::Unchanged);
    assert_eq!(stub.puts().len(), 1);
}
