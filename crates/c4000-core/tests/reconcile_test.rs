#![allow(clippy::unwrap_used)]
// Reconciler behaviour against a simulated rule table.

mod common;

use pretty_assertions::assert_eq;

use c4000_core::{
    CoreError, DesiredRuleSpec, DesiredState, EnsureOutcome, RemovalOutcome, RuleReconciler,
};
use common::{Router, connect, fast_reconciler};

const MAC: &str = "AA:BB:CC:DD:EE:FF";

// ── Single target ───────────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_present_is_idempotent() {
    let router = Router::default();
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let first = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(first, EnsureOutcome::VerifiedPresent { attempts: 2 });

    let second = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(second, EnsureOutcome::AlreadyPresent);

    let state = router.state();
    assert_eq!(state.writes.len(), 1, "second run must not write");
    assert_eq!(state.rules.len(), 1);
}

#[tokio::test]
async fn test_three_duplicates_converge_with_two_deletes() {
    let router = Router::default()
        .with_rule("1", "example.com", MAC)
        .with_rule("2", "example.com", MAC)
        .with_rule("3", "example.com", MAC);
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        EnsureOutcome::DuplicatesRemoved {
            removed: 2,
            stuck: vec![]
        }
    );

    let state = router.state();
    assert_eq!(state.deletes(), 2);
    assert_eq!(state.rules.len(), 1);
    // First match wins.
    assert_eq!(state.rules[0].id, "1");
}

#[tokio::test]
async fn test_other_devices_rules_are_not_matches() {
    let router = Router::default()
        .with_rule("1", "example.com", "")
        .with_rule("2", "example.com", "11:22:33:44:55:66");
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Absent)
        .await
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::AlreadyAbsent);
    assert!(router.state().writes.is_empty());
}

#[tokio::test]
async fn test_absent_clears_one_duplicate_per_attempt() {
    let router = Router::default()
        .with_rule("4", "ads.example", MAC)
        .with_rule("9", "ads.example", MAC);
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("ads.example", MAC, DesiredState::Absent)
        .await
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::VerifiedAbsent { attempts: 3 });
    assert_eq!(router.state().deletes(), 2);
    assert!(router.state().rules.is_empty());
}

#[tokio::test]
async fn test_absent_with_many_duplicates_respects_attempt_cap() {
    let mut router = Router::default();
    for id in 1..=5 {
        router = router.with_rule(&id.to_string(), "ads.example", MAC);
    }
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let result = reconciler
        .ensure_rule("ads.example", MAC, DesiredState::Absent)
        .await;
    assert!(
        matches!(
            result,
            Err(CoreError::ReconciliationExhausted { attempts: 3, ref action, .. }) if action == "REMOVE"
        ),
        "got: {result:?}"
    );

    let state = router.state();
    assert_eq!(state.deletes(), 3);
    assert_eq!(state.rules.len(), 2);
}

#[tokio::test]
async fn test_persistent_read_failures_terminate() {
    let router = Router::default();
    router.state().failing_reads = u32::MAX;
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let result = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await;
    assert!(
        matches!(result, Err(CoreError::ReconciliationExhausted { .. })),
        "got: {result:?}"
    );

    let state = router.state();
    // Three reconciliation attempts, each a read the transport tries three times.
    assert_eq!(state.rule_reads, 9);
    assert!(state.writes.is_empty());
}

#[tokio::test]
async fn test_null_read_costs_one_attempt() {
    let router = Router::default();
    router.state().null_reads = 1;
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("example.com", "", DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::VerifiedPresent { attempts: 3 });
    // A null body must never read as an empty table: exactly one Add.
    assert_eq!(router.state().adds().len(), 1);
}

#[tokio::test]
async fn test_failed_write_is_retried_on_next_attempt() {
    let router = Router::default();
    router.state().failing_writes = 1;
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::VerifiedPresent { attempts: 3 });

    let state = router.state();
    assert_eq!(state.set_calls, 2, "rejected Add is sent once more");
    assert_eq!(state.adds().len(), 1);
    assert_eq!(state.rules.len(), 1);
}

#[tokio::test]
async fn test_failed_write_that_committed_is_not_repeated() {
    let router = Router::default();
    {
        let mut state = router.state();
        state.failing_writes = 1;
        state.apply_failing_writes = true;
    }
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler
        .ensure_rule("example.com", MAC, DesiredState::Present)
        .await
        .unwrap();
    assert_eq!(outcome, EnsureOutcome::VerifiedPresent { attempts: 2 });

    let state = router.state();
    assert_eq!(state.set_calls, 1, "re-read finds the rule, no second Add");
    assert_eq!(state.rules.len(), 1);
}

// ── Removal ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_remove_by_id_unknown_is_already_gone() {
    let router = Router::default().with_rule("2", "example.com", "");
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler.remove_by_id("42").await.unwrap();
    assert_eq!(outcome, RemovalOutcome::AlreadyGone);
    assert!(router.state().writes.is_empty());
}

#[tokio::test]
async fn test_remove_by_id_deletes_once() {
    let router = Router::default().with_rule("2", "example.com", "");
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let outcome = reconciler.remove_by_id("2").await.unwrap();
    assert_eq!(outcome, RemovalOutcome::Removed);
    assert_eq!(router.state().deletes(), 1);
    assert_eq!(
        router.state().writes[0],
        vec![
            ("Object".to_owned(), format!("{}.Rule.2.", common::FILTER)),
            ("Operation".to_owned(), "Del".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_remove_all_quarantines_ghost_rule() {
    let router = Router::default()
        .with_rule("5", "a.example", "")
        .with_rule("7", "ghost.example", MAC)
        .with_rule("8", "b.example", MAC)
        .with_ghost("7");
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler.remove_all().await.unwrap();
    assert_eq!(report.removed, 2);
    assert_eq!(report.stuck.into_iter().collect::<Vec<_>>(), vec!["7".to_owned()]);

    let state = router.state();
    assert_eq!(state.rules.len(), 1);
    assert_eq!(state.rules[0].id, "7");
}

#[tokio::test]
async fn test_remove_all_survives_stale_read_after_delete() {
    let router = Router::default()
        .with_rule("5", "a.example", "")
        .with_rule("6", "b.example", MAC);
    router.state().stale_after_delete = 1;
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler.remove_all().await.unwrap();
    assert_eq!(report.removed, 2);
    assert!(report.stuck.is_empty(), "stuck: {:?}", report.stuck);

    let state = router.state();
    assert!(state.rules.is_empty());
    // The stale row for #5 costs one extra delete inside remove_by_id.
    assert_eq!(state.deletes(), 3);
}

#[tokio::test]
async fn test_remove_all_on_empty_table() {
    let router = Router::default();
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler.remove_all().await.unwrap();
    assert_eq!(report.removed, 0);
    assert!(report.stuck.is_empty());
}

// ── Batches ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_end_to_end_create_by_mac() {
    let router = Router::default().with_host("laptop", "192.168.0.10", MAC);
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler
        .ensure_rules_present(&[DesiredRuleSpec::new(MAC, "example.com")])
        .await
        .unwrap();
    assert!(report.is_success());
    assert_eq!(report.results[0].mac.as_deref(), Some(MAC));

    let state = router.state();
    let adds = state.adds();
    assert_eq!(adds.len(), 1);
    assert!(adds[0].contains(&("URL".to_owned(), "http://example.com".to_owned())));
    assert!(adds[0].contains(&("MACAddress".to_owned(), MAC.to_owned())));
    assert_eq!(state.rules.len(), 1);
}

#[tokio::test]
async fn test_all_resolves_without_host_lookup() {
    let router = Router::default();
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler
        .ensure_rules_present(&[DesiredRuleSpec::new("all", "ads.example")])
        .await
        .unwrap();
    assert!(report.is_success());

    let state = router.state();
    assert_eq!(state.host_reads, 0);
    let adds = state.adds();
    assert_eq!(adds.len(), 1);
    assert!(adds[0].contains(&("MACAddress".to_owned(), String::new())));
}

#[tokio::test]
async fn test_unresolved_identifier_is_skipped() {
    let router = Router::default().with_host("laptop", "192.168.0.10", MAC);
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let report = reconciler
        .ensure_rules_present(&[
            DesiredRuleSpec::new("tv", "example.com"),
            DesiredRuleSpec::new("LAPTOP", "example.com"),
        ])
        .await
        .unwrap();
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.succeeded(), 1);
    assert!(report.results[0].mac.is_none());

    let state = router.state();
    assert_eq!(state.host_reads, 1, "host table is read once per batch");
    assert_eq!(state.adds().len(), 1);
}

#[tokio::test]
async fn test_host_table_failure_aborts_batch() {
    let router = Router::default();
    router.state().hosts_unavailable = true;
    let (_server, client) = connect(&router).await;
    let reconciler = RuleReconciler::with_config(&client, fast_reconciler());

    let result = reconciler
        .ensure_rules_absent(&[DesiredRuleSpec::new("laptop", "example.com")])
        .await;
    assert!(matches!(result, Err(CoreError::Transport { .. })), "got: {result:?}");
    assert!(router.state().writes.is_empty());
}
