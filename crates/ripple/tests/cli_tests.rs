//! Integration tests for the ripple CLI.
//!
//! These tests run the built binary against temporary workspaces.

use rstest::{fixture, rstest};
use tempfile::TempDir;

mod common;
use common::{run_json, run_ripple_in_dir};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Provides a temporary directory with an initialized ripple workspace
#[fixture]
fn initialized_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let output = run_ripple_in_dir(temp.path(), &["init", "--quiet"]);
    assert!(
        output.status.success(),
        "Failed to initialize ripple: {:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    temp
}

/// Workspace holding F1 (feature), T1 tests F1 and F1 documents D1.
#[fixture]
fn login_dir(initialized_dir: TempDir) -> TempDir {
    let dir = initialized_dir.path();
    run_json(dir, &["add", "feature", "Login", "--id", "F1", "--updated-at", "2024-03-02"]);
    run_json(
        dir,
        &["add", "test", "Login test", "--id", "T1", "--payload", r#"{"test_type":"regression","execution_secs":3}"#],
    );
    run_json(dir, &["add", "document", "Login guide", "--id", "D1", "--updated-at", "2024-03-01"]);
    run_json(dir, &["link", "T1", "tests", "F1"]);
    run_json(dir, &["link", "F1", "documents", "D1"]);
    initialized_dir
}

// ============================================================================
// Help and init
// ============================================================================

#[test]
fn test_cli_help() {
    let temp = TempDir::new().unwrap();
    let output = run_ripple_in_dir(temp.path(), &["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ripple"));
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_command_outside_workspace_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_ripple_in_dir(temp.path(), &["stats"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ripple init"), "{stderr}");
}

#[rstest]
fn test_init_twice_fails(initialized_dir: TempDir) {
    let output = run_ripple_in_dir(initialized_dir.path(), &["init"]);
    assert!(!output.status.success());
}

// ============================================================================
// Mutations persist
// ============================================================================

#[rstest]
fn test_mutations_are_saved(login_dir: TempDir) {
    let stats = run_json(login_dir.path(), &["stats"]);
    assert_eq!(stats["entities"], 3);
    assert_eq!(stats["relationships"], 3);

    let snapshot = std::fs::read_to_string(login_dir.path().join(".ripple/graph.jsonl")).unwrap();
    assert_eq!(snapshot.lines().count(), 5);
}

#[rstest]
fn test_unlink_removes_both_halves(login_dir: TempDir) {
    let removed = run_json(login_dir.path(), &["unlink", "F1", "documents", "D1"]);
    assert_eq!(removed["removed"], true);

    let details = run_json(login_dir.path(), &["show", "D1"]);
    assert_eq!(details["incoming"].as_array().unwrap().len(), 0);
    assert_eq!(details["outgoing"].as_array().unwrap().len(), 0);
}

// ============================================================================
// Analyses
// ============================================================================

#[rstest]
fn test_impact_reports_test_and_stale_doc(login_dir: TempDir) {
    let report = run_json(login_dir.path(), &["impact", "F1", "--change", "feature_change"]);

    assert_eq!(report["affected_tests"][0]["id"], "T1");
    assert_eq!(report["affected_tests"][0]["distance"], 1);
    assert_eq!(report["affected_docs"][0]["id"], "D1");
    assert_eq!(report["risk_level"], "low");
}

#[rstest]
fn test_stale_document_carries_review(login_dir: TempDir) {
    let docs = run_json(login_dir.path(), &["stale", "F1"]);
    assert_eq!(docs[0]["id"], "D1");
    assert_eq!(docs[0]["review"]["days_behind"], 1);
    assert_eq!(docs[0]["review"]["priority"], "high");
}

#[rstest]
fn test_bug_scores_severity_by_features(login_dir: TempDir) {
    let dir = login_dir.path();
    run_json(dir, &["add", "bug", "Login crash", "--id", "B1", "--payload", r#"{"severity":"blocker"}"#]);
    run_json(dir, &["link", "B1", "blocks", "F1"]);

    let report = run_json(dir, &["bug", "B1"]);
    assert_eq!(report["severity"], "blocker");
    assert_eq!(report["impact_score"], 8);
    assert_eq!(report["priority"], "high");
    assert_eq!(report["estimated_fix_time"], "4-8 hours");
    assert_eq!(report["affected_features"][0]["id"], "F1");
}

#[rstest]
fn test_bug_on_non_bug_fails(login_dir: TempDir) {
    let output = run_ripple_in_dir(login_dir.path(), &["bug", "F1"]);
    assert!(!output.status.success());
}

#[rstest]
fn test_risk_builds_test_plan(login_dir: TempDir) {
    let report = run_json(login_dir.path(), &["risk", "F1"]);
    assert_eq!(report["test_plan"]["regression_tests"], 1);
    assert_eq!(report["test_plan"]["estimated_secs"], 3.0);
}

#[rstest]
fn test_text_output_without_json(login_dir: TempDir) {
    let output = run_ripple_in_dir(login_dir.path(), &["tests", "F1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Recommended tests (1):"), "{stdout}");
    assert!(stdout.contains("F1 <-tests- T1"), "{stdout}");
}

#[rstest]
fn test_unknown_entity_fails(login_dir: TempDir) {
    let output = run_ripple_in_dir(login_dir.path(), &["impact", "NOPE"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("NOPE"));
}

// ============================================================================
// Generic dispatch
// ============================================================================

#[rstest]
fn test_call_dispatches_and_saves(login_dir: TempDir) {
    let dir = login_dir.path();
    let output = run_ripple_in_dir(
        dir,
        &["call", "ingest_entity", r#"{"id":"B1","kind":"bug","title":"Login loops"}"#],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let created: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(created["entity_id"], "B1");

    let hits = run_json(dir, &["search", "loops"]);
    assert_eq!(hits[0]["id"], "B1");
}

#[rstest]
fn test_call_list(initialized_dir: TempDir) {
    let output = run_ripple_in_dir(initialized_dir.path(), &["call", "--list"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("analyze_impact"));
    assert!(stdout.contains("ingest_entity (mutating)"));
}
