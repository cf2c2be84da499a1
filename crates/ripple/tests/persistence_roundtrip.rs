//! Snapshot persistence: round trips and resilient loading.

use chrono::{TimeZone, Utc};
use ripple::domain::{
    ChangeKind, EdgeAttrs, EntityId, EntityKind, NewEntity, Payload, RelationshipType, RiskLevel,
};
use ripple::engine::Engine;
use ripple::persistence::{self, LoadWarning};
use ripple::analysis::RiskConfig;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn sample_engine() -> Engine {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let engine = Engine::default();
    for (id, kind, title) in [
        ("F1", EntityKind::Feature, "Checkout"),
        ("D1", EntityKind::Document, "Checkout guide"),
        ("C1", EntityKind::TestCoverage, "Checkout coverage"),
        ("file-1", EntityKind::CodeFile, "checkout.rs"),
    ] {
        engine
            .ingest_entity(NewEntity::new(kind, title).with_id(id).updated_at(at))
            .unwrap();
    }
    engine
        .ingest_entity(
            NewEntity::new(EntityKind::Test, "Checkout e2e")
                .with_id("T1")
                .with_description("Drives the full checkout flow")
                .with_payload(
                    Payload::from_json(EntityKind::Test, json!({"test_type": "e2e"})).unwrap(),
                )
                .updated_at(at),
        )
        .unwrap();

    let id = EntityId::new;
    engine
        .ingest_relationship(&id("T1"), RelationshipType::Tests, &id("F1"), EdgeAttrs::new(RiskLevel::High, 0.8))
        .unwrap();
    engine
        .ingest_relationship(&id("F1"), RelationshipType::Documents, &id("D1"), EdgeAttrs::default())
        .unwrap();
    engine
        .ingest_relationship(&id("C1"), RelationshipType::Covers, &id("file-1"), EdgeAttrs::new(RiskLevel::Low, 0.5))
        .unwrap();
    engine
        .ingest_relationship(&id("F1"), RelationshipType::DependsOn, &id("file-1"), EdgeAttrs::default())
        .unwrap();
    engine
}

async fn reload(path: &Path) -> (Engine, Vec<LoadWarning>) {
    let (state, warnings) = persistence::load(path).await.unwrap();
    (Engine::new(state, RiskConfig::default()), warnings)
}

#[tokio::test]
async fn round_trip_preserves_entities_edges_and_analyses() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("graph.jsonl");
    let engine = sample_engine();

    persistence::save(&engine, &path).await.unwrap();
    let (reloaded, warnings) = reload(&path).await;

    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(reloaded.stats(), engine.stats());
    assert_eq!(
        reloaded.get_entity(&EntityId::new("T1")).unwrap(),
        engine.get_entity(&EntityId::new("T1")).unwrap()
    );

    let f1 = EntityId::new("F1");
    let before = engine.analyze_impact(&f1, ChangeKind::CodeChange, 3).unwrap();
    let after = reloaded.analyze_impact(&f1, ChangeKind::CodeChange, 3).unwrap();
    assert_eq!(before, after);

    // Saving the reloaded graph reproduces the same bytes
    let first = tokio::fs::read_to_string(&path).await.unwrap();
    persistence::save(&reloaded, &path).await.unwrap();
    let second = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(first, second);
    assert!(!temp_dir.path().join("graph.jsonl.tmp").exists());
}

#[tokio::test]
async fn bad_lines_are_skipped_with_warnings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("graph.jsonl");
    let content = [
        r#"{"record":"entity","id":"F1","kind":"feature","title":"Login","created_at":"2024-01-01T00:00:00Z","last_updated_at":"2024-01-01T00:00:00Z","payload":{"feature":{}}}"#,
        r#"{"record":"entity","id":"T1","kind":"test","title":"Login test","created_at":"2024-01-01T00:00:00Z","last_updated_at":"2024-01-01T00:00:00Z","payload":{"test":{}}}"#,
        "this is not json",
        r#"{"record":"entity","id":"X1","kind":"feature","title":"","created_at":"2024-01-01T00:00:00Z","last_updated_at":"2024-01-01T00:00:00Z","payload":{"feature":{}}}"#,
        "",
        r#"{"record":"relationship","source_id":"T1","type":"tests","target_id":"F1","risk_level":"high","weight":1.0}"#,
        r#"{"record":"relationship","source_id":"T1","type":"tests","target_id":"GONE","risk_level":"medium","weight":1.0}"#,
        r#"{"record":"relationship","source_id":"F1","type":"depends_on","target_id":"F1","risk_level":"medium","weight":1.0}"#,
    ]
    .join("\n");
    tokio::fs::write(&path, content).await.unwrap();

    let (engine, warnings) = reload(&path).await;

    assert_eq!(warnings.len(), 4, "{warnings:?}");
    assert!(matches!(warnings[0], LoadWarning::MalformedLine { line_number: 3, .. }));
    assert!(matches!(
        &warnings[1],
        LoadWarning::InvalidEntity { line_number: 4, entity_id, .. } if entity_id.as_str() == "X1"
    ));
    assert!(matches!(
        &warnings[2],
        LoadWarning::OrphanedRelationship { line_number: 7, missing } if missing.as_str() == "GONE"
    ));
    assert!(matches!(warnings[3], LoadWarning::InvalidRelationship { line_number: 8, .. }));

    assert_eq!(engine.stats().entities, 2);
    assert_eq!(engine.stats().relationships, 1);
    let tests = engine.recommend_tests(&EntityId::new("F1"), 3).unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].path[0].attrs.risk_level, RiskLevel::High);
}

#[tokio::test]
async fn inverse_only_records_are_rebuilt_in_both_directions() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("graph.jsonl");
    let content = [
        r#"{"record":"relationship","source_id":"D1","type":"described_by","target_id":"F1"}"#,
        r#"{"record":"entity","id":"F1","kind":"feature","title":"Login","created_at":"2024-01-01T00:00:00Z","last_updated_at":"2024-01-01T00:00:00Z","payload":{"feature":{}}}"#,
        r#"{"record":"entity","id":"D1","kind":"document","title":"Guide","created_at":"2024-01-01T00:00:00Z","last_updated_at":"2024-01-01T00:00:00Z","payload":{"document":{}}}"#,
    ]
    .join("\n");
    tokio::fs::write(&path, content).await.unwrap();

    let (engine, warnings) = reload(&path).await;

    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(engine.stats().relationships, 2);
    let details = engine.get_entity(&EntityId::new("F1")).unwrap();
    assert!(details
        .outgoing
        .iter()
        .any(|r| r.rel_type == RelationshipType::Documents && r.target_id.as_str() == "D1"));
}
