//! Name-keyed operation registry.
//!
//! Host layers that receive operations as data (the CLI `call` command,
//! scripted batch jobs) look handlers up by name and pass JSON arguments.
//! Each handler parses its own typed parameters and returns JSON.
//!
//! ```
//! use ripple::dispatch::Registry;
//! use ripple::engine::Engine;
//! use serde_json::json;
//!
//! let engine = Engine::default();
//! let registry = Registry::standard(3);
//! let id = registry.call(&engine, "ingest_entity", json!({"kind": "feature", "title": "Login"}))?;
//! assert!(id["entity_id"].as_str().unwrap().starts_with("feat-"));
//! # Ok::<(), ripple::error::Error>(())
//! ```

use crate::domain::{
    ChangeKind, EdgeAttrs, EntityId, EntityKind, NewEntity, Payload, RelationshipType, RiskLevel,
};
use crate::engine::Engine;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

/// Context passed to every handler.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Engine to operate on
    pub engine: &'a Engine,
    /// Depth used when the arguments give none
    pub default_depth: usize,
}

/// An operation handler.
pub type Handler = fn(&Invocation<'_>, Value) -> Result<Value>;

/// Operations that change the graph.
pub const MUTATING_OPERATIONS: &[&str] =
    &["ingest_entity", "ingest_relationship", "remove_relationship"];

/// Flat map from operation name to handler.
#[derive(Debug, Clone)]
pub struct Registry {
    handlers: BTreeMap<&'static str, Handler>,
    default_depth: usize,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new(default_depth: usize) -> Self {
        Self {
            handlers: BTreeMap::new(),
            default_depth,
        }
    }

    /// Registry with every engine operation.
    #[must_use]
    pub fn standard(default_depth: usize) -> Self {
        let mut registry = Self::new(default_depth);
        registry.register("ingest_entity", ingest_entity);
        registry.register("ingest_relationship", ingest_relationship);
        registry.register("remove_relationship", remove_relationship);
        registry.register("get_entity", get_entity);
        registry.register("analyze_impact", analyze_impact);
        registry.register("analyze_bug_impact", analyze_bug_impact);
        registry.register("recommend_tests", recommend_tests);
        registry.register("stale_documents", stale_documents);
        registry.register("related_entities", related_entities);
        registry.register("assess_regression_risk", assess_regression_risk);
        registry.register("search", search);
        registry.register("stats", stats);
        registry
    }

    /// Add or replace a handler.
    pub fn register(&mut self, name: &'static str, handler: Handler) {
        self.handlers.insert(name, handler);
    }

    /// Registered operation names, sorted.
    pub fn operations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Whether `name` changes the graph.
    #[must_use]
    pub fn is_mutating(name: &str) -> bool {
        MUTATING_OPERATIONS.contains(&name)
    }

    /// Run the operation `name` with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for an unknown operation or bad
    /// arguments, otherwise whatever the operation returns.
    pub fn call(&self, engine: &Engine, name: &str, args: Value) -> Result<Value> {
        let handler = self.handlers.get(name).ok_or_else(|| {
            Error::Validation(format!(
                "unknown operation '{name}'. Available: {}",
                self.operations().collect::<Vec<_>>().join(", ")
            ))
        })?;
        debug!(operation = name, "Dispatching");
        let invocation = Invocation {
            engine,
            default_depth: self.default_depth,
        };
        handler(&invocation, args)
    }
}

fn params<T: DeserializeOwned>(args: Value) -> Result<T> {
    // Operations without arguments accept null as well as {}
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| Error::Validation(format!("invalid arguments: {e}")))
}

fn parse_ids(ids: &[String]) -> Vec<EntityId> {
    ids.iter().map(|s| EntityId::new(s.trim())).collect()
}

#[derive(Deserialize)]
struct IngestEntityParams {
    id: Option<String>,
    kind: String,
    title: String,
    description: Option<String>,
    #[serde(default)]
    payload: Value,
    updated_at: Option<DateTime<Utc>>,
}

fn ingest_entity(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: IngestEntityParams = params(args)?;
    let kind: EntityKind = p.kind.parse()?;
    let new = NewEntity {
        id: p.id.map(EntityId::from),
        kind,
        title: p.title,
        description: p.description,
        payload: Some(Payload::from_json(kind, p.payload)?),
        updated_at: p.updated_at,
    };
    let id = inv.engine.ingest_entity(new)?;
    Ok(json!({ "entity_id": id }))
}

#[derive(Deserialize)]
struct RelationshipParams {
    source_id: String,
    #[serde(alias = "type")]
    rel_type: String,
    target_id: String,
    risk_level: Option<String>,
    weight: Option<f64>,
}

fn ingest_relationship(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: RelationshipParams = params(args)?;
    let rel_type: RelationshipType = p.rel_type.parse()?;
    let risk_level = match p.risk_level.as_deref() {
        Some(level) => level.parse::<RiskLevel>()?,
        None => RiskLevel::default(),
    };
    let attrs = EdgeAttrs::new(risk_level, p.weight.unwrap_or(1.0));
    let created = inv.engine.ingest_relationship(
        &EntityId::new(p.source_id),
        rel_type,
        &EntityId::new(p.target_id),
        attrs,
    )?;
    Ok(json!({ "ok": true, "created": created }))
}

fn remove_relationship(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: RelationshipParams = params(args)?;
    let rel_type: RelationshipType = p.rel_type.parse()?;
    let removed = inv.engine.remove_relationship(
        &EntityId::new(p.source_id),
        rel_type,
        &EntityId::new(p.target_id),
    );
    Ok(json!({ "ok": true, "removed": removed }))
}

#[derive(Deserialize)]
struct EntityParams {
    entity_id: String,
    max_depth: Option<usize>,
}

fn get_entity(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: EntityParams = params(args)?;
    Ok(serde_json::to_value(inv.engine.get_entity(&EntityId::new(p.entity_id))?)?)
}

#[derive(Deserialize)]
struct AnalyzeImpactParams {
    entity_id: String,
    change_kind: String,
    max_depth: Option<usize>,
    changed_at: Option<DateTime<Utc>>,
}

fn analyze_impact(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: AnalyzeImpactParams = params(args)?;
    let change_kind: ChangeKind = p.change_kind.parse()?;
    let report = inv.engine.analyze_impact_at(
        &EntityId::new(p.entity_id),
        change_kind,
        p.max_depth.unwrap_or(inv.default_depth),
        p.changed_at,
    )?;
    Ok(serde_json::to_value(report)?)
}

fn analyze_bug_impact(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: EntityParams = params(args)?;
    let report = inv.engine.analyze_bug_impact(
        &EntityId::new(p.entity_id),
        p.max_depth.unwrap_or(inv.default_depth),
    )?;
    Ok(serde_json::to_value(report)?)
}

fn recommend_tests(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: EntityParams = params(args)?;
    let tests = inv.engine.recommend_tests(
        &EntityId::new(p.entity_id),
        p.max_depth.unwrap_or(inv.default_depth),
    )?;
    Ok(serde_json::to_value(tests)?)
}

#[derive(Deserialize)]
struct StaleDocumentsParams {
    entity_id: String,
    since: Option<DateTime<Utc>>,
    max_depth: Option<usize>,
}

fn stale_documents(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: StaleDocumentsParams = params(args)?;
    let docs = inv.engine.stale_documents(
        &EntityId::new(p.entity_id),
        p.since,
        p.max_depth.unwrap_or(inv.default_depth),
    )?;
    Ok(serde_json::to_value(docs)?)
}

fn related_entities(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: EntityParams = params(args)?;
    let related = inv
        .engine
        .related_entities(&EntityId::new(p.entity_id), p.max_depth.unwrap_or(2))?;
    Ok(serde_json::to_value(related)?)
}

#[derive(Deserialize)]
struct RegressionParams {
    entity_ids: Vec<String>,
    max_depth: Option<usize>,
}

fn assess_regression_risk(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: RegressionParams = params(args)?;
    if p.entity_ids.is_empty() {
        return Err(Error::Validation("entity_ids cannot be empty".to_string()));
    }
    let report = inv.engine.assess_regression_risk(
        &parse_ids(&p.entity_ids),
        p.max_depth.unwrap_or(inv.default_depth),
    )?;
    Ok(serde_json::to_value(report)?)
}

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    limit: Option<usize>,
}

fn search(inv: &Invocation<'_>, args: Value) -> Result<Value> {
    let p: SearchParams = params(args)?;
    Ok(serde_json::to_value(inv.engine.search(&p.query, p.limit.unwrap_or(10)))?)
}

fn stats(inv: &Invocation<'_>, _args: Value) -> Result<Value> {
    Ok(serde_json::to_value(inv.engine.stats())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn setup() -> (Engine, Registry) {
        (Engine::default(), Registry::standard(3))
    }

    #[test]
    fn test_unknown_operation() {
        let (engine, registry) = setup();
        let err = registry.call(&engine, "teleport", Value::Null).unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("teleport")));
    }

    #[test]
    fn test_round_trip_through_registry() {
        let (engine, registry) = setup();
        registry
            .call(&engine, "ingest_entity", json!({"id": "F1", "kind": "feature", "title": "Login"}))
            .unwrap();
        registry
            .call(
                &engine,
                "ingest_entity",
                json!({"id": "T1", "kind": "test", "title": "Login test", "payload": {"test_type": "unit"}}),
            )
            .unwrap();
        let linked = registry
            .call(
                &engine,
                "ingest_relationship",
                json!({"source_id": "T1", "type": "tests", "target_id": "F1"}),
            )
            .unwrap();
        assert_eq!(linked["created"], true);

        let tests = registry
            .call(&engine, "recommend_tests", json!({"entity_id": "F1"}))
            .unwrap();
        assert_eq!(tests[0]["id"], "T1");
        assert_eq!(tests[0]["distance"], 1);
    }

    #[test]
    fn test_bug_impact_through_registry() {
        let (engine, registry) = setup();
        for args in [
            json!({"id": "B1", "kind": "bug", "title": "Crash on login", "payload": {"severity": "critical"}}),
            json!({"id": "F1", "kind": "feature", "title": "Login"}),
        ] {
            registry.call(&engine, "ingest_entity", args).unwrap();
        }
        registry
            .call(
                &engine,
                "ingest_relationship",
                json!({"source_id": "B1", "type": "blocks", "target_id": "F1"}),
            )
            .unwrap();

        let report = registry
            .call(&engine, "analyze_bug_impact", json!({"entity_id": "B1"}))
            .unwrap();
        assert_eq!(report["severity"], "critical");
        assert_eq!(report["impact_score"], 6);
        assert_eq!(report["priority"], "medium");
        assert_eq!(report["estimated_fix_time"], "2-4 hours");
        assert_eq!(report["affected_features"][0]["id"], "F1");
    }

    #[rstest]
    #[case::bad_kind(json!({"kind": "spaceship", "title": "x"}))]
    #[case::missing_title(json!({"kind": "feature"}))]
    #[case::bad_payload(json!({"kind": "bug", "title": "x", "payload": {"severity": "apocalyptic"}}))]
    fn test_ingest_entity_validation(#[case] args: Value) {
        let (engine, registry) = setup();
        let err = registry.call(&engine, "ingest_entity", args).unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {err}");
        assert_eq!(engine.stats().entities, 0);
    }

    #[test]
    fn test_mutating_operations_are_registered() {
        let registry = Registry::standard(3);
        let ops: Vec<_> = registry.operations().collect();
        for op in MUTATING_OPERATIONS {
            assert!(ops.contains(op));
            assert!(Registry::is_mutating(op));
        }
        assert!(!Registry::is_mutating("search"));
    }
}
