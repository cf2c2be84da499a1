//! The engine handle.
//!
//! [`Engine`] is a cheap-to-clone handle around a single owned
//! [`GraphState`] behind a reader-writer lock. Mutations take the write lock
//! and validate before writing, so a reader never sees a paired edge without
//! its inverse. Analyses take the read lock and may run in parallel.
//!
//! # Example
//!
//! ```
//! use ripple::domain::{ChangeKind, EdgeAttrs, EntityKind, NewEntity, RelationshipType};
//! use ripple::engine::Engine;
//!
//! let engine = Engine::default();
//! let feature = engine.ingest_entity(NewEntity::new(EntityKind::Feature, "Login"))?;
//! let test = engine.ingest_entity(NewEntity::new(EntityKind::Test, "Login test"))?;
//! engine.ingest_relationship(&test, RelationshipType::Tests, &feature, EdgeAttrs::default())?;
//!
//! let report = engine.analyze_impact(&feature, ChangeKind::FeatureChange, 3)?;
//! assert_eq!(report.affected_tests.len(), 1);
//! # Ok::<(), ripple::error::Error>(())
//! ```

use crate::analysis::{
    self, BugImpactReport, ImpactItem, ImpactReport, RegressionReport, RiskConfig,
};
use crate::domain::{
    ChangeKind, Direction, EdgeAttrs, Entity, EntityId, NewEntity, Relationship, RelationshipType,
};
use crate::error::Result;
use crate::graph::GraphState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Bounds for `related_entities` depth.
pub const RELATED_DEPTH_RANGE: (usize, usize) = (1, 5);

/// Bounds for `search` result counts.
pub const SEARCH_LIMIT_RANGE: (usize, usize) = (1, 50);

/// An entity together with the edges that touch it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDetails {
    /// The entity
    #[serde(flatten)]
    pub entity: Entity,

    /// Edges leaving the entity
    pub outgoing: Vec<Relationship>,

    /// Edges entering the entity
    pub incoming: Vec<Relationship>,
}

/// Counts describing the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    /// Number of entities
    pub entities: usize,
    /// Number of stored edges, counting both halves of paired types
    pub relationships: usize,
}

/// Cloneable handle to the shared graph state.
#[derive(Debug, Clone)]
pub struct Engine {
    state: Arc<RwLock<GraphState>>,
    risk: Arc<RiskConfig>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(GraphState::new(), RiskConfig::default())
    }
}

impl Engine {
    /// Wrap an existing state with the given risk configuration.
    #[must_use]
    pub fn new(state: GraphState, risk: RiskConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            risk: Arc::new(risk),
        }
    }

    /// The risk configuration in use.
    #[must_use]
    pub fn risk_config(&self) -> &RiskConfig {
        &self.risk
    }

    // A panic while holding the lock cannot leave a half-applied mutation
    // because every mutation validates before writing.
    fn read(&self) -> RwLockReadGuard<'_, GraphState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Run `f` with read access to the state.
    pub fn with_state<R>(&self, f: impl FnOnce(&GraphState) -> R) -> R {
        f(&self.read())
    }

    /// Create or refine an entity and return its ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the entity is malformed.
    pub fn ingest_entity(&self, new: NewEntity) -> Result<EntityId> {
        let id = self.write().ingest_entity(new, Utc::now())?;
        info!(%id, "Entity ingested");
        Ok(id)
    }

    /// Add or update a relationship. Returns `true` if it was new.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for a missing endpoint or
    /// `Error::InvalidEdge` for a disallowed self-loop or bad attributes.
    pub fn ingest_relationship(
        &self,
        source: &EntityId,
        rel_type: RelationshipType,
        target: &EntityId,
        attrs: EdgeAttrs,
    ) -> Result<bool> {
        let created = self
            .write()
            .ingest_relationship(source, rel_type, target, attrs)?;
        info!(%source, %rel_type, %target, created, "Relationship ingested");
        Ok(created)
    }

    /// Remove a relationship and its inverse. Returns whether it existed.
    pub fn remove_relationship(
        &self,
        source: &EntityId,
        rel_type: RelationshipType,
        target: &EntityId,
    ) -> bool {
        self.write().remove_relationship(source, rel_type, target)
    }

    /// Fetch an entity with its incoming and outgoing edges.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn get_entity(&self, id: &EntityId) -> Result<EntityDetails> {
        let state = self.read();
        let entity = state.entities().get(id)?.clone();
        let edges = |direction| {
            let mut edges: Vec<Relationship> = state
                .index()
                .neighbors(id, None, direction)
                .map(|n| {
                    let (source_id, target_id) = if direction == Direction::Outgoing {
                        (id.clone(), n.other_id.clone())
                    } else {
                        (n.other_id.clone(), id.clone())
                    };
                    Relationship {
                        source_id,
                        rel_type: n.rel_type,
                        target_id,
                        attrs: n.attrs,
                    }
                })
                .collect();
            edges.sort_by(|a, b| {
                (a.rel_type.as_str(), &a.source_id, &a.target_id)
                    .cmp(&(b.rel_type.as_str(), &b.source_id, &b.target_id))
            });
            edges
        };
        Ok(EntityDetails {
            outgoing: edges(Direction::Outgoing),
            incoming: edges(Direction::Incoming),
            entity,
        })
    }

    /// Impact of a change to `id`, compared against its `last_updated_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn analyze_impact(
        &self,
        id: &EntityId,
        change_kind: ChangeKind,
        max_depth: usize,
    ) -> Result<ImpactReport> {
        self.analyze_impact_at(id, change_kind, max_depth, None)
    }

    /// Impact of a change to `id` made at `changed_at`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn analyze_impact_at(
        &self,
        id: &EntityId,
        change_kind: ChangeKind,
        max_depth: usize,
        changed_at: Option<DateTime<Utc>>,
    ) -> Result<ImpactReport> {
        analysis::analyze_impact(&self.read(), &self.risk, id, change_kind, max_depth, changed_at)
    }

    /// Tests to run after changing `id`, closest first.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn recommend_tests(&self, id: &EntityId, max_depth: usize) -> Result<Vec<ImpactItem>> {
        analysis::recommend_tests(&self.read(), id, max_depth)
    }

    /// Documents around `id` last updated before `since`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn stale_documents(
        &self,
        id: &EntityId,
        since: Option<DateTime<Utc>>,
        max_depth: usize,
    ) -> Result<Vec<ImpactItem>> {
        analysis::stale_documents(&self.read(), id, since, max_depth)
    }

    /// Everything reachable from `id` through any relationship, either way.
    ///
    /// `max_depth` is clamped to [`RELATED_DEPTH_RANGE`].
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist.
    pub fn related_entities(&self, id: &EntityId, max_depth: usize) -> Result<Vec<ImpactItem>> {
        let depth = max_depth.clamp(RELATED_DEPTH_RANGE.0, RELATED_DEPTH_RANGE.1);
        let state = self.read();
        let reached = state.reach(id, depth, None, Direction::Both)?;
        Ok(reached
            .into_iter()
            .filter_map(|r| {
                let entity = state.entities().get(&r.id).ok()?;
                Some(ImpactItem {
                    kind: entity.kind,
                    title: entity.title.clone(),
                    id: r.id,
                    distance: r.distance,
                    path: r.path,
                    review: None,
                })
            })
            .collect())
    }

    /// Severity-weighted impact of the bug `id`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `id` does not exist and
    /// `Error::Validation` if it is not a bug.
    pub fn analyze_bug_impact(&self, id: &EntityId, max_depth: usize) -> Result<BugImpactReport> {
        analysis::analyze_bug_impact(&self.read(), &self.risk, id, max_depth)
    }

    /// Combined risk of changing several entities.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for the first unknown ID.
    pub fn assess_regression_risk(
        &self,
        changed: &[EntityId],
        max_depth: usize,
    ) -> Result<RegressionReport> {
        analysis::assess_regression_risk(&self.read(), &self.risk, changed, max_depth)
    }

    /// Entities whose title or description contains `query`, ordered by ID.
    ///
    /// `limit` is clamped to [`SEARCH_LIMIT_RANGE`].
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<Entity> {
        let limit = limit.clamp(SEARCH_LIMIT_RANGE.0, SEARCH_LIMIT_RANGE.1);
        let query = query.trim();
        self.read()
            .entities()
            .iter()
            .filter(|e| e.matches(query))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Entity and edge counts.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let state = self.read();
        GraphStats {
            entities: state.entities().len(),
            relationships: state.index().edge_count(),
        }
    }
}
