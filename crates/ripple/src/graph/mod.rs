//! Owned graph state and traversal primitives.
//!
//! [`GraphState`] pairs an [`EntityStore`] with a [`RelationshipIndex`] and
//! performs the validated mutations of both. The traversal functions in
//! [`traversal`] hold no state of their own and only read the two stores.

pub mod traversal;

pub use traversal::{PathStep, Reached, bounded_reach};

use crate::domain::{
    Direction, EdgeAttrs, Entity, EntityId, NewEntity, Payload, RelationshipType,
    RelationshipTypeSet,
};
use crate::error::{Error, Result};
use crate::id_generation::IdGenerator;
use crate::store::{EntityStore, InMemoryEntityStore, RelationshipIndex};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Entity store plus relationship index.
#[derive(Debug)]
pub struct GraphState {
    entities: Box<dyn EntityStore>,
    index: RelationshipIndex,
    ids: IdGenerator,
}

impl Default for GraphState {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphState {
    /// Empty state backed by an [`InMemoryEntityStore`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Box::new(InMemoryEntityStore::new()))
    }

    /// State over an existing entity store. Its IDs are reserved so that
    /// generated IDs never collide with them.
    #[must_use]
    pub fn with_store(entities: Box<dyn EntityStore>) -> Self {
        let mut ids = IdGenerator::new();
        for entity in entities.iter() {
            ids.register_id(entity.id.clone());
        }
        Self {
            entities,
            index: RelationshipIndex::new(),
            ids,
        }
    }

    /// Read access to the entity store.
    #[must_use]
    pub fn entities(&self) -> &dyn EntityStore {
        self.entities.as_ref()
    }

    /// Read access to the relationship index.
    #[must_use]
    pub fn index(&self) -> &RelationshipIndex {
        &self.index
    }

    /// Create an entity, or refine an existing one with the same ID.
    ///
    /// Refinement replaces the title, and the description and payload when
    /// given. `created_at` is kept and `last_updated_at` moves to
    /// `new.updated_at` (or `now`).
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the entity is malformed or a refinement
    /// tries to change the kind of an existing entity.
    pub fn ingest_entity(&mut self, new: NewEntity, now: DateTime<Utc>) -> Result<EntityId> {
        new.validate()?;
        let updated_at = new.updated_at.unwrap_or(now);

        if let Some(id) = &new.id {
            validate_id(id)?;
            if let Ok(existing) = self.entities.get(id) {
                if existing.kind != new.kind {
                    return Err(Error::Validation(format!(
                        "entity {id} is a {}, cannot re-ingest it as a {}",
                        existing.kind, new.kind
                    )));
                }
                let refined = Entity {
                    id: id.clone(),
                    kind: existing.kind,
                    title: new.title,
                    description: new.description.or_else(|| existing.description.clone()),
                    created_at: existing.created_at,
                    last_updated_at: updated_at,
                    payload: new.payload.unwrap_or_else(|| existing.payload.clone()),
                };
                self.entities.put(refined)?;
                debug!(%id, "Refined entity");
                return Ok(id.clone());
            }
        }

        let mut entity = Entity {
            id: new.id.clone().unwrap_or_else(|| EntityId::new("")),
            kind: new.kind,
            title: new.title,
            description: new.description,
            created_at: updated_at,
            last_updated_at: updated_at,
            payload: new.payload.unwrap_or_else(|| Payload::empty(new.kind)),
        };
        if new.id.is_none() {
            entity.id = self
                .ids
                .generate(entity.kind, &entity.title, entity.description.as_deref())?;
        }

        let id = entity.id.clone();
        self.entities.put(entity)?;
        self.ids.register_id(id.clone());
        debug!(%id, "Ingested entity");
        Ok(id)
    }

    /// Insert a fully-formed entity, keeping its timestamps.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the entity is malformed.
    pub fn restore_entity(&mut self, entity: Entity) -> Result<()> {
        validate_id(&entity.id)?;
        let id = entity.id.clone();
        self.entities.put(entity)?;
        self.ids.register_id(id);
        Ok(())
    }

    /// Add or update a relationship. See [`RelationshipIndex::add`].
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` or `Error::InvalidEdge`.
    pub fn ingest_relationship(
        &mut self,
        source: &EntityId,
        rel_type: RelationshipType,
        target: &EntityId,
        attrs: EdgeAttrs,
    ) -> Result<bool> {
        self.index
            .add(self.entities.as_ref(), source, rel_type, target, attrs)
    }

    /// Remove a relationship and its inverse. A no-op if absent.
    pub fn remove_relationship(
        &mut self,
        source: &EntityId,
        rel_type: RelationshipType,
        target: &EntityId,
    ) -> bool {
        self.index.remove(source, rel_type, target)
    }

    /// [`bounded_reach`] over this state.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `start` does not exist.
    pub fn reach(
        &self,
        start: &EntityId,
        max_depth: usize,
        types: Option<RelationshipTypeSet>,
        direction: Direction,
    ) -> Result<Vec<Reached>> {
        bounded_reach(
            self.entities.as_ref(),
            &self.index,
            start,
            max_depth,
            types,
            direction,
        )
    }
}

fn validate_id(id: &EntityId) -> Result<()> {
    let raw = id.as_str();
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(Error::Validation(format!(
            "invalid entity id '{raw}': must be non-empty and contain no whitespace"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, FeaturePayload};
    use chrono::Duration;

    #[test]
    fn test_ingest_generates_prefixed_id() {
        let mut state = GraphState::new();
        let id = state
            .ingest_entity(NewEntity::new(EntityKind::Bug, "Crash on save"), Utc::now())
            .unwrap();
        assert!(id.as_str().starts_with("bug-"));
        assert!(state.entities().exists(&id));
    }

    #[test]
    fn test_reingest_refines_and_keeps_created_at() {
        let mut state = GraphState::new();
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(1);

        state
            .ingest_entity(NewEntity::new(EntityKind::Feature, "Login").with_id("feat-1"), t0)
            .unwrap();
        let payload = Payload::Feature(FeaturePayload {
            module: Some("auth".to_string()),
            ..FeaturePayload::default()
        });
        state
            .ingest_entity(
                NewEntity::new(EntityKind::Feature, "Login v2")
                    .with_id("feat-1")
                    .with_payload(payload.clone()),
                t1,
            )
            .unwrap();

        let entity = state.entities().get(&EntityId::new("feat-1")).unwrap();
        assert_eq!(entity.title, "Login v2");
        assert_eq!(entity.created_at, t0);
        assert_eq!(entity.last_updated_at, t1);
        assert_eq!(entity.payload, payload);
        assert_eq!(state.entities().len(), 1);
    }

    #[test]
    fn test_reingest_with_other_kind_rejected() {
        let mut state = GraphState::new();
        let now = Utc::now();
        state
            .ingest_entity(NewEntity::new(EntityKind::Feature, "Login").with_id("x-1"), now)
            .unwrap();
        let err = state
            .ingest_entity(NewEntity::new(EntityKind::Bug, "Login").with_id("x-1"), now)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_whitespace_id_rejected() {
        let mut state = GraphState::new();
        let err = state
            .ingest_entity(NewEntity::new(EntityKind::Feature, "Login").with_id("feat 1"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(state.entities().is_empty());
    }
}
