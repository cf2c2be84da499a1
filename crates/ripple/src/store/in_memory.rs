use super::EntityStore;
use crate::domain::{Entity, EntityId};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Entity store backed by an ordered map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntityStore {
    entities: BTreeMap<EntityId, Entity>,
}

impl InMemoryEntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn put(&mut self, entity: Entity) -> Result<()> {
        entity.validate()?;
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    fn get(&self, id: &EntityId) -> Result<&Entity> {
        self.entities
            .get(id)
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn exists(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        Box::new(self.entities.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, Payload};
    use chrono::Utc;

    fn entity(id: &str, title: &str) -> Entity {
        let now = Utc::now();
        Entity {
            id: EntityId::new(id),
            kind: EntityKind::Feature,
            title: title.to_string(),
            description: None,
            created_at: now,
            last_updated_at: now,
            payload: Payload::empty(EntityKind::Feature),
        }
    }

    #[test]
    fn test_put_get_and_overwrite() {
        let mut store = InMemoryEntityStore::new();
        store.put(entity("feat-1", "First")).unwrap();
        store.put(entity("feat-1", "Renamed")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&EntityId::new("feat-1")).unwrap().title, "Renamed");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = InMemoryEntityStore::new();
        let err = store.get(&EntityId::new("feat-9")).unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id.as_str() == "feat-9"));
        assert!(!store.exists(&EntityId::new("feat-9")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_put_rejects_malformed_entity() {
        let mut store = InMemoryEntityStore::new();
        let result = store.put(entity("feat-1", ""));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_iter_is_ordered_by_id() {
        let mut store = InMemoryEntityStore::new();
        for id in ["feat-c", "feat-a", "feat-b"] {
            store.put(entity(id, "x")).unwrap();
        }
        let ids: Vec<_> = store.iter().map(|e| e.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["feat-a", "feat-b", "feat-c"]);
    }
}
