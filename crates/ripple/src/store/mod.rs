//! Storage for the two halves of the graph.
//!
//! Entities live behind the [`EntityStore`] trait so alternative backends can
//! be plugged in; [`InMemoryEntityStore`] is the default. Edge structure is
//! owned by the [`RelationshipIndex`], a petgraph `DiGraph` keyed by
//! [`EntityId`].
//!
//! # Architecture
//!
//! The two stores never reference each other. Operations that need both
//! (adding an edge checks that its endpoints exist) receive the entity store
//! as an argument, which keeps the ownership split explicit: the entity store
//! owns identity and attribute mutation, the index owns edge existence.

mod in_memory;
mod index;

pub use in_memory::InMemoryEntityStore;
pub use index::{Neighbor, Neighbors, RelationshipIndex};

use crate::domain::{Entity, EntityId};
use crate::error::Result;

/// Keyed collection of entities.
///
/// Implementations must be thread-safe (`Send + Sync`); the engine shares a
/// single store between concurrent readers behind a lock.
pub trait EntityStore: Send + Sync + std::fmt::Debug {
    /// Insert or overwrite an entity by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the entity is malformed.
    fn put(&mut self, entity: Entity) -> Result<()>;

    /// Fetch an entity by ID.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no entity has this ID.
    fn get(&self, id: &EntityId) -> Result<&Entity>;

    /// Non-failing existence probe.
    fn exists(&self, id: &EntityId) -> bool;

    /// Number of stored entities.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entities in ascending ID order.
    fn iter(&self) -> Box<dyn Iterator<Item = &Entity> + '_>;
}
