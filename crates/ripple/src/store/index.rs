//! Typed edge index using petgraph.
//!
//! Edge direction in the graph is the direction of the relationship as
//! ingested: `A --depends_on--> B` is stored as an edge from `A` to `B`.
//! Paired types are stored twice, once per direction, and both halves are
//! always added and removed together.

use super::EntityStore;
use crate::domain::{Direction, EdgeAttrs, EntityId, Relationship, RelationshipType, RelationshipTypeSet};
use crate::error::{Error, Result};
use petgraph::Direction as EdgeDirection;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct EdgeData {
    rel_type: RelationshipType,
    attrs: EdgeAttrs,
}

/// Adjacency structure over typed, directed edges.
#[derive(Debug, Default, Clone)]
pub struct RelationshipIndex {
    /// Nodes hold entity IDs, edges hold the relationship type and attributes.
    graph: DiGraph<EntityId, EdgeData>,

    /// Lookup from entity ID to graph node. A node exists only once the
    /// entity takes part in at least one edge.
    node_map: HashMap<EntityId, NodeIndex>,
}

impl RelationshipIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, or update the attributes of an existing one.
    ///
    /// For paired types the inverse edge is written with the same
    /// attributes. All checks run before anything is written.
    ///
    /// Returns `true` if a new edge was created, `false` on update.
    ///
    /// # Errors
    ///
    /// - `Error::NotFound` if either endpoint is missing from `entities`
    /// - `Error::InvalidEdge` on a disallowed self-loop or invalid attributes
    pub fn add(
        &mut self,
        entities: &dyn EntityStore,
        source: &EntityId,
        rel_type: RelationshipType,
        target: &EntityId,
        attrs: EdgeAttrs,
    ) -> Result<bool> {
        for id in [source, target] {
            if !entities.exists(id) {
                return Err(Error::NotFound(id.clone()));
            }
        }
        if source == target && !rel_type.allows_self_loop() {
            return Err(Error::invalid_edge(
                source,
                rel_type,
                target,
                "self-loops are only allowed for related_to",
            ));
        }
        if let Some(reason) = attrs.problem() {
            return Err(Error::invalid_edge(source, rel_type, target, reason));
        }

        let created = self.upsert(source, rel_type, target, attrs);
        if let Some(inverse) = rel_type.inverse() {
            self.upsert(target, inverse, source, attrs);
        }

        debug!(%source, %rel_type, %target, created, "Indexed relationship");
        Ok(created)
    }

    /// Remove an edge and, for paired types, its inverse.
    ///
    /// Removing an absent edge is a no-op. Returns whether anything was removed.
    pub fn remove(&mut self, source: &EntityId, rel_type: RelationshipType, target: &EntityId) -> bool {
        let removed = self.remove_one(source, rel_type, target);
        if let Some(inverse) = rel_type.inverse() {
            self.remove_one(target, inverse, source);
        }
        if removed {
            debug!(%source, %rel_type, %target, "Removed relationship");
        }
        removed
    }

    /// Attributes of the edge `source --rel_type--> target`, if present.
    #[must_use]
    pub fn get(&self, source: &EntityId, rel_type: RelationshipType, target: &EntityId) -> Option<EdgeAttrs> {
        self.find(source, rel_type, target)
            .map(|e| self.graph[e].attrs)
    }

    /// Edges touching `id`, filtered by type and direction.
    ///
    /// The iterator is lazy and can be cloned to restart from the current
    /// position. An entity without edges yields nothing.
    #[must_use]
    pub fn neighbors(
        &self,
        id: &EntityId,
        types: Option<RelationshipTypeSet>,
        direction: Direction,
    ) -> Neighbors<'_> {
        let node = self.node_map.get(id).copied();
        let first = |dir| node.and_then(|n| self.graph.first_edge(n, dir));
        Neighbors {
            graph: &self.graph,
            types: types.unwrap_or_else(RelationshipTypeSet::all),
            outgoing: match direction {
                Direction::Outgoing | Direction::Both => first(EdgeDirection::Outgoing),
                Direction::Incoming => None,
            },
            incoming: match direction {
                Direction::Incoming | Direction::Both => first(EdgeDirection::Incoming),
                Direction::Outgoing => None,
            },
        }
    }

    /// Every stored edge, including both halves of paired types.
    pub fn relationships(&self) -> impl Iterator<Item = Relationship> + '_ {
        self.graph.edge_references().map(|e| Relationship {
            source_id: self.graph[e.source()].clone(),
            rel_type: e.weight().rel_type,
            target_id: self.graph[e.target()].clone(),
            attrs: e.weight().attrs,
        })
    }

    /// Number of stored edges, counting both halves of paired types.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn node(&mut self, id: &EntityId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id.clone(), node);
        node
    }

    fn find(&self, source: &EntityId, rel_type: RelationshipType, target: &EntityId) -> Option<EdgeIndex> {
        let from = *self.node_map.get(source)?;
        let to = *self.node_map.get(target)?;
        self.graph
            .edges_connecting(from, to)
            .find(|e| e.weight().rel_type == rel_type)
            .map(|e| e.id())
    }

    fn upsert(&mut self, source: &EntityId, rel_type: RelationshipType, target: &EntityId, attrs: EdgeAttrs) -> bool {
        if let Some(edge) = self.find(source, rel_type, target) {
            self.graph[edge].attrs = attrs;
            return false;
        }
        let from = self.node(source);
        let to = self.node(target);
        self.graph.add_edge(from, to, EdgeData { rel_type, attrs });
        true
    }

    fn remove_one(&mut self, source: &EntityId, rel_type: RelationshipType, target: &EntityId) -> bool {
        // remove_edge swaps the last edge into the freed slot, so look up
        // each edge immediately before removing it
        match self.find(source, rel_type, target) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }
}

/// One edge seen from an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    /// Type of the stored edge
    pub rel_type: RelationshipType,

    /// Entity at the other end of the edge
    pub other_id: &'a EntityId,

    /// Edge attributes
    pub attrs: EdgeAttrs,

    /// `Outgoing` if the edge leaves the queried entity, `Incoming` otherwise
    pub direction: Direction,
}

/// Lazy iterator over the edges of one entity.
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    graph: &'a DiGraph<EntityId, EdgeData>,
    types: RelationshipTypeSet,
    outgoing: Option<EdgeIndex>,
    incoming: Option<EdgeIndex>,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = Neighbor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        while let Some(edge) = self.outgoing {
            self.outgoing = graph.next_edge(edge, EdgeDirection::Outgoing);
            let data = graph[edge];
            if self.types.contains(data.rel_type) {
                let (_, target) = graph.edge_endpoints(edge)?;
                return Some(Neighbor {
                    rel_type: data.rel_type,
                    other_id: &graph[target],
                    attrs: data.attrs,
                    direction: Direction::Outgoing,
                });
            }
        }
        while let Some(edge) = self.incoming {
            self.incoming = graph.next_edge(edge, EdgeDirection::Incoming);
            let data = graph[edge];
            if self.types.contains(data.rel_type) {
                let (source, _) = graph.edge_endpoints(edge)?;
                return Some(Neighbor {
                    rel_type: data.rel_type,
                    other_id: &graph[source],
                    attrs: data.attrs,
                    direction: Direction::Incoming,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entity, EntityKind, Payload, RiskLevel};
    use crate::store::InMemoryEntityStore;
    use chrono::Utc;

    fn store(ids: &[&str]) -> InMemoryEntityStore {
        let mut store = InMemoryEntityStore::new();
        let now = Utc::now();
        for id in ids {
            store
                .put(Entity {
                    id: EntityId::new(*id),
                    kind: EntityKind::Feature,
                    title: (*id).to_string(),
                    description: None,
                    created_at: now,
                    last_updated_at: now,
                    payload: Payload::empty(EntityKind::Feature),
                })
                .unwrap();
        }
        store
    }

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    #[test]
    fn test_paired_type_writes_inverse() {
        let entities = store(&["a", "b"]);
        let mut index = RelationshipIndex::new();
        index
            .add(&entities, &id("a"), RelationshipType::Documents, &id("b"), EdgeAttrs::default())
            .unwrap();

        assert_eq!(index.edge_count(), 2);
        assert!(index.get(&id("b"), RelationshipType::DescribedBy, &id("a")).is_some());

        assert!(index.remove(&id("b"), RelationshipType::DescribedBy, &id("a")));
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn test_readd_updates_attrs() {
        let entities = store(&["a", "b"]);
        let mut index = RelationshipIndex::new();
        let high = EdgeAttrs::new(RiskLevel::High, 0.5);

        assert!(index.add(&entities, &id("a"), RelationshipType::Covers, &id("b"), EdgeAttrs::default()).unwrap());
        assert!(!index.add(&entities, &id("a"), RelationshipType::Covers, &id("b"), high).unwrap());

        assert_eq!(index.edge_count(), 2);
        assert_eq!(index.get(&id("a"), RelationshipType::Covers, &id("b")), Some(high));
        assert_eq!(index.get(&id("b"), RelationshipType::CoveredBy, &id("a")), Some(high));
    }

    #[test]
    fn test_missing_endpoint_rejected_without_trace() {
        let entities = store(&["a"]);
        let mut index = RelationshipIndex::new();
        let err = index
            .add(&entities, &id("a"), RelationshipType::Imports, &id("ghost"), EdgeAttrs::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(missing) if missing.as_str() == "ghost"));
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn test_self_loop_rules() {
        let entities = store(&["a"]);
        let mut index = RelationshipIndex::new();
        let err = index
            .add(&entities, &id("a"), RelationshipType::DependsOn, &id("a"), EdgeAttrs::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEdge { .. }));

        index
            .add(&entities, &id("a"), RelationshipType::RelatedTo, &id("a"), EdgeAttrs::default())
            .unwrap();
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut index = RelationshipIndex::new();
        assert!(!index.remove(&id("a"), RelationshipType::Blocks, &id("b")));
    }

    #[test]
    fn test_neighbors_filter_and_restart() {
        let entities = store(&["a", "b", "c"]);
        let mut index = RelationshipIndex::new();
        index.add(&entities, &id("a"), RelationshipType::DependsOn, &id("b"), EdgeAttrs::default()).unwrap();
        index.add(&entities, &id("c"), RelationshipType::Blocks, &id("a"), EdgeAttrs::default()).unwrap();

        let out: Vec<_> = index.neighbors(&id("a"), None, Direction::Outgoing).collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].other_id, &id("b"));

        let both = index.neighbors(&id("a"), None, Direction::Both);
        let restarted = both.clone();
        assert_eq!(both.count(), 2);
        assert_eq!(restarted.count(), 2);

        let only_blocks = RelationshipTypeSet::from_types(&[RelationshipType::Blocks]);
        let incoming: Vec<_> = index
            .neighbors(&id("a"), Some(only_blocks), Direction::Both)
            .collect();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].direction, Direction::Incoming);
        assert_eq!(incoming[0].other_id, &id("c"));

        assert_eq!(index.neighbors(&id("zzz"), None, Direction::Both).count(), 0);
    }
}
