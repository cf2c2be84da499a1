//! Bounded breadth-first reachability.
//!
//! The traversal expands one layer at a time. Within a layer every candidate
//! path to an unvisited entity is compared and the smallest one is kept,
//! where paths compare step by step on `(type name, entity id)`. Entities are
//! marked visited only once their layer is complete, so the result does not
//! depend on adjacency order.

use crate::domain::{Direction, EdgeAttrs, EntityId, RelationshipType, RelationshipTypeSet};
use crate::error::{Error, Result};
use crate::store::{EntityStore, RelationshipIndex};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// One edge followed during a traversal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    /// Entity the step leaves from
    pub from: EntityId,

    /// Type of the followed edge
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,

    /// Entity the step arrives at
    pub to: EntityId,

    /// Attributes of the followed edge
    #[serde(flatten)]
    pub attrs: EdgeAttrs,

    /// Whether the edge was followed against its stored direction
    pub reversed: bool,
}

/// An entity reached by [`bounded_reach`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reached {
    /// The reached entity
    pub id: EntityId,

    /// Hop distance from the start entity
    pub distance: usize,

    /// The selected shortest path, from the start entity outwards
    pub path: Vec<PathStep>,
}

impl Reached {
    /// The edge that reached this entity.
    #[must_use]
    pub fn last_step(&self) -> Option<&PathStep> {
        self.path.last()
    }
}

/// Collect every entity within `max_depth` hops of `start`.
///
/// Only edges whose type is in `types` are followed (all types when `None`).
/// The start entity is never part of the result. Results are ordered by
/// distance, then entity ID.
///
/// # Errors
///
/// Returns `Error::NotFound` if `start` does not exist.
pub fn bounded_reach(
    entities: &dyn EntityStore,
    index: &RelationshipIndex,
    start: &EntityId,
    max_depth: usize,
    types: Option<RelationshipTypeSet>,
    direction: Direction,
) -> Result<Vec<Reached>> {
    if !entities.exists(start) {
        return Err(Error::NotFound(start.clone()));
    }

    let mut visited: HashSet<EntityId> = HashSet::from([start.clone()]);
    let mut frontier: Vec<(EntityId, Vec<PathStep>)> = vec![(start.clone(), Vec::new())];
    let mut result = Vec::new();

    for depth in 1..=max_depth {
        let mut layer: BTreeMap<EntityId, Vec<PathStep>> = BTreeMap::new();

        for (node, path) in &frontier {
            for neighbor in index.neighbors(node, types, direction) {
                if visited.contains(neighbor.other_id) {
                    continue;
                }
                let mut candidate = path.clone();
                candidate.push(PathStep {
                    from: node.clone(),
                    rel_type: neighbor.rel_type,
                    to: neighbor.other_id.clone(),
                    attrs: neighbor.attrs,
                    reversed: neighbor.direction == Direction::Incoming,
                });

                match layer.entry(neighbor.other_id.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    }
                    Entry::Occupied(mut slot) => {
                        if compare_paths(&candidate, slot.get()) == Ordering::Less {
                            slot.insert(candidate);
                        }
                    }
                }
            }
        }

        if layer.is_empty() {
            break;
        }

        visited.extend(layer.keys().cloned());
        result.extend(layer.iter().map(|(id, path)| Reached {
            id: id.clone(),
            distance: depth,
            path: path.clone(),
        }));
        frontier = layer.into_iter().collect();
    }

    debug!(%start, max_depth, reached = result.len(), "Bounded reach complete");
    Ok(result)
}

fn step_key(step: &PathStep) -> (&str, &str) {
    (step.rel_type.as_str(), step.to.as_str())
}

fn compare_paths(a: &[PathStep], b: &[PathStep]) -> Ordering {
    a.iter().map(step_key).cmp(b.iter().map(step_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entity, EntityKind, Payload};
    use crate::store::InMemoryEntityStore;
    use chrono::Utc;

    fn graph(ids: &[&str], edges: &[(&str, RelationshipType, &str)]) -> (InMemoryEntityStore, RelationshipIndex) {
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
        let mut index = RelationshipIndex::new();
        for (s, t, d) in edges {
            index
                .add(&store, &EntityId::new(*s), *t, &EntityId::new(*d), EdgeAttrs::default())
                .unwrap();
        }
        (store, index)
    }

    fn ids(reached: &[Reached]) -> Vec<(&str, usize)> {
        reached.iter().map(|r| (r.id.as_str(), r.distance)).collect()
    }

    #[test]
    fn test_zero_depth_is_empty() {
        let (store, index) = graph(&["a", "b"], &[("a", RelationshipType::DependsOn, "b")]);
        let reached = bounded_reach(&store, &index, &EntityId::new("a"), 0, None, Direction::Outgoing).unwrap();
        assert!(reached.is_empty());
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let (store, index) = graph(&["a"], &[]);
        let err = bounded_reach(&store, &index, &EntityId::new("zz"), 3, None, Direction::Both).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_cycle_visits_each_entity_once() {
        let (store, index) = graph(
            &["a", "b", "c"],
            &[
                ("a", RelationshipType::DependsOn, "b"),
                ("b", RelationshipType::DependsOn, "c"),
                ("c", RelationshipType::DependsOn, "a"),
            ],
        );
        let reached = bounded_reach(&store, &index, &EntityId::new("a"), 5, None, Direction::Outgoing).unwrap();
        assert_eq!(ids(&reached), vec![("b", 1), ("c", 2)]);
    }

    #[test]
    fn test_direction_controls_reach() {
        let (store, index) = graph(&["a", "b"], &[("a", RelationshipType::Tests, "b")]);
        let start = EntityId::new("b");

        let outgoing = bounded_reach(&store, &index, &start, 2, None, Direction::Outgoing).unwrap();
        assert!(outgoing.is_empty());

        let both = bounded_reach(&store, &index, &start, 2, None, Direction::Both).unwrap();
        assert_eq!(ids(&both), vec![("a", 1)]);
        assert!(both[0].path[0].reversed);
    }

    #[test]
    fn test_tie_break_prefers_smallest_first_type() {
        // a reaches d at distance 2 through either b (via depends_on) or c (via blocks)
        let (store, index) = graph(
            &["a", "b", "c", "d"],
            &[
                ("a", RelationshipType::DependsOn, "b"),
                ("a", RelationshipType::Blocks, "c"),
                ("b", RelationshipType::DependsOn, "d"),
                ("c", RelationshipType::DependsOn, "d"),
            ],
        );
        let reached = bounded_reach(&store, &index, &EntityId::new("a"), 3, None, Direction::Outgoing).unwrap();
        let d = reached.iter().find(|r| r.id.as_str() == "d").unwrap();
        assert_eq!(d.distance, 2);
        assert_eq!(d.path[0].rel_type, RelationshipType::Blocks);
        assert_eq!(d.path[0].to.as_str(), "c");
    }

    #[test]
    fn test_compare_paths_orders_step_by_step() {
        let step = |rel_type, to: &str| PathStep {
            from: EntityId::new("a"),
            rel_type,
            to: EntityId::new(to),
            attrs: EdgeAttrs::default(),
            reversed: false,
        };
        let via_b = [step(RelationshipType::DependsOn, "b"), step(RelationshipType::Tests, "d")];
        let via_c = [step(RelationshipType::DependsOn, "c"), step(RelationshipType::Blocks, "d")];
        let via_b_blocks = [step(RelationshipType::DependsOn, "b"), step(RelationshipType::Blocks, "d")];

        assert_eq!(compare_paths(&via_b, &via_c), Ordering::Less);
        assert_eq!(compare_paths(&via_b_blocks, &via_b), Ordering::Less);
        assert_eq!(compare_paths(&via_b, &via_b), Ordering::Equal);
        assert_eq!(compare_paths(&via_b[..1], &via_b), Ordering::Less);
    }

    #[test]
    fn test_type_filter_limits_edges() {
        let (store, index) = graph(
            &["a", "b", "c"],
            &[
                ("a", RelationshipType::DependsOn, "b"),
                ("a", RelationshipType::Enhances, "c"),
            ],
        );
        let only = RelationshipTypeSet::from_types(&[RelationshipType::Enhances]);
        let reached = bounded_reach(&store, &index, &EntityId::new("a"), 3, Some(only), Direction::Outgoing).unwrap();
        assert_eq!(ids(&reached), vec![("c", 1)]);
    }
}
