//! Domain types for the impact graph.
//!
//! This module contains the core domain types: tracked artifacts
//! ([`Entity`]), the typed edges between them ([`Relationship`]) and the
//! declared change kinds that drive impact analysis ([`ChangeKind`]).

mod change;
mod entity;
mod relationship;

pub use change::ChangeKind;
pub use entity::{
    BugPayload, ChangeType, CodeChangePayload, CodeFilePayload, CoveragePayload, DocumentPayload,
    Entity, EntityId, EntityKind, FeaturePayload, FeedbackPayload, FeedbackType, NewEntity,
    Payload, Priority, RequirementPayload, Severity, Status, TestOutcome, TestPayload,
    TestResultPayload, TestType, UpdateFrequency, UpdatePriority, MAX_TITLE_LENGTH,
};
pub use relationship::{
    Direction, EdgeAttrs, Relationship, RelationshipType, RelationshipTypeSet, RiskLevel,
};
