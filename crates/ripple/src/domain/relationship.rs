//! Typed, directed relationships between entities.

use super::entity::EntityId;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a directed edge between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// Source needs target to work
    DependsOn,
    /// Source and target cannot coexist
    ConflictsWith,
    /// Source improves target
    Enhances,
    /// Source prevents progress on target
    Blocks,
    /// Loose association
    RelatedTo,
    /// Source implements target
    Implements,
    /// Source tests target
    Tests,
    /// Source fixes target
    Fixes,
    /// Source was caused by target
    CausedBy,
    /// Source documents target
    Documents,
    /// Source is documented by target
    DescribedBy,
    /// Source covers target
    Covers,
    /// Source is covered by target
    CoveredBy,
    /// Source imports target
    Imports,
    /// Source is imported by target
    ImportedBy,
    /// Source references target
    References,
    /// Source is referenced by target
    ReferencedBy,
}

impl RelationshipType {
    /// Every relationship type, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::DependsOn,
        Self::ConflictsWith,
        Self::Enhances,
        Self::Blocks,
        Self::RelatedTo,
        Self::Implements,
        Self::Tests,
        Self::Fixes,
        Self::CausedBy,
        Self::Documents,
        Self::DescribedBy,
        Self::Covers,
        Self::CoveredBy,
        Self::Imports,
        Self::ImportedBy,
        Self::References,
        Self::ReferencedBy,
    ];

    /// Wire name of the type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DependsOn => "depends_on",
            Self::ConflictsWith => "conflicts_with",
            Self::Enhances => "enhances",
            Self::Blocks => "blocks",
            Self::RelatedTo => "related_to",
            Self::Implements => "implements",
            Self::Tests => "tests",
            Self::Fixes => "fixes",
            Self::CausedBy => "caused_by",
            Self::Documents => "documents",
            Self::DescribedBy => "described_by",
            Self::Covers => "covers",
            Self::CoveredBy => "covered_by",
            Self::Imports => "imports",
            Self::ImportedBy => "imported_by",
            Self::References => "references",
            Self::ReferencedBy => "referenced_by",
        }
    }

    /// The paired inverse, if this type has one.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        match self {
            Self::Documents => Some(Self::DescribedBy),
            Self::DescribedBy => Some(Self::Documents),
            Self::Covers => Some(Self::CoveredBy),
            Self::CoveredBy => Some(Self::Covers),
            Self::Imports => Some(Self::ImportedBy),
            Self::ImportedBy => Some(Self::Imports),
            Self::References => Some(Self::ReferencedBy),
            Self::ReferencedBy => Some(Self::References),
            _ => None,
        }
    }

    /// Whether edges of this type are mirrored by an inverse edge.
    #[must_use]
    pub fn is_paired(self) -> bool {
        self.inverse().is_some()
    }

    /// Whether this is the canonical direction of its pair.
    ///
    /// Unpaired types are always primary. Snapshots only store primary edges.
    #[must_use]
    pub fn is_primary(self) -> bool {
        !matches!(
            self,
            Self::DescribedBy | Self::CoveredBy | Self::ImportedBy | Self::ReferencedBy
        )
    }

    /// Whether an edge of this type may point back at its source.
    #[must_use]
    pub fn allows_self_loop(self) -> bool {
        self == Self::RelatedTo
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                Error::Validation(format!("unrecognized relationship type '{s}'"))
            })
    }
}

/// Risk carried by an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    #[default]
    Medium,
    /// High risk
    High,
}

impl RiskLevel {
    /// Wire name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::Validation(format!(
                "unrecognized risk level '{s}'"
            ))),
        }
    }
}

/// Attributes attached to an edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttrs {
    /// Risk carried by the edge
    #[serde(default)]
    pub risk_level: RiskLevel,

    /// Strength of the relationship in `[0, 1]`
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for EdgeAttrs {
    fn default() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            weight: default_weight(),
        }
    }
}

impl EdgeAttrs {
    /// Attributes with the given risk and weight.
    #[must_use]
    pub fn new(risk_level: RiskLevel, weight: f64) -> Self {
        Self { risk_level, weight }
    }

    /// Reason the attributes are unusable, if any.
    pub(crate) fn problem(&self) -> Option<String> {
        if !self.weight.is_finite() || !(0.0..=1.0).contains(&self.weight) {
            return Some(format!(
                "weight must be a finite number within [0, 1], got {}",
                self.weight
            ));
        }
        None
    }
}

/// Which edges of a node to follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges leaving the node
    #[default]
    Outgoing,
    /// Edges entering the node
    Incoming,
    /// Both
    Both,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "outgoing" | "out" => Ok(Self::Outgoing),
            "incoming" | "in" => Ok(Self::Incoming),
            "both" => Ok(Self::Both),
            _ => Err(Error::Validation(format!(
                "unrecognized direction '{s}'"
            ))),
        }
    }
}

/// A stored edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity
    pub source_id: EntityId,

    /// Edge type
    #[serde(rename = "type")]
    pub rel_type: RelationshipType,

    /// Target entity
    pub target_id: EntityId,

    /// Edge attributes
    #[serde(flatten)]
    pub attrs: EdgeAttrs,
}

/// Compact set of relationship types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RelationshipTypeSet(u32);

impl RelationshipTypeSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every relationship type.
    #[must_use]
    pub fn all() -> Self {
        RelationshipType::ALL.into_iter().collect()
    }

    /// Set containing exactly `types`.
    #[must_use]
    pub fn from_types(types: &[RelationshipType]) -> Self {
        types.iter().copied().collect()
    }

    /// Add a type.
    pub fn insert(&mut self, rel_type: RelationshipType) {
        self.0 |= rel_type.bit();
    }

    /// Whether `rel_type` is in the set.
    #[must_use]
    pub fn contains(self, rel_type: RelationshipType) -> bool {
        self.0 & rel_type.bit() != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = RelationshipType> {
        RelationshipType::ALL
            .into_iter()
            .filter(move |t| self.contains(*t))
    }
}

impl FromIterator<RelationshipType> for RelationshipTypeSet {
    fn from_iter<I: IntoIterator<Item = RelationshipType>>(iter: I) -> Self {
        let mut set = Self::empty();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_inverse_is_involution() {
        for t in RelationshipType::ALL {
            if let Some(inv) = t.inverse() {
                assert_eq!(inv.inverse(), Some(t));
                assert_ne!(t.is_primary(), inv.is_primary());
            } else {
                assert!(t.is_primary());
            }
        }
    }

    #[test]
    fn test_four_pairs() {
        let paired = RelationshipType::ALL
            .into_iter()
            .filter(|t| t.is_paired())
            .count();
        assert_eq!(paired, 8);
    }

    #[rstest]
    #[case::snake("depends_on", RelationshipType::DependsOn)]
    #[case::kebab("described-by", RelationshipType::DescribedBy)]
    #[case::mixed_case("Covered_By", RelationshipType::CoveredBy)]
    fn test_parse_relationship_type(#[case] input: &str, #[case] expected: RelationshipType) {
        assert_eq!(input.parse::<RelationshipType>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_relationship_type() {
        assert!(matches!(
            "owns".parse::<RelationshipType>(),
            Err(Error::Validation(_))
        ));
    }

    #[rstest]
    #[case::negative(-0.5)]
    #[case::above_one(1.01)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_invalid_weight(#[case] weight: f64) {
        assert!(EdgeAttrs::new(RiskLevel::Low, weight).problem().is_some());
    }

    #[test]
    fn test_default_attrs() {
        let attrs = EdgeAttrs::default();
        assert_eq!(attrs.risk_level, RiskLevel::Medium);
        assert!((attrs.weight - 1.0).abs() < f64::EPSILON);
        assert!(attrs.problem().is_none());
    }

    #[test]
    fn test_type_set_membership() {
        let set = RelationshipTypeSet::from_types(&[
            RelationshipType::Tests,
            RelationshipType::Covers,
        ]);
        assert!(set.contains(RelationshipType::Tests));
        assert!(!set.contains(RelationshipType::Blocks));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![RelationshipType::Tests, RelationshipType::Covers]
        );
        assert_eq!(RelationshipTypeSet::all().iter().count(), 17);
        assert!(RelationshipTypeSet::empty().is_empty());
    }

    #[test]
    fn test_relationship_serializes_flat() {
        let rel = Relationship {
            source_id: EntityId::new("doc-1"),
            rel_type: RelationshipType::Documents,
            target_id: EntityId::new("feat-1"),
            attrs: EdgeAttrs::default(),
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "documents");
        assert_eq!(json["risk_level"], "medium");
        assert_eq!(json["weight"], 1.0);
    }
}
