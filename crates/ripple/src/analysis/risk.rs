//! Regression-risk scoring.
//!
//! Each affected item contributes
//! `type_weight × risk_factor × edge_weight / (distance + 1)`, using the edge
//! that reached it. A contribution never exceeds that of a default `blocks`
//! edge one hop away, so adding such an item can only raise the score. The
//! score is the mean contribution, capped at 1.0, and is classified against
//! two thresholds.
//!
//! Paired types share one weight, keyed by the primary direction.

use crate::domain::{RelationshipType, RiskLevel};
use crate::error::ConfigError;
use crate::graph::Reached;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score boundaries for the risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Scores at or above this are high risk
    pub high: f64,
    /// Scores at or above this (and below `high`) are medium risk
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: 0.66,
            medium: 0.33,
        }
    }
}

/// Multipliers applied per edge risk level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFactors {
    /// Factor for low-risk edges
    pub low: f64,
    /// Factor for medium-risk edges
    pub medium: f64,
    /// Factor for high-risk edges
    pub high: f64,
}

impl Default for RiskFactors {
    fn default() -> Self {
        Self {
            low: 0.5,
            medium: 1.0,
            high: 2.0,
        }
    }
}

impl RiskFactors {
    /// Factor for `level`.
    #[must_use]
    pub fn factor(&self, level: RiskLevel) -> f64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }
}

/// Risk scorer configuration.
///
/// `weights` holds overrides only; types missing from it use
/// [`default_type_weight`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Level boundaries
    pub thresholds: RiskThresholds,

    /// Multipliers per edge risk level
    pub factors: RiskFactors,

    /// Per-type weight overrides
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub weights: BTreeMap<RelationshipType, f64>,
}

/// Built-in risk weight of a relationship type.
#[must_use]
pub fn default_type_weight(rel_type: RelationshipType) -> f64 {
    use RelationshipType::{
        Blocks, CausedBy, ConflictsWith, CoveredBy, Covers, DependsOn, DescribedBy, Documents,
        Enhances, Fixes, ImportedBy, Implements, Imports, ReferencedBy, References, RelatedTo,
        Tests,
    };
    match rel_type {
        Blocks => 1.0,
        ConflictsWith => 0.9,
        DependsOn => 0.8,
        Implements | CausedBy => 0.7,
        Fixes | Tests | Covers | CoveredBy => 0.6,
        Enhances | Imports | ImportedBy => 0.5,
        Documents | DescribedBy => 0.4,
        References | ReferencedBy | RelatedTo => 0.3,
    }
}

impl RiskConfig {
    /// Effective weight of `rel_type`.
    ///
    /// Inverse types (`described_by`, `covered_by`, ...) read the weight of
    /// their primary type.
    #[must_use]
    pub fn type_weight(&self, rel_type: RelationshipType) -> f64 {
        let primary = primary_type(rel_type);
        self.weights
            .get(&primary)
            .copied()
            .unwrap_or_else(|| default_type_weight(primary))
    }

    /// Contribution of a default-attribute `blocks` edge one hop away.
    ///
    /// Every contribution is capped at this value.
    #[must_use]
    pub fn max_contribution(&self) -> f64 {
        (self.type_weight(RelationshipType::Blocks) * self.factors.medium / 2.0).clamp(0.0, 1.0)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: String, reason: String| ConfigError::InvalidValue { key, reason };

        for (key, value) in [
            ("risk.thresholds.high", self.thresholds.high),
            ("risk.thresholds.medium", self.thresholds.medium),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(invalid(
                    key.to_string(),
                    format!("must be within (0, 1], got {value}"),
                ));
            }
        }
        if self.thresholds.medium > self.thresholds.high {
            return Err(invalid(
                "risk.thresholds.medium".to_string(),
                "must not exceed risk.thresholds.high".to_string(),
            ));
        }

        let factors = [
            ("low", self.factors.low),
            ("medium", self.factors.medium),
            ("high", self.factors.high),
        ];
        for (level, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    format!("risk.factors.{level}"),
                    format!("must be a non-negative number, got {value}"),
                ));
            }
        }
        if self.factors.low > self.factors.medium || self.factors.medium > self.factors.high {
            return Err(invalid(
                "risk.factors".to_string(),
                "must satisfy low <= medium <= high".to_string(),
            ));
        }

        let blocks = self.type_weight(RelationshipType::Blocks);
        for (rel_type, value) in &self.weights {
            let key = format!("risk.weights.{rel_type}");
            if !rel_type.is_primary() {
                return Err(invalid(
                    key,
                    format!("set the weight on {} instead", primary_type(*rel_type)),
                ));
            }
            if !value.is_finite() || *value < 0.0 {
                return Err(invalid(
                    key,
                    format!("must be a non-negative number, got {value}"),
                ));
            }
            if *value > blocks {
                return Err(invalid(
                    key,
                    format!("must not exceed the blocks weight {blocks}, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Contribution of one affected item.
    #[must_use]
    pub fn contribution(&self, item: &Reached) -> f64 {
        let Some(step) = item.last_step() else {
            return 0.0;
        };
        #[allow(clippy::cast_precision_loss)]
        let decay = 1.0 / (item.distance as f64 + 1.0);
        let raw = self.type_weight(step.rel_type)
            * self.factors.factor(step.attrs.risk_level)
            * step.attrs.weight
            * decay;
        raw.max(0.0).min(self.max_contribution())
    }

    /// Mean contribution of `items`, capped at 1.0. Zero for no items.
    #[must_use]
    pub fn score<'a>(&self, items: impl IntoIterator<Item = &'a Reached>) -> f64 {
        let (sum, count) = items
            .into_iter()
            .fold((0.0, 0u32), |(sum, count), item| {
                (sum + self.contribution(item), count + 1)
            });
        if count == 0 {
            return 0.0;
        }
        (sum / f64::from(count)).min(1.0)
    }

    /// Risk level of a score.
    #[must_use]
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.thresholds.high {
            RiskLevel::High
        } else if score >= self.thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Score, classify and attach recommendations.
    #[must_use]
    pub fn assess<'a>(
        &self,
        items: impl IntoIterator<Item = &'a Reached>,
        stale_documents: usize,
    ) -> RiskAssessment {
        let score = self.score(items);
        let level = self.classify(score);
        RiskAssessment {
            level,
            score,
            recommendations: recommendations(level, stale_documents),
        }
    }
}

fn primary_type(rel_type: RelationshipType) -> RelationshipType {
    if rel_type.is_primary() {
        rel_type
    } else {
        rel_type.inverse().unwrap_or(rel_type)
    }
}

/// Output of the risk scorer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    /// Classified risk
    pub level: RiskLevel,

    /// Score in `[0, 1]`
    pub score: f64,

    /// Mitigation steps for the level
    pub recommendations: Vec<String>,
}

fn recommendations(level: RiskLevel, stale_documents: usize) -> Vec<String> {
    let mut steps: Vec<String> = match level {
        RiskLevel::High => vec![
            "Run all affected tests before deployment".into(),
            "Manually test critical paths".into(),
            "Use a staged rollout".into(),
        ],
        RiskLevel::Medium => vec![
            "Run critical and regression tests".into(),
            "Monitor key metrics after deployment".into(),
        ],
        RiskLevel::Low => vec![
            "Run critical tests at minimum".into(),
            "Follow the standard deployment process".into(),
        ],
    };
    if stale_documents > 0 {
        steps.push(format!("Review {stale_documents} stale document(s)"));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeAttrs, EntityId};
    use crate::graph::PathStep;
    use rstest::rstest;

    fn item(rel_type: RelationshipType, distance: usize, attrs: EdgeAttrs) -> Reached {
        Reached {
            id: EntityId::new("x"),
            distance,
            path: vec![PathStep {
                from: EntityId::new("start"),
                rel_type,
                to: EntityId::new("x"),
                attrs,
                reversed: false,
            }],
        }
    }

    #[test]
    fn test_default_contribution_is_weight_over_hops() {
        let config = RiskConfig::default();
        let tests = item(RelationshipType::Tests, 1, EdgeAttrs::default());
        assert!((config.contribution(&tests) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_high_risk_contribution_is_capped_at_one_hop_blocks() {
        let config = RiskConfig::default();
        let blocks = item(
            RelationshipType::Blocks,
            0,
            EdgeAttrs::new(RiskLevel::High, 1.0),
        );
        assert!((config.contribution(&blocks) - 0.5).abs() < 1e-9);

        let tests = item(RelationshipType::Tests, 1, EdgeAttrs::new(RiskLevel::High, 1.0));
        assert!((config.contribution(&tests) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_one_hop_blocks_never_lowers_high_risk_score() {
        let config = RiskConfig::default();
        let mut items = vec![item(
            RelationshipType::Tests,
            1,
            EdgeAttrs::new(RiskLevel::High, 1.0),
        )];
        let before = config.score(&items);
        items.push(item(RelationshipType::Blocks, 1, EdgeAttrs::default()));
        assert!(config.score(&items) >= before);
    }

    #[rstest]
    #[case::documents(RelationshipType::DescribedBy)]
    #[case::covers(RelationshipType::CoveredBy)]
    #[case::imports(RelationshipType::ImportedBy)]
    #[case::references(RelationshipType::ReferencedBy)]
    fn test_inverse_type_reads_primary_weight(#[case] inverse: RelationshipType) {
        let mut config = RiskConfig::default();
        let primary = inverse.inverse().unwrap();
        config.weights.insert(primary, 0.95);
        assert!((config.type_weight(inverse) - 0.95).abs() < f64::EPSILON);
        assert!((config.type_weight(primary) - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_inverse_keyed_weight() {
        let mut config = RiskConfig::default();
        config.weights.insert(RelationshipType::DescribedBy, 0.8);
        match config.validate() {
            Err(ConfigError::InvalidValue { key, reason }) => {
                assert_eq!(key, "risk.weights.described_by");
                assert!(reason.contains("documents"), "{reason}");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_weight_above_blocks() {
        let mut config = RiskConfig::default();
        config.weights.insert(RelationshipType::Tests, 1.5);
        assert!(config.validate().is_err());

        config.weights.insert(RelationshipType::Blocks, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unordered_factors() {
        let mut config = RiskConfig::default();
        config.factors.high = 0.2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "risk.factors"
        ));
    }

    #[test]
    fn test_empty_set_scores_zero() {
        let config = RiskConfig::default();
        let assessment = config.assess(std::iter::empty(), 0);
        assert!(assessment.score.abs() < f64::EPSILON);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[rstest]
    #[case::low(0.1, RiskLevel::Low)]
    #[case::medium_boundary(0.33, RiskLevel::Medium)]
    #[case::medium(0.5, RiskLevel::Medium)]
    #[case::high_boundary(0.66, RiskLevel::High)]
    #[case::max(1.0, RiskLevel::High)]
    fn test_classify(#[case] score: f64, #[case] expected: RiskLevel) {
        assert_eq!(RiskConfig::default().classify(score), expected);
    }

    #[test]
    fn test_weight_override() {
        let mut config = RiskConfig::default();
        config.weights.insert(RelationshipType::RelatedTo, 0.9);
        assert!((config.type_weight(RelationshipType::RelatedTo) - 0.9).abs() < f64::EPSILON);
        assert!((config.type_weight(RelationshipType::Blocks) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = RiskConfig::default();
        config.thresholds.medium = 0.9;
        config.thresholds.high = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "risk.thresholds.medium"
        ));
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = RiskConfig::default();
        config.weights.insert(RelationshipType::Fixes, -1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_stale_documents_add_recommendation() {
        let config = RiskConfig::default();
        let assessment = config.assess(std::iter::empty(), 2);
        assert!(assessment
            .recommendations
            .iter()
            .any(|r| r == "Review 2 stale document(s)"));
    }
}
