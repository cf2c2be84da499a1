//! Impact analysis over the bounded reachable subgraph.
//!
//! A change to one entity is traced along three families of relationships,
//! always in both directions, and the reached entities are partitioned by
//! kind:
//!
//! | partition | kinds | followed types |
//! |-----------|-------|----------------|
//! | tests     | test, test_coverage | tests, covers, covered_by, depends_on |
//! | documents | document | documents, described_by, references, referenced_by |
//! | features  | feature, project_requirement, bug | depends_on, blocks, conflicts_with, enhances, implements, caused_by |
//!
//! Documents are only reported when they were last updated strictly before
//! the change. Each reported document carries a staleness score and an
//! update priority.
//!
//! Bugs get their own analysis, scored by severity and the number of features
//! they touch.

use super::risk::RiskConfig;
use crate::domain::{
    BugPayload, ChangeKind, Direction, EntityId, EntityKind, Payload, RelationshipType,
    RelationshipTypeSet, RiskLevel, Severity, Status, TestType, UpdatePriority,
};
use crate::error::{Error, Result};
use crate::graph::{GraphState, PathStep, Reached};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, info};

/// Default traversal depth for impact analyses.
pub const DEFAULT_MAX_DEPTH: usize = 3;

const TEST_KINDS: &[EntityKind] = &[EntityKind::Test, EntityKind::TestCoverage];
const DOC_KINDS: &[EntityKind] = &[EntityKind::Document];
const FEATURE_KINDS: &[EntityKind] = &[
    EntityKind::Feature,
    EntityKind::ProjectRequirement,
    EntityKind::Bug,
];

fn test_edges() -> RelationshipTypeSet {
    RelationshipTypeSet::from_types(&[
        RelationshipType::Tests,
        RelationshipType::Covers,
        RelationshipType::CoveredBy,
        RelationshipType::DependsOn,
    ])
}

fn doc_edges() -> RelationshipTypeSet {
    RelationshipTypeSet::from_types(&[
        RelationshipType::Documents,
        RelationshipType::DescribedBy,
        RelationshipType::References,
        RelationshipType::ReferencedBy,
    ])
}

fn feature_edges() -> RelationshipTypeSet {
    RelationshipTypeSet::from_types(&[
        RelationshipType::DependsOn,
        RelationshipType::Blocks,
        RelationshipType::ConflictsWith,
        RelationshipType::Enhances,
        RelationshipType::Implements,
        RelationshipType::CausedBy,
    ])
}

/// An entity affected by a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactItem {
    /// Affected entity
    pub id: EntityId,

    /// Its kind
    pub kind: EntityKind,

    /// Its title
    pub title: String,

    /// Hop distance from the changed entity
    pub distance: usize,

    /// Shortest path from the changed entity
    pub path: Vec<PathStep>,

    /// Refresh urgency, set on stale documents only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<DocumentReview>,
}

/// How far behind a stale document is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DocumentReview {
    /// Whole days between the document's last update and the change
    pub days_behind: i64,

    /// Staleness in `[0, 10]`
    pub staleness: f64,

    /// Refresh urgency
    pub priority: UpdatePriority,
}

/// Result of [`analyze_impact`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    /// The changed entity
    pub entity_id: EntityId,

    /// Declared change kind
    pub change_kind: ChangeKind,

    /// Depth bound used
    pub max_depth: usize,

    /// Timestamp documents were compared against
    pub changed_at: DateTime<Utc>,

    /// Tests and coverage mappings to re-run
    pub affected_tests: Vec<ImpactItem>,

    /// Documents last updated before the change
    pub affected_docs: Vec<ImpactItem>,

    /// Features, requirements and bugs touched by the change
    pub affected_features: Vec<ImpactItem>,

    /// Classified risk
    pub risk_level: RiskLevel,

    /// Risk score in `[0, 1]`
    pub risk_score: f64,

    /// Mitigation steps
    pub recommendations: Vec<String>,
}

/// Test plan part of a [`RegressionReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPlan {
    /// Tests to run, closest first
    pub tests: Vec<ImpactItem>,

    /// Number of critical tests in the plan
    pub critical_tests: usize,

    /// Number of regression tests in the plan
    pub regression_tests: usize,

    /// Number of unit tests in the plan
    pub unit_tests: usize,

    /// Sum of the known execution times, in seconds
    pub estimated_secs: f64,
}

/// Result of [`assess_regression_risk`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    /// The changed entities, deduplicated
    pub changed: Vec<EntityId>,

    /// Combined test plan
    pub test_plan: TestPlan,

    /// Documents to update
    pub documents_to_update: Vec<ImpactItem>,

    /// Features, requirements and bugs at risk
    pub features_at_risk: Vec<ImpactItem>,

    /// Classified risk
    pub risk_level: RiskLevel,

    /// Risk score in `[0, 1]`
    pub risk_score: f64,

    /// Mitigation steps
    pub recommendations: Vec<String>,
}

/// Estimated effort to fix a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixEstimate {
    /// Impact score of 3 or less
    #[serde(rename = "1-2 hours")]
    OneToTwoHours,
    /// Impact score of 4 to 6
    #[serde(rename = "2-4 hours")]
    TwoToFourHours,
    /// Impact score above 6
    #[serde(rename = "4-8 hours")]
    FourToEightHours,
}

impl FixEstimate {
    /// Bucket for an impact score.
    #[must_use]
    pub fn for_score(impact_score: u32) -> Self {
        match impact_score {
            0..=3 => Self::OneToTwoHours,
            4..=6 => Self::TwoToFourHours,
            _ => Self::FourToEightHours,
        }
    }

    /// Display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToTwoHours => "1-2 hours",
            Self::TwoToFourHours => "2-4 hours",
            Self::FourToEightHours => "4-8 hours",
        }
    }
}

/// Result of [`analyze_bug_impact`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BugImpactReport {
    /// The analysed bug
    pub bug_id: EntityId,

    /// Declared severity; `minor` is assumed when absent
    pub severity: Severity,

    /// Declared status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Severity points times the number of affected features (at least one)
    pub impact_score: u32,

    /// `high` above 6 points, else `medium`
    pub priority: UpdatePriority,

    /// Rough fix effort
    pub estimated_fix_time: FixEstimate,

    /// Features and requirements the bug touches
    pub affected_features: Vec<ImpactItem>,

    /// Tests to run once the bug is fixed
    pub test_plan: TestPlan,

    /// Connected documents to review, whatever their age
    pub documents_to_review: Vec<ImpactItem>,

    /// Classified risk of fixing the bug
    pub risk_level: RiskLevel,

    /// Risk score in `[0, 1]`
    pub risk_score: f64,
}

const BUG_PRIORITY_THRESHOLD: u32 = 6;

struct Partitions {
    tests: Vec<Reached>,
    docs: Vec<Reached>,
    features: Vec<Reached>,
}

fn reach_kinds(
    state: &GraphState,
    start: &EntityId,
    max_depth: usize,
    types: RelationshipTypeSet,
    kinds: &[EntityKind],
) -> Result<Vec<Reached>> {
    let reached = state.reach(start, max_depth, Some(types), Direction::Both)?;
    Ok(reached
        .into_iter()
        .filter(|r| {
            state
                .entities()
                .get(&r.id)
                .is_ok_and(|e| kinds.contains(&e.kind))
        })
        .collect())
}

fn stale_only(state: &GraphState, docs: Vec<Reached>, changed_at: DateTime<Utc>) -> Vec<Reached> {
    docs.into_iter()
        .filter(|r| {
            state
                .entities()
                .get(&r.id)
                .is_ok_and(|e| e.last_updated_at < changed_at)
        })
        .collect()
}

fn partitions(
    state: &GraphState,
    start: &EntityId,
    max_depth: usize,
    changed_at: DateTime<Utc>,
) -> Result<Partitions> {
    let docs = reach_kinds(state, start, max_depth, doc_edges(), DOC_KINDS)?;
    Ok(Partitions {
        tests: reach_kinds(state, start, max_depth, test_edges(), TEST_KINDS)?,
        docs: stale_only(state, docs, changed_at),
        features: reach_kinds(state, start, max_depth, feature_edges(), FEATURE_KINDS)?,
    })
}

fn items(state: &GraphState, reached: Vec<Reached>) -> Vec<ImpactItem> {
    reached
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
        .collect()
}

/// Items for stale documents, each with its review.
fn doc_items(state: &GraphState, reached: Vec<Reached>, changed_at: DateTime<Utc>) -> Vec<ImpactItem> {
    let mut docs = items(state, reached);
    for item in &mut docs {
        let Ok(entity) = state.entities().get(&item.id) else {
            continue;
        };
        if let Payload::Document(doc) = &entity.payload {
            let days_behind = (changed_at - entity.last_updated_at).num_days().max(0);
            item.review = Some(DocumentReview {
                days_behind,
                staleness: doc.staleness(days_behind),
                priority: doc.update_priority(),
            });
        }
    }
    docs
}

fn change_time(state: &GraphState, id: &EntityId, since: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
    let entity = state.entities().get(id)?;
    Ok(since.unwrap_or(entity.last_updated_at))
}

/// Full impact analysis of a change to `id`.
///
/// `changed_at` defaults to the entity's `last_updated_at`.
///
/// # Errors
///
/// Returns `Error::NotFound` if `id` does not exist.
pub fn analyze_impact(
    state: &GraphState,
    risk: &RiskConfig,
    id: &EntityId,
    change_kind: ChangeKind,
    max_depth: usize,
    changed_at: Option<DateTime<Utc>>,
) -> Result<ImpactReport> {
    let changed_at = change_time(state, id, changed_at)?;
    let parts = partitions(state, id, max_depth, changed_at)?;

    let assessment = risk.assess(
        parts.tests.iter().chain(&parts.docs).chain(&parts.features),
        parts.docs.len(),
    );
    info!(
        %id,
        %change_kind,
        tests = parts.tests.len(),
        docs = parts.docs.len(),
        features = parts.features.len(),
        risk = %assessment.level,
        "Impact analysis complete"
    );

    Ok(ImpactReport {
        entity_id: id.clone(),
        change_kind,
        max_depth,
        changed_at,
        affected_tests: items(state, parts.tests),
        affected_docs: doc_items(state, parts.docs, changed_at),
        affected_features: items(state, parts.features),
        risk_level: assessment.level,
        risk_score: assessment.score,
        recommendations: assessment.recommendations,
    })
}

/// Tests and coverage mappings affected by a change to `id`.
///
/// # Errors
///
/// Returns `Error::NotFound` if `id` does not exist.
pub fn recommend_tests(state: &GraphState, id: &EntityId, max_depth: usize) -> Result<Vec<ImpactItem>> {
    let tests = reach_kinds(state, id, max_depth, test_edges(), TEST_KINDS)?;
    debug!(%id, count = tests.len(), "Recommended tests");
    Ok(items(state, tests))
}

/// Documents reachable from `id` that were last updated before `since`.
///
/// `since` defaults to the entity's `last_updated_at`.
///
/// # Errors
///
/// Returns `Error::NotFound` if `id` does not exist.
pub fn stale_documents(
    state: &GraphState,
    id: &EntityId,
    since: Option<DateTime<Utc>>,
    max_depth: usize,
) -> Result<Vec<ImpactItem>> {
    let since = change_time(state, id, since)?;
    let docs = reach_kinds(state, id, max_depth, doc_edges(), DOC_KINDS)?;
    Ok(doc_items(state, stale_only(state, docs, since), since))
}

/// Combined regression risk of changing several entities at once.
///
/// Impact sets are merged keeping the smallest distance per entity; the
/// changed entities themselves are never reported.
///
/// # Errors
///
/// Returns `Error::NotFound` for the first unknown ID.
pub fn assess_regression_risk(
    state: &GraphState,
    risk: &RiskConfig,
    changed: &[EntityId],
    max_depth: usize,
) -> Result<RegressionReport> {
    let mut unique: Vec<EntityId> = Vec::with_capacity(changed.len());
    for id in changed {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }

    let mut tests = BTreeMap::new();
    let mut docs = BTreeMap::new();
    let mut features = BTreeMap::new();
    let mut latest: Option<DateTime<Utc>> = None;
    for id in &unique {
        let changed_at = change_time(state, id, None)?;
        latest = Some(latest.map_or(changed_at, |t| t.max(changed_at)));
        let parts = partitions(state, id, max_depth, changed_at)?;
        merge(&mut tests, parts.tests, &unique);
        merge(&mut docs, parts.docs, &unique);
        merge(&mut features, parts.features, &unique);
    }

    let tests = sorted(tests);
    let docs = sorted(docs);
    let features = sorted(features);

    let assessment = risk.assess(tests.iter().chain(&docs).chain(&features), docs.len());
    info!(
        changed = unique.len(),
        tests = tests.len(),
        docs = docs.len(),
        features = features.len(),
        risk = %assessment.level,
        "Regression risk assessed"
    );

    Ok(RegressionReport {
        changed: unique,
        test_plan: test_plan(state, items(state, tests)),
        documents_to_update: match latest {
            Some(at) => doc_items(state, docs, at),
            None => Vec::new(),
        },
        features_at_risk: items(state, features),
        risk_level: assessment.level,
        risk_score: assessment.score,
        recommendations: assessment.recommendations,
    })
}

/// Impact of a bug: severity-weighted score, fix estimate, and the features,
/// tests and documents connected to it.
///
/// # Errors
///
/// Returns `Error::NotFound` if `bug_id` does not exist and
/// `Error::Validation` if it is not a bug.
pub fn analyze_bug_impact(
    state: &GraphState,
    risk: &RiskConfig,
    bug_id: &EntityId,
    max_depth: usize,
) -> Result<BugImpactReport> {
    let bug = state.entities().get(bug_id)?;
    let Payload::Bug(BugPayload { severity, status, .. }) = &bug.payload else {
        return Err(Error::Validation(format!(
            "{bug_id} is a {}, not a bug",
            bug.kind
        )));
    };
    let severity = severity.unwrap_or(Severity::Minor);
    let status = *status;

    let features = reach_kinds(
        state,
        bug_id,
        max_depth,
        feature_edges(),
        &[EntityKind::Feature, EntityKind::ProjectRequirement],
    )?;
    let tests = reach_kinds(state, bug_id, max_depth, test_edges(), TEST_KINDS)?;
    let docs = reach_kinds(state, bug_id, max_depth, doc_edges(), DOC_KINDS)?;

    let scope = u32::try_from(features.len()).unwrap_or(u32::MAX).max(1);
    let impact_score = severity.impact_points().saturating_mul(scope);
    let priority = if impact_score > BUG_PRIORITY_THRESHOLD {
        UpdatePriority::High
    } else {
        UpdatePriority::Medium
    };
    let assessment = risk.assess(tests.iter().chain(&docs).chain(&features), 0);
    info!(
        %bug_id,
        %severity,
        impact_score,
        features = features.len(),
        tests = tests.len(),
        "Bug impact analysed"
    );

    Ok(BugImpactReport {
        bug_id: bug_id.clone(),
        severity,
        status,
        impact_score,
        priority,
        estimated_fix_time: FixEstimate::for_score(impact_score),
        affected_features: items(state, features),
        test_plan: test_plan(state, items(state, tests)),
        documents_to_review: items(state, docs),
        risk_level: assessment.level,
        risk_score: assessment.score,
    })
}

fn merge(into: &mut BTreeMap<EntityId, Reached>, reached: Vec<Reached>, exclude: &[EntityId]) {
    for r in reached {
        if exclude.contains(&r.id) {
            continue;
        }
        match into.entry(r.id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(r);
            }
            Entry::Occupied(mut slot) => {
                if r.distance < slot.get().distance {
                    slot.insert(r);
                }
            }
        }
    }
}

fn sorted(merged: BTreeMap<EntityId, Reached>) -> Vec<Reached> {
    let mut all: Vec<Reached> = merged.into_values().collect();
    // stable sort keeps id order within a distance
    all.sort_by_key(|r| r.distance);
    all
}

fn test_plan(state: &GraphState, tests: Vec<ImpactItem>) -> TestPlan {
    let mut critical_tests = 0;
    let mut regression_tests = 0;
    let mut unit_tests = 0;
    let mut estimated_secs = 0.0;
    for item in &tests {
        let payload = state.entities().get(&item.id).map(|e| &e.payload);
        if let Ok(Payload::Test(test)) = payload {
            if test.is_critical() {
                critical_tests += 1;
            }
            match test.test_type {
                Some(TestType::Regression) => regression_tests += 1,
                Some(TestType::Unit) => unit_tests += 1,
                _ => {}
            }
            estimated_secs += test.execution_secs.unwrap_or(0.0);
        }
    }
    TestPlan {
        tests,
        critical_tests,
        regression_tests,
        unit_tests,
        estimated_secs,
    }
}
