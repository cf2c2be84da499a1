//! Analyses composed from bounded traversals.

pub mod impact;
pub mod risk;

pub use impact::{
    BugImpactReport, DEFAULT_MAX_DEPTH, DocumentReview, FixEstimate, ImpactItem, ImpactReport,
    RegressionReport, TestPlan, analyze_bug_impact, analyze_impact, assess_regression_risk,
    recommend_tests, stale_documents,
};
pub use risk::{RiskAssessment, RiskConfig, RiskFactors, RiskThresholds, default_type_weight};
