//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::{ChangeKind, RiskLevel};

/// Kind of change for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKindArg {
    /// Source code edit
    #[value(name = "code_change", alias = "code-change", alias = "code")]
    CodeChange,
    /// Change in feature behaviour
    #[value(name = "feature_change", alias = "feature-change", alias = "feature")]
    FeatureChange,
    /// Bug fix
    #[value(name = "bug_fix", alias = "bug-fix", alias = "fix")]
    BugFix,
    /// Documentation edit
    #[value(name = "doc_edit", alias = "doc-edit", alias = "doc")]
    DocEdit,
}

impl std::fmt::Display for ChangeKindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ChangeKind::from(*self))
    }
}

impl From<ChangeKindArg> for ChangeKind {
    fn from(arg: ChangeKindArg) -> Self {
        match arg {
            ChangeKindArg::CodeChange => ChangeKind::CodeChange,
            ChangeKindArg::FeatureChange => ChangeKind::FeatureChange,
            ChangeKindArg::BugFix => ChangeKind::BugFix,
            ChangeKindArg::DocEdit => ChangeKind::DocEdit,
        }
    }
}

/// Relationship risk level for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskLevelArg {
    /// Breakage is unlikely to matter
    Low,
    /// Default
    #[default]
    Medium,
    /// Breakage is likely to matter
    High,
}

impl std::fmt::Display for RiskLevelArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", RiskLevel::from(*self))
    }
}

impl From<RiskLevelArg> for RiskLevel {
    fn from(arg: RiskLevelArg) -> Self {
        match arg {
            RiskLevelArg::Low => RiskLevel::Low,
            RiskLevelArg::Medium => RiskLevel::Medium,
            RiskLevelArg::High => RiskLevel::High,
        }
    }
}
