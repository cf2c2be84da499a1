use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared nature of a change submitted for impact analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Source code was modified
    CodeChange,
    /// A feature's behavior changed
    FeatureChange,
    /// A bug was fixed
    BugFix,
    /// Documentation was edited
    DocEdit,
}

impl ChangeKind {
    /// Wire name of the change kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeChange => "code_change",
            Self::FeatureChange => "feature_change",
            Self::BugFix => "bug_fix",
            Self::DocEdit => "doc_edit",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "code_change" => Ok(Self::CodeChange),
            "feature_change" => Ok(Self::FeatureChange),
            "bug_fix" => Ok(Self::BugFix),
            "doc_edit" => Ok(Self::DocEdit),
            _ => Err(Error::Validation(format!(
                "Invalid change kind: '{s}'. Must be one of: code_change, feature_change, bug_fix, doc_edit"
            ))),
        }
    }
}
