//! Workspace configuration.
//!
//! A ripple workspace is a directory containing `.ripple/`, which holds
//! `config.yaml` and the JSONL graph snapshot. Missing keys take their
//! defaults, so an empty file is a valid configuration.

use crate::analysis::{DEFAULT_MAX_DEPTH, RiskConfig};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the workspace directory
pub const RIPPLE_DIR_NAME: &str = ".ripple";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the graph snapshot file
pub const DATA_FILE_NAME: &str = "graph.jsonl";

/// Largest accepted `default-depth`
pub const MAX_DEFAULT_DEPTH: usize = 16;

/// Maximum directory depth to traverse when searching for the workspace root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Contents of `.ripple/config.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RippleConfig {
    /// Traversal depth used when a command does not give one
    #[serde(rename = "default-depth")]
    pub default_depth: usize,

    /// Snapshot path, relative to the workspace root
    #[serde(rename = "data-file")]
    pub data_file: String,

    /// Risk scorer settings
    pub risk: RiskConfig,
}

impl Default for RippleConfig {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_MAX_DEPTH,
            data_file: format!("{RIPPLE_DIR_NAME}/{DATA_FILE_NAME}"),
            risk: RiskConfig::default(),
        }
    }
}

impl RippleConfig {
    /// Parse and validate YAML configuration text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed YAML and
    /// `ConfigError::InvalidValue` for out-of-range values.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // serde_yaml rejects an empty document, which should mean "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad key.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(1..=MAX_DEFAULT_DEPTH).contains(&self.default_depth) {
            return Err(ConfigError::InvalidValue {
                key: "default-depth".to_string(),
                reason: format!(
                    "must be between 1 and {MAX_DEFAULT_DEPTH}, got {}",
                    self.default_depth
                ),
            });
        }
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "data-file".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }
        self.risk.validate()
    }

    /// Absolute path of the snapshot for a workspace rooted at `root`.
    #[must_use]
    pub fn data_path(&self, root: &Path) -> PathBuf {
        root.join(&self.data_file)
    }
}

/// Find the workspace root by searching up the directory tree.
///
/// Returns the directory containing `.ripple/`, or `None` if there is none
/// within [`MAX_TRAVERSAL_DEPTH`] levels.
#[must_use]
pub fn find_ripple_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(RIPPLE_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

/// Path of the configuration file for a workspace rooted at `root`.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join(RIPPLE_DIR_NAME).join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RelationshipType;
    use crate::error::Error;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(RippleConfig::from_yaml("").unwrap(), RippleConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "default-depth: 5\nrisk:\n  weights:\n    related_to: 0.9\n";
        let config = RippleConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.default_depth, 5);
        assert_eq!(config.data_file, ".ripple/graph.jsonl");
        assert!((config.risk.type_weight(RelationshipType::RelatedTo) - 0.9).abs() < f64::EPSILON);
        assert!((config.risk.type_weight(RelationshipType::Blocks) - 1.0).abs() < f64::EPSILON);
        assert!((config.risk.thresholds.high - 0.66).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case::zero_depth("default-depth: 0", "default-depth")]
    #[case::deep("default-depth: 17", "default-depth")]
    #[case::threshold("risk:\n  thresholds:\n    high: 1.5", "risk.thresholds.high")]
    #[case::factor("risk:\n  factors:\n    low: -1", "risk.factors.low")]
    #[case::inverse_weight("risk:\n  weights:\n    described_by: 0.8", "risk.weights.described_by")]
    #[case::weight_above_blocks("risk:\n  weights:\n    tests: 1.2", "risk.weights.tests")]
    fn test_invalid_values(#[case] yaml: &str, #[case] key: &str) {
        let err = RippleConfig::from_yaml(yaml).unwrap_err();
        assert!(
            matches!(&err, Error::Config(ConfigError::InvalidValue { key: k, .. }) if k == key),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_unknown_weight_type_is_parse_error() {
        let err = RippleConfig::from_yaml("risk:\n  weights:\n    owns: 1.0").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);

        let mut original = RippleConfig::default();
        original.risk.weights.insert(RelationshipType::Fixes, 0.75);
        original.save(&path).await.unwrap();

        let loaded = RippleConfig::load(&path).await.unwrap();
        assert_eq!(original, loaded);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("default-depth: 3"));
        assert!(content.contains("data-file: .ripple/graph.jsonl"));
    }

    #[test]
    fn test_find_root_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(RIPPLE_DIR_NAME)).unwrap();
        let nested = temp_dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_ripple_root(&nested), Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_root_none_outside_workspace() {
        let temp_dir = TempDir::new().unwrap();
        // Tempdirs live under the system temp dir, which has no .ripple/
        assert!(find_ripple_root(temp_dir.path()).is_none());
    }
}
