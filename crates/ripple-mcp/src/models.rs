//! MCP request and response models.
//!
//! Parameter structs carry the JSON Schema the tool router publishes.
//! Analysis results are returned as the engine's own serializable types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response from the `set_context` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetContextResponse {
    /// The workspace root that was set.
    pub workspace_root: String,

    /// The path to the graph snapshot.
    pub database_path: String,

    /// Snapshot lines skipped while loading.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_warnings: Vec<String>,

    /// Status message.
    pub message: String,
}

/// Response from the `where_am_i` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WhereAmIResponse {
    /// The current workspace root, if set.
    pub workspace_root: Option<String>,

    /// The current snapshot path, if set.
    pub database_path: Option<String>,

    /// Whether a context is currently set.
    pub context_set: bool,
}

/// Response from the `ingest_entity` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestEntityResponse {
    /// ID of the created or refined entity.
    pub entity_id: String,
}

/// Response from the relationship tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipResponse {
    /// Always true on success.
    pub ok: bool,

    /// Whether the graph changed: a new edge for `ingest_relationship`, a
    /// removed one for `remove_relationship`.
    pub changed: bool,
}

/// Parameters for `set_context`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetContextParams {
    /// Workspace root directory (must contain `.ripple/`).
    pub workspace_root: String,
}

/// Parameters for `ingest_entity`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestEntityParams {
    /// Entity kind: requirement, feature, bug, code_change, test,
    /// test_result, feedback, document, code_file or test_coverage.
    pub kind: String,

    /// Human-readable title.
    pub title: String,

    /// Explicit ID. Generated from the kind and title when omitted; an
    /// existing ID refines that entity.
    pub id: Option<String>,

    /// Longer description.
    pub description: Option<String>,

    /// Kind-specific fields, e.g. `{"test_type": "regression"}` for tests.
    pub payload: Option<Value>,

    /// When the artifact was last changed (RFC 3339). Defaults to now.
    pub updated_at: Option<String>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `ingest_relationship` and `remove_relationship`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipParams {
    /// Source entity ID.
    pub source_id: String,

    /// Relationship type, e.g. depends_on, tests, documents, covers.
    #[serde(alias = "type")]
    pub rel_type: String,

    /// Target entity ID.
    pub target_id: String,

    /// Risk level: low, medium (default) or high. Ignored on removal.
    pub risk_level: Option<String>,

    /// Weight in [0, 1] (default 1.0). Ignored on removal.
    pub weight: Option<f64>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `get_entity`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetEntityParams {
    /// Entity ID.
    pub entity_id: String,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `analyze_impact`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeImpactParams {
    /// The changed entity.
    pub entity_id: String,

    /// Change kind: code_change (default), feature_change, bug_fix or doc_edit.
    pub change_kind: Option<String>,

    /// Maximum hops to follow (defaults to the workspace setting).
    pub max_depth: Option<usize>,

    /// When the change was made (RFC 3339). Defaults to the entity's last update.
    pub changed_at: Option<String>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `recommend_tests` and `related_entities`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TraversalParams {
    /// Starting entity ID.
    pub entity_id: String,

    /// Maximum hops to follow.
    pub max_depth: Option<usize>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `stale_documents`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StaleDocumentsParams {
    /// The changed entity.
    pub entity_id: String,

    /// Documents updated before this time (RFC 3339) are stale. Defaults to
    /// the entity's last update.
    pub since: Option<String>,

    /// Maximum hops to follow (defaults to the workspace setting).
    pub max_depth: Option<usize>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `assess_regression_risk`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegressionRiskParams {
    /// IDs of every changed entity.
    pub changed_entities: Vec<String>,

    /// Maximum hops to follow (defaults to the workspace setting).
    pub max_depth: Option<usize>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

/// Parameters for `search`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Case-insensitive text to find in titles and descriptions.
    pub query: String,

    /// Maximum results, 1 to 50 (default 10).
    pub limit: Option<usize>,

    /// Workspace root (defaults to the current context).
    pub workspace_root: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relationship_params_accept_type_alias() {
        let params: RelationshipParams = serde_json::from_value(json!({
            "source_id": "T1",
            "type": "tests",
            "target_id": "F1"
        }))
        .unwrap();
        assert_eq!(params.rel_type, "tests");
        assert!(params.risk_level.is_none());
        assert!(params.workspace_root.is_none());
    }

    #[test]
    fn test_set_context_response_omits_empty_warnings() {
        let response = SetContextResponse {
            workspace_root: "/tmp/ws".to_string(),
            database_path: "/tmp/ws/.ripple/graph.jsonl".to_string(),
            load_warnings: Vec::new(),
            message: "Context set successfully".to_string(),
        };
        let value = serde_json::to_value(response).unwrap();
        assert!(value.get("load_warnings").is_none());
    }
}
