//! MCP tool implementations.
//!
//! Each method resolves the target workspace, converts string arguments to
//! engine types and calls the engine. Mutating tools save the snapshot
//! through [`Workspace::mutate`].

use crate::context::{Context, Workspace};
use crate::error::{Error, Result};
use crate::models::{
    AnalyzeImpactParams, IngestEntityParams, IngestEntityResponse, RelationshipParams,
    RelationshipResponse, SetContextResponse, StaleDocumentsParams, WhereAmIResponse,
};
use chrono::{DateTime, Utc};
use ripple::analysis::{BugImpactReport, ImpactItem, ImpactReport, RegressionReport};
use ripple::cli::parse_timestamp;
use ripple::domain::{
    ChangeKind, EdgeAttrs, Entity, EntityId, EntityKind, NewEntity, Payload, RelationshipType,
    RiskLevel,
};
use ripple::engine::EntityDetails;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_RELATED_DEPTH: usize = 2;
const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Tool implementations for the ripple MCP server.
pub struct Tools {
    context: Arc<RwLock<Context>>,
}

impl Tools {
    /// Create a new Tools instance with the given context.
    pub fn new(context: Arc<RwLock<Context>>) -> Self {
        Self { context }
    }

    async fn workspace(&self, workspace_root: Option<&str>) -> Result<Arc<Workspace>> {
        let context = self.context.read().await;
        context.workspace_for(workspace_root.map(Path::new))
    }

    /// Set the workspace context.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace path is invalid, has no `.ripple/`
    /// directory or cannot be loaded.
    pub async fn set_context(&self, workspace_root: &str) -> Result<SetContextResponse> {
        let path = Path::new(workspace_root);
        let mut context = self.context.write().await;
        let info = context.set_workspace(path).await?;

        let message = if info.load_warnings.is_empty() {
            "Context set successfully".to_string()
        } else {
            format!(
                "Context set; {} snapshot line(s) were skipped",
                info.load_warnings.len()
            )
        };

        Ok(SetContextResponse {
            workspace_root: info.workspace_root.display().to_string(),
            database_path: info.database_path.display().to_string(),
            load_warnings: info.load_warnings,
            message,
        })
    }

    /// Get current workspace information.
    ///
    /// # Errors
    ///
    /// This function does not currently return errors but returns `Result` for API consistency.
    pub async fn where_am_i(&self) -> Result<WhereAmIResponse> {
        let context = self.context.read().await;

        Ok(match context.current_workspace() {
            Some(workspace) => WhereAmIResponse {
                workspace_root: Some(workspace.display().to_string()),
                database_path: context
                    .current_database_path()
                    .map(|p| p.display().to_string()),
                context_set: true,
            },
            None => WhereAmIResponse {
                workspace_root: None,
                database_path: None,
                context_set: false,
            },
        })
    }

    /// Create or refine an entity and save the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, an argument is invalid, the
    /// entity fails validation or the snapshot cannot be written.
    pub async fn ingest_entity(&self, params: IngestEntityParams) -> Result<IngestEntityResponse> {
        let workspace = self.workspace(params.workspace_root.as_deref()).await?;

        let kind = parse_entity_kind(&params.kind)?;
        let payload = match params.payload {
            Some(fields) => Some(Payload::from_json(kind, fields)?),
            None => None,
        };
        let new = NewEntity {
            id: params.id.map(EntityId::from),
            kind,
            title: params.title,
            description: params.description,
            payload,
            updated_at: parse_optional_timestamp("updated_at", params.updated_at.as_deref())?,
        };

        let id = workspace.mutate(|engine| engine.ingest_entity(new)).await?;
        Ok(IngestEntityResponse {
            entity_id: id.to_string(),
        })
    }

    /// Add or update a relationship and save the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, an argument is invalid, an
    /// endpoint does not exist or the edge is rejected.
    pub async fn ingest_relationship(
        &self,
        params: RelationshipParams,
    ) -> Result<RelationshipResponse> {
        let workspace = self.workspace(params.workspace_root.as_deref()).await?;

        let rel_type = parse_rel_type(&params.rel_type)?;
        let risk_level = match params.risk_level.as_deref() {
            Some(level) => level.parse::<RiskLevel>().map_err(|_| Error::InvalidArgument {
                field: "risk_level",
                value: level.to_string(),
                valid_values: "low, medium, high",
            })?,
            None => RiskLevel::default(),
        };
        let attrs = EdgeAttrs::new(risk_level, params.weight.unwrap_or(1.0));
        let source = EntityId::new(params.source_id.trim());
        let target = EntityId::new(params.target_id.trim());

        let created = workspace
            .mutate(|engine| engine.ingest_relationship(&source, rel_type, &target, attrs))
            .await?;
        Ok(RelationshipResponse {
            ok: true,
            changed: created,
        })
    }

    /// Remove a relationship and its inverse.
    ///
    /// The snapshot is saved whether or not an edge was present.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, the type is unknown or the
    /// snapshot cannot be written.
    pub async fn remove_relationship(
        &self,
        params: RelationshipParams,
    ) -> Result<RelationshipResponse> {
        let workspace = self.workspace(params.workspace_root.as_deref()).await?;

        let rel_type = parse_rel_type(&params.rel_type)?;
        let source = EntityId::new(params.source_id.trim());
        let target = EntityId::new(params.target_id.trim());

        let removed = workspace
            .mutate(|engine| Ok(engine.remove_relationship(&source, rel_type, &target)))
            .await?;
        Ok(RelationshipResponse {
            ok: true,
            changed: removed,
        })
    }

    /// Get an entity with its relationships.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the entity does not exist.
    pub async fn get_entity(
        &self,
        entity_id: &str,
        workspace_root: Option<&str>,
    ) -> Result<EntityDetails> {
        let workspace = self.workspace(workspace_root).await?;
        Ok(workspace.engine().get_entity(&EntityId::new(entity_id.trim()))?)
    }

    /// Analyze the impact of a change.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, an argument is invalid or the
    /// entity does not exist.
    pub async fn analyze_impact(&self, params: AnalyzeImpactParams) -> Result<ImpactReport> {
        let workspace = self.workspace(params.workspace_root.as_deref()).await?;

        let change_kind = match params.change_kind.as_deref() {
            Some(kind) => kind.parse::<ChangeKind>().map_err(|_| Error::InvalidArgument {
                field: "change_kind",
                value: kind.to_string(),
                valid_values: "code_change, feature_change, bug_fix, doc_edit",
            })?,
            None => ChangeKind::CodeChange,
        };
        let changed_at = parse_optional_timestamp("changed_at", params.changed_at.as_deref())?;
        let depth = params.max_depth.unwrap_or_else(|| workspace.default_depth());

        debug!(entity = %params.entity_id, %change_kind, depth, "Analyzing impact");
        Ok(workspace.engine().analyze_impact_at(
            &EntityId::new(params.entity_id.trim()),
            change_kind,
            depth,
            changed_at,
        )?)
    }

    /// Tests to run after a change, closest first.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the entity does not exist.
    pub async fn recommend_tests(
        &self,
        entity_id: &str,
        max_depth: Option<usize>,
        workspace_root: Option<&str>,
    ) -> Result<Vec<ImpactItem>> {
        let workspace = self.workspace(workspace_root).await?;
        let depth = max_depth.unwrap_or_else(|| workspace.default_depth());
        Ok(workspace
            .engine()
            .recommend_tests(&EntityId::new(entity_id.trim()), depth)?)
    }

    /// Severity-weighted impact of a bug.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, the entity does not exist or
    /// is not a bug.
    pub async fn analyze_bug_impact(
        &self,
        bug_id: &str,
        max_depth: Option<usize>,
        workspace_root: Option<&str>,
    ) -> Result<BugImpactReport> {
        let workspace = self.workspace(workspace_root).await?;
        let depth = max_depth.unwrap_or_else(|| workspace.default_depth());
        Ok(workspace
            .engine()
            .analyze_bug_impact(&EntityId::new(bug_id.trim()), depth)?)
    }

    /// Documents last updated before a change.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set, `since` is malformed or the
    /// entity does not exist.
    pub async fn stale_documents(&self, params: StaleDocumentsParams) -> Result<Vec<ImpactItem>> {
        let workspace = self.workspace(params.workspace_root.as_deref()).await?;
        let since = parse_optional_timestamp("since", params.since.as_deref())?;
        let depth = params.max_depth.unwrap_or_else(|| workspace.default_depth());
        Ok(workspace.engine().stale_documents(
            &EntityId::new(params.entity_id.trim()),
            since,
            depth,
        )?)
    }

    /// Everything connected to an entity, in either direction.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or the entity does not exist.
    pub async fn related_entities(
        &self,
        entity_id: &str,
        max_depth: Option<usize>,
        workspace_root: Option<&str>,
    ) -> Result<Vec<ImpactItem>> {
        let workspace = self.workspace(workspace_root).await?;
        Ok(workspace.engine().related_entities(
            &EntityId::new(entity_id.trim()),
            max_depth.unwrap_or(DEFAULT_RELATED_DEPTH),
        )?)
    }

    /// Combined regression risk of several changes.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set or an ID does not exist.
    pub async fn assess_regression_risk(
        &self,
        changed_entities: &[String],
        max_depth: Option<usize>,
        workspace_root: Option<&str>,
    ) -> Result<RegressionReport> {
        let workspace = self.workspace(workspace_root).await?;
        let ids: Vec<EntityId> = changed_entities
            .iter()
            .map(|id| EntityId::new(id.trim()))
            .collect();
        let depth = max_depth.unwrap_or_else(|| workspace.default_depth());
        Ok(workspace.engine().assess_regression_risk(&ids, depth)?)
    }

    /// Search entity titles and descriptions.
    ///
    /// # Errors
    ///
    /// Returns an error if no context is set.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        workspace_root: Option<&str>,
    ) -> Result<Vec<Entity>> {
        let workspace = self.workspace(workspace_root).await?;
        Ok(workspace
            .engine()
            .search(query, limit.unwrap_or(DEFAULT_SEARCH_LIMIT)))
    }
}

fn parse_entity_kind(value: &str) -> Result<EntityKind> {
    value.parse().map_err(|_| Error::InvalidArgument {
        field: "kind",
        value: value.to_string(),
        valid_values: "requirement, feature, bug, code_change, test, test_result, feedback, document, code_file, test_coverage",
    })
}

fn parse_rel_type(value: &str) -> Result<RelationshipType> {
    value.parse().map_err(|_| Error::InvalidArgument {
        field: "rel_type",
        value: value.to_string(),
        valid_values: "depends_on, conflicts_with, enhances, blocks, related_to, implements, tests, fixes, caused_by, documents, described_by, covers, covered_by, imports, imported_by, references, referenced_by",
    })
}

fn parse_optional_timestamp(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>> {
    value
        .map(|s| {
            parse_timestamp(s).map_err(|_| Error::InvalidArgument {
                field,
                value: s.to_string(),
                valid_values: "RFC 3339 timestamp or YYYY-MM-DD",
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::hyphenated("code-file", EntityKind::CodeFile)]
    #[case::uppercase("TEST", EntityKind::Test)]
    fn test_parse_entity_kind(#[case] input: &str, #[case] expected: EntityKind) {
        assert_eq!(parse_entity_kind(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_entity_kind_invalid() {
        let err = parse_entity_kind("spaceship").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { field: "kind", .. }));
    }

    #[test]
    fn test_parse_rel_type_invalid_lists_types() {
        let err = parse_rel_type("likes").unwrap_err();
        assert!(err.to_string().contains("referenced_by"));
    }

    #[rstest]
    #[case::absent(None, true)]
    #[case::date(Some("2024-03-01"), true)]
    #[case::rfc3339(Some("2024-03-01T09:00:00Z"), true)]
    #[case::garbage(Some("yesterday"), false)]
    fn test_parse_optional_timestamp(#[case] input: Option<&str>, #[case] ok: bool) {
        assert_eq!(parse_optional_timestamp("since", input).is_ok(), ok);
    }
}
