//! MCP server implementation.
//!
//! This module contains the main server setup using rmcp.

use crate::context::Context;
use crate::error::Error;
use crate::models::{
    AnalyzeImpactParams, GetEntityParams, IngestEntityParams, RegressionRiskParams,
    RelationshipParams, SearchParams, SetContextParams, StaleDocumentsParams, TraversalParams,
};
use crate::tools::Tools;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{
    ErrorData as McpError, ServiceExt, handler::server::ServerHandler, tool, tool_handler,
    tool_router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// The ripple MCP server.
///
/// Provides MCP protocol handling over stdio transport.
#[derive(Clone)]
pub struct RippleMcpServer {
    /// Shared context for workspace management.
    context: Arc<RwLock<Context>>,
    /// Tool implementations.
    tools: Arc<Tools>,
    /// Tool router for MCP dispatch.
    tool_router: ToolRouter<Self>,
}

/// Turn a tool outcome into an MCP result.
///
/// Rejected requests become `invalid_params` and carry the error kind in
/// `data`; everything else is an internal error.
fn respond<T: Serialize>(result: crate::error::Result<T>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => Ok(CallToolResult::success(vec![Content::json(value)?])),
        Err(e) => Err(to_mcp_error(&e)),
    }
}

fn to_mcp_error(e: &Error) -> McpError {
    let data = Some(json!({ "kind": e.kind() }));
    if e.is_invalid_request() {
        McpError::invalid_params(e.to_string(), data)
    } else {
        warn!(error = %e, "Tool call failed");
        McpError::internal_error(e.to_string(), data)
    }
}

#[tool_router]
impl RippleMcpServer {
    /// Set the workspace context for subsequent operations.
    #[tool(
        description = "Set the workspace root directory (containing .ripple/) for all subsequent operations. Call this first before using other tools."
    )]
    async fn set_context(
        &self,
        Parameters(params): Parameters<SetContextParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.set_context(&params.workspace_root).await)
    }

    /// Get current workspace context information.
    #[tool(description = "Show current workspace context and graph snapshot path. Useful for debugging.")]
    async fn where_am_i(&self) -> Result<CallToolResult, McpError> {
        respond(self.tools.where_am_i().await)
    }

    /// Create or refine an entity.
    #[tool(
        description = "Add a project artifact (requirement, feature, bug, code_change, test, test_result, feedback, document, code_file, test_coverage). Passing an existing id refines that entity. Returns the entity id."
    )]
    async fn ingest_entity(
        &self,
        Parameters(params): Parameters<IngestEntityParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.ingest_entity(params).await)
    }

    /// Add or update a relationship.
    #[tool(
        description = "Link two entities, e.g. T1 tests F1 or F1 documents D1. Paired types (documents, covers, imports, references) get their inverse automatically. Re-adding an edge updates its risk_level and weight."
    )]
    async fn ingest_relationship(
        &self,
        Parameters(params): Parameters<RelationshipParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.ingest_relationship(params).await)
    }

    /// Remove a relationship.
    #[tool(description = "Remove a relationship and its inverse. Reports whether anything was removed.")]
    async fn remove_relationship(
        &self,
        Parameters(params): Parameters<RelationshipParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.remove_relationship(params).await)
    }

    /// Show an entity and its relationships.
    #[tool(description = "Show an entity with its incoming and outgoing relationships.")]
    async fn get_entity(
        &self,
        Parameters(params): Parameters<GetEntityParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .get_entity(&params.entity_id, params.workspace_root.as_deref())
                .await,
        )
    }

    /// Full impact analysis of a change.
    #[tool(
        description = "Analyze a change to an entity: affected tests, stale documents, affected features, a risk score in [0, 1] with a low/medium/high level, and recommendations."
    )]
    async fn analyze_impact(
        &self,
        Parameters(params): Parameters<AnalyzeImpactParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.analyze_impact(params).await)
    }

    /// Bug impact analysis.
    #[tool(
        description = "Score a bug: severity points (trivial 1 to blocker 8) times the number of affected features, priority, estimated fix time, plus the tests and documents connected to it."
    )]
    async fn analyze_bug_impact(
        &self,
        Parameters(params): Parameters<TraversalParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .analyze_bug_impact(
                    &params.entity_id,
                    params.max_depth,
                    params.workspace_root.as_deref(),
                )
                .await,
        )
    }

    /// Tests affected by a change.
    #[tool(description = "List the tests to run after changing an entity, closest first.")]
    async fn recommend_tests(
        &self,
        Parameters(params): Parameters<TraversalParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .recommend_tests(
                    &params.entity_id,
                    params.max_depth,
                    params.workspace_root.as_deref(),
                )
                .await,
        )
    }

    /// Documents that need updating.
    #[tool(
        description = "List documents connected to an entity that were last updated before the change."
    )]
    async fn stale_documents(
        &self,
        Parameters(params): Parameters<StaleDocumentsParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(self.tools.stale_documents(params).await)
    }

    /// Everything connected to an entity.
    #[tool(
        description = "List entities connected to an entity through any relationship in either direction (max_depth 1-5, default 2)."
    )]
    async fn related_entities(
        &self,
        Parameters(params): Parameters<TraversalParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .related_entities(
                    &params.entity_id,
                    params.max_depth,
                    params.workspace_root.as_deref(),
                )
                .await,
        )
    }

    /// Combined risk of several changes.
    #[tool(
        description = "Assess the combined regression risk of several changed entities and build a test plan."
    )]
    async fn assess_regression_risk(
        &self,
        Parameters(params): Parameters<RegressionRiskParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .assess_regression_risk(
                    &params.changed_entities,
                    params.max_depth,
                    params.workspace_root.as_deref(),
                )
                .await,
        )
    }

    /// Text search.
    #[tool(description = "Find entities whose title or description contains the query (case-insensitive).")]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        respond(
            self.tools
                .search(&params.query, params.limit, params.workspace_root.as_deref())
                .await,
        )
    }
}

impl RippleMcpServer {
    /// Create a new ripple MCP server.
    #[must_use]
    pub fn new() -> Self {
        let context = Arc::new(RwLock::new(Context::new()));
        let tools = Arc::new(Tools::new(Arc::clone(&context)));

        Self {
            context,
            tools,
            tool_router: Self::tool_router(),
        }
    }

    /// Get a reference to the context.
    #[must_use]
    pub fn context(&self) -> &Arc<RwLock<Context>> {
        &self.context
    }

    /// Serve MCP requests over stdio until the client disconnects.
    ///
    /// # Errors
    ///
    /// Returns an error if the MCP handshake fails or the service task panics.
    pub async fn run(self) -> anyhow::Result<()> {
        let service = self.serve(rmcp::transport::stdio()).await?;
        let reason = service.waiting().await?;
        tracing::info!(?reason, "ripple-mcp server stopped");
        Ok(())
    }
}

impl Default for RippleMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for RippleMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "ripple-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Ripple MCP server for change impact analysis. Call set_context with a directory containing .ripple/ first, record artifacts with ingest_entity and ingest_relationship, then ask analyze_impact what a change affects."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripple::domain::EntityId;

    #[test]
    fn test_server_creation() {
        let server = RippleMcpServer::new();
        assert!(server.context().try_read().is_ok());
    }

    #[test]
    fn test_server_info() {
        let server = RippleMcpServer::default();
        let info = server.get_info();
        assert_eq!(info.server_info.name, "ripple-mcp");
        assert!(!info.server_info.version.is_empty());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn test_tool_router_has_all_tools() {
        let server = RippleMcpServer::new();
        let tools = server.tool_router.list_all();
        let tool_names: Vec<&str> = tools.iter().map(|t| &*t.name).collect();

        for expected in [
            "set_context",
            "where_am_i",
            "ingest_entity",
            "ingest_relationship",
            "remove_relationship",
            "get_entity",
            "analyze_impact",
            "analyze_bug_impact",
            "recommend_tests",
            "stale_documents",
            "related_entities",
            "assess_regression_risk",
            "search",
        ] {
            assert!(tool_names.contains(&expected), "missing tool {expected}");
        }
        assert_eq!(tools.len(), 13);
    }

    #[test]
    fn test_rejected_requests_map_to_invalid_params() {
        let err = Error::from(ripple::error::Error::NotFound(EntityId::new("ghost")));
        let mcp = to_mcp_error(&err);
        assert_eq!(mcp.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert_eq!(mcp.data, Some(json!({ "kind": "not_found_error" })));

        let mcp = to_mcp_error(&Error::Io(std::io::Error::other("disk full")));
        assert_eq!(mcp.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
    }
}
