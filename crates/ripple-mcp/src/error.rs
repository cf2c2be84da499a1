//! Error types for the ripple MCP server.

use thiserror::Error;

/// Errors that can occur in the ripple MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// No workspace context has been set.
    #[error("No workspace context set. Call set_context first.")]
    NoContext,

    /// Invalid argument value provided.
    #[error("Invalid {field}: '{value}'. Valid values: {valid_values}")]
    InvalidArgument {
        /// The field name that had an invalid value.
        field: &'static str,
        /// The invalid value that was provided.
        value: String,
        /// Description of valid values.
        valid_values: &'static str,
    },

    /// The specified workspace was not found or path is invalid.
    #[error("Workspace not found: {path}")]
    WorkspaceNotFound {
        /// The path that was not found.
        path: String,
        /// The underlying IO error, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// Workspace exists but was not loaded via `set_context`.
    #[error("Workspace not initialized: {0}. Call set_context first.")]
    WorkspaceNotInitialized(String),

    /// Failed to discover a ripple workspace.
    #[error("No .ripple directory found in {0} or parent directories")]
    NoRippleDirectory(String),

    /// An error from the ripple engine or its persistence layer.
    #[error(transparent)]
    Engine(#[from] ripple::error::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoContext => "no_context",
            Self::InvalidArgument { .. } => "validation_error",
            Self::WorkspaceNotFound { .. } | Self::NoRippleDirectory(_) => "workspace_not_found",
            Self::WorkspaceNotInitialized(_) => "workspace_not_initialized",
            Self::Engine(e) => e.kind(),
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    /// Whether the caller sent something the engine rejected, as opposed to
    /// the server failing.
    #[must_use]
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::NoContext
                | Self::InvalidArgument { .. }
                | Self::WorkspaceNotFound { .. }
                | Self::WorkspaceNotInitialized(_)
                | Self::NoRippleDirectory(_)
                | Self::Engine(
                    ripple::error::Error::Validation(_)
                        | ripple::error::Error::NotFound(_)
                        | ripple::error::Error::InvalidEdge { .. }
                )
        )
    }
}

/// Result type for ripple MCP operations.
pub type Result<T> = std::result::Result<T, Error>;
