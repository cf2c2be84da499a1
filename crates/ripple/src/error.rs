//! Error types for ripple operations.
//!
//! Engine calls fail with one of three kinds: [`Error::Validation`],
//! [`Error::NotFound`] and [`Error::InvalidEdge`]. The remaining variants
//! belong to the ambient layers (configuration, persistence, I/O).

use crate::domain::{EntityId, RelationshipType};
use std::io;
use thiserror::Error;

/// The error type for ripple operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed entity, unknown kind or unparsable enum value.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Reference to an entity id that does not exist.
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    /// Relationship rejected by the index.
    #[error("Invalid edge {source_id} --{rel_type}--> {target_id}: {reason}")]
    InvalidEdge {
        /// Source entity of the rejected edge.
        source_id: EntityId,
        /// Relationship type of the rejected edge.
        rel_type: RelationshipType,
        /// Target entity of the rejected edge.
        target_id: EntityId,
        /// Why the edge was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while locating or loading a ripple workspace.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.ripple/` directory between the working directory and the root.
    #[error("Not a ripple workspace (or any parent up to the root). Run 'ripple init' first.")]
    NotInitialized,

    /// A `.ripple/` directory already exists.
    #[error("Ripple workspace already initialized at {0}")]
    AlreadyInitialized(String),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue {
        /// Dotted key of the offending value.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

/// A specialized Result type for ripple operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable name of the error kind, surfaced by host layers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found_error",
            Self::InvalidEdge { .. } => "invalid_edge_error",
            Self::Config(_) => "config_error",
            Self::Storage(_) => "storage_error",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }

    pub(crate) fn invalid_edge(
        source_id: &EntityId,
        rel_type: RelationshipType,
        target_id: &EntityId,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEdge {
            source_id: source_id.clone(),
            rel_type,
            target_id: target_id.clone(),
            reason: reason.into(),
        }
    }
}
