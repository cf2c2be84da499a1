//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use chrono::{DateTime, Utc};
use clap::Parser;
use serde_json::Value;

use super::types::{ChangeKindArg, RiskLevelArg};
use super::validators::{
    parse_entity_kind, parse_json, parse_relationship_type, parse_timestamp, validate_entity_id,
    validate_title, validate_weight,
};
use crate::domain::{EntityKind, RelationshipType};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `add` command
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Entity kind (feature, test, code_file, document, ...)
    #[arg(value_parser = parse_entity_kind)]
    pub kind: EntityKind,

    /// Entity title (max 200 characters)
    #[arg(value_parser = validate_title)]
    pub title: String,

    /// Explicit entity ID
    ///
    /// An existing ID refines that entity in place. Without an ID one is
    /// generated from the kind and title.
    #[arg(long, value_parser = validate_entity_id)]
    pub id: Option<String>,

    /// Longer description
    #[arg(short = 'D', long)]
    pub description: Option<String>,

    /// Kind-specific attributes as a JSON object
    ///
    /// Example for a test: '{"test_type": "regression", "execution_secs": 2.5}'
    #[arg(short, long, value_parser = parse_json)]
    pub payload: Option<Value>,

    /// When the artifact last changed (RFC 3339 or YYYY-MM-DD, default now)
    #[arg(long, value_parser = parse_timestamp)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Arguments for the `link` command
#[derive(Parser, Debug, Clone)]
pub struct LinkArgs {
    /// Source entity ID
    #[arg(value_parser = validate_entity_id)]
    pub source: String,

    /// Relationship type (tests, depends_on, documents, ...)
    #[arg(value_parser = parse_relationship_type)]
    pub rel_type: RelationshipType,

    /// Target entity ID
    #[arg(value_parser = validate_entity_id)]
    pub target: String,

    /// Risk of breakage along this edge
    #[arg(short, long, value_enum, default_value_t = RiskLevelArg::Medium)]
    pub risk: RiskLevelArg,

    /// Edge weight between 0 and 1
    #[arg(short, long, value_parser = validate_weight, default_value = "1.0")]
    pub weight: f64,
}

/// Arguments for the `unlink` command
#[derive(Parser, Debug, Clone)]
pub struct UnlinkArgs {
    /// Source entity ID
    #[arg(value_parser = validate_entity_id)]
    pub source: String,

    /// Relationship type
    #[arg(value_parser = parse_relationship_type)]
    pub rel_type: RelationshipType,

    /// Target entity ID
    #[arg(value_parser = validate_entity_id)]
    pub target: String,
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Entity ID to show
    #[arg(value_parser = validate_entity_id)]
    pub id: String,
}

/// Arguments for the `impact` command
#[derive(Parser, Debug, Clone)]
pub struct ImpactArgs {
    /// Entity that changed
    #[arg(value_parser = validate_entity_id)]
    pub id: String,

    /// Kind of change
    #[arg(short, long, value_enum, default_value_t = ChangeKindArg::CodeChange)]
    pub change: ChangeKindArg,

    /// Maximum traversal depth (default from config)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// When the change happened (default: the entity's last update)
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

/// Arguments for the `bug` command
#[derive(Parser, Debug, Clone)]
pub struct BugArgs {
    /// Bug to analyze
    #[arg(value_parser = validate_entity_id)]
    pub id: String,

    /// Maximum traversal depth (default from config)
    #[arg(short, long)]
    pub depth: Option<usize>,
}

/// Arguments for the `tests` command
#[derive(Parser, Debug, Clone)]
pub struct TestsArgs {
    /// Entity that changed
    #[arg(value_parser = validate_entity_id)]
    pub id: String,

    /// Maximum traversal depth (default from config)
    #[arg(short, long)]
    pub depth: Option<usize>,
}

/// Arguments for the `stale` command
#[derive(Parser, Debug, Clone)]
pub struct StaleArgs {
    /// Entity whose documents to check
    #[arg(value_parser = validate_entity_id)]
    pub id: String,

    /// Reference time (default: the entity's last update)
    #[arg(long, value_parser = parse_timestamp)]
    pub since: Option<DateTime<Utc>>,

    /// Maximum traversal depth (default from config)
    #[arg(short, long)]
    pub depth: Option<usize>,
}

/// Arguments for the `related` command
#[derive(Parser, Debug, Clone)]
pub struct RelatedArgs {
    /// Entity to start from
    #[arg(value_parser = validate_entity_id)]
    pub id: String,

    /// Maximum traversal depth (1-5)
    #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub depth: u8,
}

/// Arguments for the `risk` command
#[derive(Parser, Debug, Clone)]
pub struct RiskArgs {
    /// Changed entity IDs
    #[arg(required = true, value_parser = validate_entity_id)]
    pub ids: Vec<String>,

    /// Maximum traversal depth (default from config)
    #[arg(short, long)]
    pub depth: Option<usize>,
}

/// Arguments for the `search` command
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Text to look for in titles and descriptions
    pub query: String,

    /// Maximum results (1-50)
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u8).range(1..=50))]
    pub limit: u8,
}

/// Arguments for the `call` command
#[derive(Parser, Debug, Clone)]
pub struct CallArgs {
    /// Operation name (see `ripple call --list`)
    #[arg(required_unless_present = "list")]
    pub operation: Option<String>,

    /// Arguments as a JSON object
    #[arg(value_parser = parse_json, default_value = "{}")]
    pub args: Value,

    /// List available operations
    #[arg(long)]
    pub list: bool,
}

/// Arguments for the `stats` command
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {}
