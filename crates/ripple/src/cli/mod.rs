//! CLI argument parsing and command dispatch.
//!
//! This module provides the command-line interface for ripple using clap's derive API.
//! Each command has its own argument struct with validation and helpful error messages.
//!
//! # Commands
//!
//! - `init`: Initialize a ripple workspace
//! - `add`: Add or refine an entity
//! - `link` / `unlink`: Add or remove a relationship
//! - `show`: Show an entity and its relationships
//! - `impact`: Analyze the impact of a change
//! - `bug`: Score a bug by severity and reach
//! - `tests`: Recommend tests for a change
//! - `stale`: Find documents that need updating
//! - `related`: List everything connected to an entity
//! - `risk`: Assess regression risk of several changes
//! - `search`: Find entities by text
//! - `stats`: Show graph counts
//! - `call`: Run any operation by name with JSON arguments
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! ripple add feature "Login" --id F1
//! ripple add test "Login test" --id T1 --payload '{"test_type": "regression"}'
//! ripple link T1 tests F1 --risk high
//! ripple impact F1 --change feature_change
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    AddArgs, BugArgs, CallArgs, ImpactArgs, InitArgs, LinkArgs, RelatedArgs, RiskArgs, SearchArgs,
    ShowArgs, StaleArgs, StatsArgs, TestsArgs, UnlinkArgs,
};
pub use types::{ChangeKindArg, RiskLevelArg};
pub use validators::{parse_timestamp, validate_entity_id, validate_title, validate_weight};

/// Ripple - change impact analysis for project artifacts
///
/// Track requirements, features, code, tests and documents as a graph and
/// ask what a change affects. The graph is stored in `.ripple/graph.jsonl`.
#[derive(Parser, Debug)]
#[command(name = "ripple")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a ripple workspace
    ///
    /// Creates the `.ripple/` directory with configuration and an empty graph.
    Init(InitArgs),

    /// Add an entity, or refine an existing one by ID
    Add(AddArgs),

    /// Add a relationship (the inverse is maintained automatically)
    Link(LinkArgs),

    /// Remove a relationship and its inverse
    Unlink(UnlinkArgs),

    /// Show an entity with its incoming and outgoing relationships
    Show(ShowArgs),

    /// Analyze which tests, documents and features a change affects
    Impact(ImpactArgs),

    /// Score a bug by severity and the features it touches
    ///
    /// Also estimates the fix time and lists the tests and documents to
    /// revisit.
    Bug(BugArgs),

    /// Recommend tests to run after a change, closest first
    Tests(TestsArgs),

    /// Find documents last updated before the change
    Stale(StaleArgs),

    /// List entities connected to an entity through any relationship
    Related(RelatedArgs),

    /// Assess the combined regression risk of several changes
    Risk(RiskArgs),

    /// Search entity titles and descriptions
    Search(SearchArgs),

    /// Show entity and relationship counts
    Stats(StatsArgs),

    /// Run an operation by name with JSON arguments
    ///
    /// Output is always JSON. Use `--list` to see available operations.
    Call(CallArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("ripple {}", env!("CARGO_PKG_VERSION"));
            println!("Run 'ripple --help' for usage information.");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Add(args) => execute::execute_add(&app, args, output_mode).await,
            Commands::Link(args) => execute::execute_link(&app, args, output_mode).await,
            Commands::Unlink(args) => execute::execute_unlink(&app, args, output_mode).await,
            Commands::Show(args) => execute::execute_show(&app, args, output_mode).await,
            Commands::Impact(args) => execute::execute_impact(&app, args, output_mode).await,
            Commands::Bug(args) => execute::execute_bug(&app, args, output_mode).await,
            Commands::Tests(args) => execute::execute_tests(&app, args, output_mode).await,
            Commands::Stale(args) => execute::execute_stale(&app, args, output_mode).await,
            Commands::Related(args) => execute::execute_related(&app, args, output_mode).await,
            Commands::Risk(args) => execute::execute_risk(&app, args, output_mode).await,
            Commands::Search(args) => execute::execute_search(&app, args, output_mode).await,
            Commands::Stats(args) => execute::execute_stats(&app, args, output_mode).await,
            Commands::Call(args) => execute::execute_call(&app, args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityKind, RelationshipType};
    use rstest::rstest;

    #[test]
    fn test_no_command() {
        let cli = Cli::try_parse_from(["ripple"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_global_json_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["ripple", "stats", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Some(Commands::Stats(_))));
    }

    #[test]
    fn test_add_parses_kind_and_options() {
        let cli = Cli::try_parse_from([
            "ripple",
            "add",
            "test",
            "Login test",
            "--id",
            "T1",
            "--payload",
            r#"{"test_type": "regression"}"#,
            "--updated-at",
            "2024-03-01",
        ])
        .unwrap();
        let Some(Commands::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.kind, EntityKind::Test);
        assert_eq!(args.title, "Login test");
        assert_eq!(args.id.as_deref(), Some("T1"));
        assert_eq!(args.payload.unwrap()["test_type"], "regression");
        assert!(args.updated_at.is_some());
    }

    #[test]
    fn test_link_defaults() {
        let cli = Cli::try_parse_from(["ripple", "link", "T1", "tests", "F1"]).unwrap();
        let Some(Commands::Link(args)) = cli.command else {
            panic!("expected link command");
        };
        assert_eq!(args.rel_type, RelationshipType::Tests);
        assert_eq!(args.risk, RiskLevelArg::Medium);
        assert!((args.weight - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_impact_change_kind() {
        let cli =
            Cli::try_parse_from(["ripple", "impact", "F1", "--change", "bug-fix", "-d", "2"])
                .unwrap();
        let Some(Commands::Impact(args)) = cli.command else {
            panic!("expected impact command");
        };
        assert_eq!(args.change, ChangeKindArg::BugFix);
        assert_eq!(args.depth, Some(2));
    }

    #[test]
    fn test_bug_command() {
        let cli = Cli::try_parse_from(["ripple", "bug", "B1", "--depth", "4", "--json"]).unwrap();
        let Some(Commands::Bug(args)) = cli.command else {
            panic!("expected bug command");
        };
        assert_eq!(args.id, "B1");
        assert_eq!(args.depth, Some(4));
        assert!(cli.json);
    }

    #[rstest]
    #[case::bad_kind(&["ripple", "add", "spaceship", "x"])]
    #[case::empty_title(&["ripple", "add", "feature", ""])]
    #[case::bad_rel_type(&["ripple", "link", "A", "likes", "B"])]
    #[case::bad_weight(&["ripple", "link", "A", "tests", "B", "--weight", "2"])]
    #[case::related_too_deep(&["ripple", "related", "A", "--depth", "6"])]
    #[case::search_limit_zero(&["ripple", "search", "x", "--limit", "0"])]
    #[case::risk_without_ids(&["ripple", "risk"])]
    #[case::call_without_operation(&["ripple", "call"])]
    fn test_rejected_at_parse_time(#[case] argv: &[&str]) {
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_call_list_needs_no_operation() {
        let cli = Cli::try_parse_from(["ripple", "call", "--list"]).unwrap();
        let Some(Commands::Call(args)) = cli.command else {
            panic!("expected call command");
        };
        assert!(args.list);
        assert!(args.operation.is_none());
        assert_eq!(args.args, serde_json::json!({}));
    }
}
