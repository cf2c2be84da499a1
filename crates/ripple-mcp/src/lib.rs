//! MCP server for ripple change impact analysis.
//!
//! Exposes the ripple engine as Model Context Protocol tools so AI
//! assistants can record project artifacts and ask what a change affects.
//!
//! # Tools
//!
//! - `set_context` / `where_am_i`: select and inspect the active workspace
//! - `ingest_entity`, `ingest_relationship`, `remove_relationship`: edit the graph
//! - `get_entity`, `search`: look things up
//! - `analyze_impact`, `recommend_tests`, `stale_documents`,
//!   `related_entities`, `assess_regression_risk`: analyses
//!
//! Mutating tools write `.ripple/graph.jsonl` before returning.

pub mod context;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;

pub use server::RippleMcpServer;
