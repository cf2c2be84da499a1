//! Ripple - change impact analysis over a graph of project artifacts.
//!
//! Requirements, features, bugs, code, tests and documents are stored as
//! typed entities connected by typed relationships. The [`engine::Engine`]
//! answers what a change touches: which tests to run, which documents are
//! stale, which features are at risk and how risky the change is overall.
//!
//! This crate provides both the `ripple` CLI and the library used by the
//! MCP server.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod analysis;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod id_generation;
pub mod store;

// Workspace handling
pub mod app;
pub mod config;
pub mod dispatch;
pub mod persistence;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

pub mod output;
