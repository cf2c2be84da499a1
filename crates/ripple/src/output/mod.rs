//! Output formatting for CLI commands.
//!
//! Every result can be printed as human-readable text or as JSON for
//! programmatic use. Text rendering writes to any [`Write`] so it can be
//! tested without a terminal.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers

pub mod color;

use crate::analysis::{BugImpactReport, ImpactItem, ImpactReport, RegressionReport, TestPlan};
use crate::domain::{Entity, Relationship};
use crate::engine::{EntityDetails, GraphStats};
use crate::graph::PathStep;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};

use color::{bold, colorize_id, colorize_rel_type, colorize_risk, dimmed};

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create an OutputConfig by reading from environment variables.
    ///
    /// Reads:
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `RIPPLE_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("RIPPLE_COLOR")
                .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true);
        Self { use_colors }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { use_colors: true }
    }
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print an entity with its relationships (for the show command)
pub fn print_entity_details(details: &EntityDetails, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_entity_details(&mut handle, details, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, details),
    }
}

/// Print a list of entities (for the search command)
pub fn print_entities(entities: &[Entity], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_entities(&mut handle, entities, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, &entities),
    }
}

/// Print a titled list of reached entities
pub fn print_items(title: &str, items: &[ImpactItem], mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_items(&mut handle, title, items, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, &items),
    }
}

/// Print an impact report
pub fn print_impact_report(report: &ImpactReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_impact_report(&mut handle, report, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print a regression risk report
pub fn print_regression_report(report: &RegressionReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => {
            write_regression_report(&mut handle, report, &OutputConfig::from_env())
        }
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print a bug impact report
pub fn print_bug_report(report: &BugImpactReport, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => write_bug_report(&mut handle, report, &OutputConfig::from_env()),
        OutputMode::Json => write_json(&mut handle, report),
    }
}

/// Print graph counts
pub fn print_stats(stats: &GraphStats, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    match mode {
        OutputMode::Text => writeln!(
            handle,
            "{} entities, {} relationships",
            stats.entities, stats.relationships
        ),
        OutputMode::Json => write_json(&mut handle, stats),
    }
}

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{msg}")
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(w, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

/// Render a path as `start -type-> next <-type- next`.
fn format_path(path: &[PathStep], config: &OutputConfig) -> String {
    let Some(first) = path.first() else {
        return String::new();
    };
    let mut out = first.from.to_string();
    for step in path {
        let rel = colorize_rel_type(step.rel_type, config);
        if step.reversed {
            out.push_str(&format!(" <-{rel}- {}", step.to));
        } else {
            out.push_str(&format!(" -{rel}-> {}", step.to));
        }
    }
    out
}

fn write_relationship<W: Write>(
    w: &mut W,
    rel: &Relationship,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "  {} {} {} {}",
        colorize_id(rel.source_id.as_str(), config),
        colorize_rel_type(rel.rel_type, config),
        colorize_id(rel.target_id.as_str(), config),
        dimmed(
            &format!("[{} risk, weight {:.2}]", rel.attrs.risk_level, rel.attrs.weight),
            config
        ),
    )
}

fn write_entity_details<W: Write>(
    w: &mut W,
    details: &EntityDetails,
    config: &OutputConfig,
) -> io::Result<()> {
    let entity = &details.entity;
    writeln!(
        w,
        "{} {} {}",
        colorize_id(entity.id.as_str(), config),
        dimmed(&format!("[{}]", entity.kind), config),
        bold(&entity.title, config)
    )?;
    if let Some(description) = &entity.description {
        writeln!(w, "  {description}")?;
    }
    writeln!(
        w,
        "  {} {}",
        dimmed("Updated:", config),
        entity.last_updated_at.to_rfc3339()
    )?;

    for (title, rels) in [("Outgoing", &details.outgoing), ("Incoming", &details.incoming)] {
        if rels.is_empty() {
            continue;
        }
        writeln!(w)?;
        writeln!(w, "{} ({}):", bold(title, config), rels.len())?;
        for rel in rels {
            write_relationship(w, rel, config)?;
        }
    }
    Ok(())
}

fn write_entities<W: Write>(w: &mut W, entities: &[Entity], config: &OutputConfig) -> io::Result<()> {
    if entities.is_empty() {
        return writeln!(w, "No matching entities.");
    }
    for entity in entities {
        writeln!(
            w,
            "{} {} {}",
            colorize_id(entity.id.as_str(), config),
            dimmed(&format!("[{}]", entity.kind), config),
            entity.title
        )?;
    }
    Ok(())
}

fn write_items<W: Write>(
    w: &mut W,
    title: &str,
    items: &[ImpactItem],
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{} ({}):", bold(title, config), items.len())?;
    if items.is_empty() {
        return writeln!(w, "  {}", dimmed("none", config));
    }
    for item in items {
        writeln!(
            w,
            "  {} {} {} {}",
            colorize_id(item.id.as_str(), config),
            dimmed(&format!("[{}]", item.kind), config),
            item.title,
            dimmed(&format!("(distance {})", item.distance), config),
        )?;
        writeln!(w, "    {}", dimmed(&format_path(&item.path, config), config))?;
        if let Some(review) = &item.review {
            writeln!(
                w,
                "    {}",
                warning(
                    &format!(
                        "{} days behind, staleness {:.1}/10, {} priority",
                        review.days_behind, review.staleness, review.priority
                    ),
                    config
                )
            )?;
        }
    }
    Ok(())
}

fn write_test_plan_summary<W: Write>(w: &mut W, plan: &TestPlan) -> io::Result<()> {
    writeln!(
        w,
        "Test plan: {} tests ({} critical, {} regression, {} unit), ~{:.1}s",
        plan.tests.len(),
        plan.critical_tests,
        plan.regression_tests,
        plan.unit_tests,
        plan.estimated_secs
    )
}

fn write_recommendations<W: Write>(
    w: &mut W,
    recommendations: &[String],
    config: &OutputConfig,
) -> io::Result<()> {
    if recommendations.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{}:", bold("Recommendations", config))?;
    for rec in recommendations {
        writeln!(w, "  - {rec}")?;
    }
    Ok(())
}

fn write_impact_report<W: Write>(
    w: &mut W,
    report: &ImpactReport,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Impact of {} on {} (depth {})",
        report.change_kind,
        colorize_id(report.entity_id.as_str(), config),
        report.max_depth
    )?;
    writeln!(
        w,
        "Risk: {} {}",
        colorize_risk(report.risk_level, config),
        dimmed(&format!("(score {:.2})", report.risk_score), config)
    )?;
    writeln!(w)?;
    write_items(w, "Affected tests", &report.affected_tests, config)?;
    write_items(w, "Stale documents", &report.affected_docs, config)?;
    write_items(w, "Affected features", &report.affected_features, config)?;
    write_recommendations(w, &report.recommendations, config)
}

fn write_regression_report<W: Write>(
    w: &mut W,
    report: &RegressionReport,
    config: &OutputConfig,
) -> io::Result<()> {
    let changed: Vec<_> = report
        .changed
        .iter()
        .map(|id| colorize_id(id.as_str(), config))
        .collect();
    writeln!(w, "Regression risk for {}", changed.join(", "))?;
    writeln!(
        w,
        "Risk: {} {}",
        colorize_risk(report.risk_level, config),
        dimmed(&format!("(score {:.2})", report.risk_score), config)
    )?;
    let plan = &report.test_plan;
    write_test_plan_summary(w, plan)?;
    writeln!(w)?;
    write_items(w, "Tests to run", &plan.tests, config)?;
    write_items(w, "Documents to update", &report.documents_to_update, config)?;
    write_items(w, "Features at risk", &report.features_at_risk, config)?;
    write_recommendations(w, &report.recommendations, config)
}

fn write_bug_report<W: Write>(
    w: &mut W,
    report: &BugImpactReport,
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(
        w,
        "Bug impact of {} {}",
        colorize_id(report.bug_id.as_str(), config),
        dimmed(&format!("[{}]", report.severity), config)
    )?;
    writeln!(
        w,
        "Impact score: {} ({} priority), estimated fix time {}",
        bold(&report.impact_score.to_string(), config),
        report.priority,
        report.estimated_fix_time.as_str()
    )?;
    writeln!(
        w,
        "Risk: {} {}",
        colorize_risk(report.risk_level, config),
        dimmed(&format!("(score {:.2})", report.risk_score), config)
    )?;
    write_test_plan_summary(w, &report.test_plan)?;
    writeln!(w)?;
    write_items(w, "Affected features", &report.affected_features, config)?;
    write_items(w, "Tests to run", &report.test_plan.tests, config)?;
    write_items(w, "Documents to review", &report.documents_to_review, config)
}
