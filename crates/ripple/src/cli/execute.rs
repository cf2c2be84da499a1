//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands. Mutating
//! commands save the snapshot before printing their result.

use anyhow::Result;

use super::args::{
    AddArgs, BugArgs, CallArgs, ImpactArgs, InitArgs, LinkArgs, RelatedArgs, RiskArgs, SearchArgs,
    ShowArgs, StaleArgs, StatsArgs, TestsArgs, UnlinkArgs,
};
use crate::app::App;
use crate::dispatch::Registry;
use crate::domain::{EdgeAttrs, EntityId, NewEntity, Payload};
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!("Initializing ripple workspace...");
    }

    let result = init::init(&current_dir).await?;

    if !args.quiet {
        println!("Initialized ripple in {}", result.ripple_dir.display());
        println!("  Config: {}", result.config_file.display());
        println!("  Graph:  {}", result.data_file.display());
    }

    Ok(())
}

/// Execute the add command
pub async fn execute_add(app: &App, args: &AddArgs, output_mode: OutputMode) -> Result<()> {
    let payload = match &args.payload {
        Some(value) => Some(Payload::from_json(args.kind, value.clone())?),
        None => None,
    };
    let new = NewEntity {
        id: args.id.clone().map(EntityId::from),
        kind: args.kind,
        title: args.title.clone(),
        description: args.description.clone(),
        payload,
        updated_at: args.updated_at,
    };

    let id = app.engine().ingest_entity(new)?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({ "entity_id": id }))?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!("{} {id}", output::success("Saved", &config));
        }
    }
    Ok(())
}

/// Execute the link command
pub async fn execute_link(app: &App, args: &LinkArgs, output_mode: OutputMode) -> Result<()> {
    let source = EntityId::new(&args.source);
    let target = EntityId::new(&args.target);
    let attrs = EdgeAttrs::new(args.risk.into(), args.weight);

    let created = app
        .engine()
        .ingest_relationship(&source, args.rel_type, &target, attrs)?;
    app.save().await?;

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({ "ok": true, "created": created }))?;
        }
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            let verb = if created { "Linked" } else { "Updated" };
            println!(
                "{} {source} {} {target}",
                output::success(verb, &config),
                args.rel_type
            );
        }
    }
    Ok(())
}

/// Execute the unlink command
pub async fn execute_unlink(app: &App, args: &UnlinkArgs, output_mode: OutputMode) -> Result<()> {
    let source = EntityId::new(&args.source);
    let target = EntityId::new(&args.target);

    let removed = app
        .engine()
        .remove_relationship(&source, args.rel_type, &target);
    if removed {
        app.save().await?;
    }

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({ "ok": true, "removed": removed }))?;
        }
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            if removed {
                println!(
                    "{} {source} {} {target}",
                    output::success("Unlinked", &config),
                    args.rel_type
                );
            } else {
                println!(
                    "{} no {} relationship from {source} to {target}",
                    output::warning("Nothing to remove:", &config),
                    args.rel_type
                );
            }
        }
    }
    Ok(())
}

/// Execute the show command
pub async fn execute_show(app: &App, args: &ShowArgs, output_mode: OutputMode) -> Result<()> {
    let details = app.engine().get_entity(&EntityId::new(&args.id))?;
    output::print_entity_details(&details, output_mode)?;
    Ok(())
}

/// Execute the impact command
pub async fn execute_impact(app: &App, args: &ImpactArgs, output_mode: OutputMode) -> Result<()> {
    let report = app.engine().analyze_impact_at(
        &EntityId::new(&args.id),
        args.change.into(),
        args.depth.unwrap_or(app.config().default_depth),
        args.at,
    )?;
    output::print_impact_report(&report, output_mode)?;
    Ok(())
}

/// Execute the bug command
pub async fn execute_bug(app: &App, args: &BugArgs, output_mode: OutputMode) -> Result<()> {
    let report = app.engine().analyze_bug_impact(
        &EntityId::new(&args.id),
        args.depth.unwrap_or(app.config().default_depth),
    )?;
    output::print_bug_report(&report, output_mode)?;
    Ok(())
}

/// Execute the tests command
pub async fn execute_tests(app: &App, args: &TestsArgs, output_mode: OutputMode) -> Result<()> {
    let tests = app.engine().recommend_tests(
        &EntityId::new(&args.id),
        args.depth.unwrap_or(app.config().default_depth),
    )?;
    output::print_items("Recommended tests", &tests, output_mode)?;
    Ok(())
}

/// Execute the stale command
pub async fn execute_stale(app: &App, args: &StaleArgs, output_mode: OutputMode) -> Result<()> {
    let docs = app.engine().stale_documents(
        &EntityId::new(&args.id),
        args.since,
        args.depth.unwrap_or(app.config().default_depth),
    )?;
    output::print_items("Stale documents", &docs, output_mode)?;
    Ok(())
}

/// Execute the related command
pub async fn execute_related(app: &App, args: &RelatedArgs, output_mode: OutputMode) -> Result<()> {
    let related = app
        .engine()
        .related_entities(&EntityId::new(&args.id), usize::from(args.depth))?;
    output::print_items("Related entities", &related, output_mode)?;
    Ok(())
}

/// Execute the risk command
pub async fn execute_risk(app: &App, args: &RiskArgs, output_mode: OutputMode) -> Result<()> {
    let ids: Vec<EntityId> = args.ids.iter().map(EntityId::new).collect();
    let report = app
        .engine()
        .assess_regression_risk(&ids, args.depth.unwrap_or(app.config().default_depth))?;
    output::print_regression_report(&report, output_mode)?;
    Ok(())
}

/// Execute the search command
pub async fn execute_search(app: &App, args: &SearchArgs, output_mode: OutputMode) -> Result<()> {
    let entities = app.engine().search(&args.query, usize::from(args.limit));
    output::print_entities(&entities, output_mode)?;
    Ok(())
}

/// Execute the stats command
pub async fn execute_stats(app: &App, _args: &StatsArgs, output_mode: OutputMode) -> Result<()> {
    output::print_stats(&app.engine().stats(), output_mode)?;
    Ok(())
}

/// Execute the call command
///
/// Results are always printed as JSON.
pub async fn execute_call(app: &App, args: &CallArgs) -> Result<()> {
    let registry = app.registry();
    let Some(operation) = args.operation.as_deref().filter(|_| !args.list) else {
        for name in registry.operations() {
            let marker = if Registry::is_mutating(name) { " (mutating)" } else { "" };
            println!("{name}{marker}");
        }
        return Ok(());
    };

    let result = registry.call(app.engine(), operation, args.args.clone())?;
    if Registry::is_mutating(operation) {
        app.save().await?;
    }
    output::print_json(&result)?;
    Ok(())
}
