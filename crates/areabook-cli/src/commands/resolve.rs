use areabook_core::{Resolution, ResolutionStrategy};
use chrono::Utc;

use crate::cli::StrategyArg;
use crate::commands::common::{
    conflict_to_item, format_conflict_lines, parse_conflict_id, print_json, ConflictItem, Engine,
};
use crate::error::CliError;

pub async fn run_conflicts(engine: &Engine, as_json: bool) -> Result<(), CliError> {
    let conflicts = engine.service.active_conflicts().await;
    let now = Utc::now();

    if as_json {
        let items = conflicts
            .iter()
            .map(|conflict| conflict_to_item(conflict, now))
            .collect::<Vec<ConflictItem>>();
        return print_json(&items);
    }

    if conflicts.is_empty() {
        println!("No active conflicts.");
        return Ok(());
    }
    for line in format_conflict_lines(&conflicts, now) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_resolve(engine: &Engine, id: &str, strategy: StrategyArg) -> Result<(), CliError> {
    let conflict_id = parse_conflict_id(id)?;
    let strategy = ResolutionStrategy::from(strategy);

    let outcome = engine
        .service
        .resolve(conflict_id, strategy, &engine.user)
        .await;
    engine.save_active().await?;

    match outcome? {
        Resolution::Pending => println!("Conflict {conflict_id} left for manual resolution."),
        Resolution::Resolved(resolved) => {
            eprintln!("Resolved {conflict_id} with {strategy}");
            print_json(&resolved.record.to_snapshot()?)?;
        }
    }
    Ok(())
}

pub async fn run_sweep(engine: &Engine, as_json: bool) -> Result<(), CliError> {
    let report = engine.service.auto_resolve_conflicts(&engine.user).await;
    engine.save_active().await?;

    if as_json {
        return print_json(&report);
    }

    for resolved in &report.resolved {
        let conflict = &resolved.conflict;
        println!(
            "resolved  {}  {}/{}  {}",
            conflict.id,
            conflict.entity_type,
            conflict.entity_id,
            conflict
                .resolution_strategy
                .map_or("-", |strategy| strategy.as_str())
        );
    }
    for failure in &report.failed {
        println!("failed    {}  {}", failure.conflict_id, failure.reason);
    }
    for skipped in &report.skipped {
        println!("skipped   {skipped}");
    }
    println!(
        "{} resolved, {} failed, {} skipped",
        report.resolved.len(),
        report.failed.len(),
        report.skipped.len()
    );
    Ok(())
}
