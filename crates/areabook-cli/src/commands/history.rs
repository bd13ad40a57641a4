use crate::commands::common::{format_history_lines, print_json, Engine};
use crate::error::CliError;

pub async fn run_history(engine: &Engine, as_json: bool) -> Result<(), CliError> {
    let conflicts = engine.service.history().list(&engine.user).await?;

    if as_json {
        return print_json(&conflicts);
    }

    if conflicts.is_empty() {
        println!("No resolved conflicts recorded.");
        return Ok(());
    }
    for line in format_history_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_analytics(engine: &Engine, as_json: bool) -> Result<(), CliError> {
    let analytics = engine.service.history().analytics(&engine.user).await?;

    if as_json {
        return print_json(&analytics);
    }

    println!("Total conflicts:      {}", analytics.total_conflicts);
    println!("Resolved:             {}", analytics.resolved_conflicts);
    println!(
        "Avg resolution time:  {:.1}s",
        analytics.average_resolution_time
    );
    for (entity_type, count) in &analytics.entity_type_breakdown {
        println!("  {entity_type:<8} {count}");
    }
    for (strategy, count) in &analytics.strategy_breakdown {
        println!("  {:<11} {count}", strategy.as_str());
    }
    Ok(())
}
