use std::time::Duration;

use crate::cli::EntityKind;
use crate::commands::common::{format_timestamp, normalize_record_id, print_json, Engine};
use crate::error::CliError;

pub async fn run_lock_acquire(
    engine: &Engine,
    kind: EntityKind,
    id: &str,
    ttl_secs: Option<u64>,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let lock = engine
        .locks()
        .acquire(kind.into(), &id, &engine.user, ttl_secs.map(Duration::from_secs))
        .await?;

    println!(
        "Locked {}/{} until {}",
        lock.entity_type,
        lock.entity_id,
        format_timestamp(lock.expires_at)
    );
    Ok(())
}

pub async fn run_lock_release(engine: &Engine, kind: EntityKind, id: &str) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    engine.locks().release(kind.into(), &id, &engine.user).await?;
    println!("Released");
    Ok(())
}

pub async fn run_lock_status(
    engine: &Engine,
    kind: EntityKind,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let lock = engine.locks().lock_info(kind.into(), &id).await?;

    if as_json {
        return print_json(&lock);
    }
    match lock {
        Some(lock) => println!(
            "Locked by {} since {} until {}",
            lock.locked_by,
            format_timestamp(lock.locked_at),
            format_timestamp(lock.expires_at)
        ),
        None => println!("Not locked"),
    }
    Ok(())
}
