use std::path::Path;

use areabook_core::store::{DocumentStore, SetMode};
use areabook_core::{EntityRecord, EntityType};
use chrono::Utc;

use crate::cli::EntityKind;
use crate::commands::common::{
    conflict_to_item, format_conflict_lines, normalize_record_id, parse_record, print_json,
    read_snapshot, Engine,
};
use crate::error::CliError;

pub async fn run_put(engine: &Engine, kind: EntityKind, file: Option<&Path>) -> Result<(), CliError> {
    let record = parse_record(kind.into(), read_snapshot(file)?)?;
    engine
        .store
        .set(
            &engine.entity_collection(record.entity_type()),
            record.id(),
            &record.to_snapshot()?,
            SetMode::Overwrite,
        )
        .await?;

    println!("{}", record.id());
    Ok(())
}

pub async fn run_get(engine: &Engine, kind: EntityKind, id: &str) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let entity_type: EntityType = kind.into();
    let snapshot = engine
        .store
        .get(&engine.entity_collection(entity_type), &id)
        .await?
        .ok_or_else(|| CliError::RecordNotFound {
            entity_type: entity_type.to_string(),
            id: id.clone(),
        })?;

    let record = EntityRecord::from_snapshot(entity_type, snapshot)?;
    print_json(&record.to_snapshot()?)
}

pub async fn run_check(
    engine: &Engine,
    kind: EntityKind,
    file: Option<&Path>,
    as_json: bool,
) -> Result<(), CliError> {
    let local = parse_record(kind.into(), read_snapshot(file)?)?;
    let conflict = engine
        .service
        .detect_against_remote(&engine.user, &local)
        .await?;
    engine.save_active().await?;

    let now = Utc::now();
    match conflict {
        Some(conflict) if as_json => print_json(&conflict_to_item(&conflict, now))?,
        Some(conflict) => {
            for line in format_conflict_lines(std::slice::from_ref(&conflict), now) {
                println!("{line}");
            }
        }
        None if as_json => println!("null"),
        None => println!("No conflict."),
    }
    Ok(())
}
