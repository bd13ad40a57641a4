use areabook_core::sessions::CollaborativeSession;

use crate::cli::EntityKind;
use crate::commands::common::{normalize_record_id, print_json, Engine};
use crate::error::CliError;

pub async fn run_session_join(engine: &Engine, kind: EntityKind, id: &str) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let session = engine.sessions().join(kind.into(), &id, &engine.user).await?;
    println!("{}", format_presence(&session));
    Ok(())
}

pub async fn run_session_leave(engine: &Engine, kind: EntityKind, id: &str) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    match engine.sessions().leave(kind.into(), &id, &engine.user).await? {
        Some(session) => println!("{}", format_presence(&session)),
        None => println!("Session closed"),
    }
    Ok(())
}

pub async fn run_session_show(
    engine: &Engine,
    kind: EntityKind,
    id: &str,
    as_json: bool,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let session = engine.sessions().session(kind.into(), &id).await?;

    if as_json {
        return print_json(&session);
    }
    match session {
        Some(session) => println!("{}", format_presence(&session)),
        None => println!("Nobody is editing"),
    }
    Ok(())
}

pub fn format_presence(session: &CollaborativeSession) -> String {
    let count = session.active_users.len();
    let users = session
        .active_users
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let noun = if count == 1 { "person" } else { "people" };
    format!("{count} {noun} editing: {users}")
}
