use std::collections::HashSet;
use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use areabook_core::clock::{Clock, SystemClock};
use areabook_core::config::EngineConfig;
use areabook_core::db::LibSqlStore;
use areabook_core::locks::LockManager;
use areabook_core::models::ConflictType;
use areabook_core::notify::LogNotifier;
use areabook_core::sessions::SessionTracker;
use areabook_core::store::{DocumentStore, SetMode};
use areabook_core::util::user_collection;
use areabook_core::{Conflict, ConflictId, ConflictService, EntityRecord, EntityType};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

/// Where the CLI keeps conflicts between invocations
const ACTIVE_CONFLICTS_COLLECTION: &str = "activeConflicts";
const DEFAULT_USER: &str = "local";

/// Store, config and services for one CLI invocation
pub struct Engine {
    pub user: String,
    pub store: Arc<LibSqlStore>,
    pub config: EngineConfig,
    pub clock: Arc<dyn Clock>,
    pub service: ConflictService<LibSqlStore>,
}

impl Engine {
    pub fn locks(&self) -> LockManager<LibSqlStore> {
        LockManager::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.lock_ttl,
        )
    }

    pub fn sessions(&self) -> SessionTracker<LibSqlStore> {
        SessionTracker::new(Arc::clone(&self.store), Arc::clone(&self.clock))
    }

    pub fn entity_collection(&self, entity_type: EntityType) -> String {
        user_collection(&self.user, entity_type.collection())
    }

    /// Write the in-memory active set back so the next invocation sees it
    pub async fn save_active(&self) -> Result<(), CliError> {
        let collection = user_collection(&self.user, ACTIVE_CONFLICTS_COLLECTION);
        let active = self.service.active_conflicts().await;
        let keep: HashSet<String> = active.iter().map(|conflict| conflict.id.as_str()).collect();

        for (id, _) in self.store.list(&collection).await? {
            if !keep.contains(&id) {
                self.store.delete(&collection, &id).await?;
            }
        }
        for conflict in &active {
            self.store
                .set(
                    &collection,
                    &conflict.id.as_str(),
                    &serde_json::to_value(conflict)?,
                    SetMode::Overwrite,
                )
                .await?;
        }
        Ok(())
    }

    async fn load_active(&self) -> Result<(), CliError> {
        let collection = user_collection(&self.user, ACTIVE_CONFLICTS_COLLECTION);
        for (id, raw) in self.store.list(&collection).await? {
            match serde_json::from_value::<Conflict>(raw) {
                Ok(conflict) => self.service.register(conflict).await,
                Err(error) => {
                    tracing::warn!(id = %id, %error, "Skipping undecodable active conflict");
                }
            }
        }
        Ok(())
    }
}

pub async fn open_engine(db_path: &Path, user: String) -> Result<Engine, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = EngineConfig::from_env()?;
    let store = Arc::new(LibSqlStore::open(db_path).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = ConflictService::new(
        Arc::clone(&store),
        Arc::clone(&clock),
        Arc::new(LogNotifier),
        &config,
    );

    let engine = Engine {
        user,
        store,
        config,
        clock,
        service,
    };
    engine.load_active().await?;
    Ok(engine)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("AREABOOK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("areabook")
        .join("areabook.db")
}

pub fn resolve_user(cli_user: Option<String>) -> String {
    cli_user
        .or_else(|| env::var("AREABOOK_USER").ok())
        .and_then(|user| normalize_identifier(&user))
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

pub fn normalize_identifier(id: &str) -> Option<String> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_record_id(id: &str) -> Result<String, CliError> {
    normalize_identifier(id).ok_or(CliError::EmptyRecordId)
}

pub fn parse_conflict_id(id: &str) -> Result<ConflictId, CliError> {
    id.trim()
        .parse()
        .map_err(|_| CliError::InvalidConflictId(id.to_string()))
}

/// Read a JSON snapshot from a file, or from piped stdin
pub fn read_snapshot(file: Option<&Path>) -> Result<Value, CliError> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => read_piped_stdin()?.ok_or(CliError::EmptySnapshot)?,
    };
    if text.trim().is_empty() {
        return Err(CliError::EmptySnapshot);
    }
    Ok(serde_json::from_str(&text)?)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(Some(buffer))
}

pub fn parse_record(entity_type: EntityType, snapshot: Value) -> Result<EntityRecord, CliError> {
    let record = EntityRecord::from_snapshot(entity_type, snapshot)?;
    normalize_record_id(record.id())?;
    Ok(record)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictItem {
    pub id: ConflictId,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub conflict_type: String,
    pub detected_at: DateTime<Utc>,
    pub escalated: bool,
    pub relative_time: String,
}

pub fn conflict_to_item(conflict: &Conflict, now: DateTime<Utc>) -> ConflictItem {
    ConflictItem {
        id: conflict.id,
        entity_type: conflict.entity_type,
        entity_id: conflict.entity_id.clone(),
        conflict_type: conflict_type_label(conflict).to_string(),
        detected_at: conflict.detected_at,
        escalated: conflict.escalated,
        relative_time: format_relative_time(conflict.detected_at, now),
    }
}

fn conflict_type_label(conflict: &Conflict) -> &'static str {
    match conflict.conflict_type {
        ConflictType::Create => "create",
        ConflictType::Update => "update",
        ConflictType::Delete => "delete",
    }
}

pub fn format_conflict_lines(conflicts: &[Conflict], now: DateTime<Utc>) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            let mut line = format!(
                "{}  {:<6}  {:<6}  {}  {}",
                conflict.id,
                conflict.entity_type,
                conflict_type_label(conflict),
                conflict.entity_id,
                format_relative_time(conflict.detected_at, now)
            );
            if conflict.escalated {
                line.push_str("  [escalated]");
            }
            line
        })
        .collect()
}

pub fn format_history_lines(conflicts: &[Conflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<11}  {}/{}  by={}",
                conflict
                    .resolved_at
                    .map_or_else(|| "-".to_string(), format_timestamp),
                conflict
                    .resolution_strategy
                    .map_or("-", |strategy| strategy.as_str()),
                conflict.entity_type,
                conflict.entity_id,
                conflict.resolved_by.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
