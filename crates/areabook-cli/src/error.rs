use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] areabook_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] areabook_core::config::ConfigError),
    #[error("No snapshot provided; pass a file or pipe JSON on stdin")]
    EmptySnapshot,
    #[error("Invalid conflict ID: {0}")]
    InvalidConflictId(String),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("No {entity_type} record with id {id}")]
    RecordNotFound { entity_type: String, id: String },
}
