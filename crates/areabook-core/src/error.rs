//! Error types for areabook-core

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{ConflictId, EntityType};

/// Result type alias using areabook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in areabook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The conflict is not (or no longer) in the active set
    #[error("Conflict not found: {0}")]
    ConflictNotFound(ConflictId),

    /// Merge was requested for a type without a merge function
    #[error("Merge strategy not supported for {0}")]
    StrategyNotSupported(EntityType),

    /// A type-specific merge failed on its input
    #[error("Merge error: {0}")]
    Merge(String),

    /// Store failure while acquiring or releasing a lease
    #[error("Locking error: {0}")]
    Locking(String),

    /// Another user holds a live lease on the entity
    #[error("Entity is locked by {locked_by} until {expires_at}")]
    EntityLocked {
        locked_by: String,
        expires_at: DateTime<Utc>,
    },

    /// Reserved for authorization checks; nothing raises it yet
    #[error("Unauthorized access")]
    UnauthorizedAccess,

    /// A stored or supplied snapshot could not be decoded
    #[error("Malformed {entity_type} snapshot: {reason}")]
    MalformedSnapshot {
        entity_type: String,
        reason: String,
    },

    /// Document store error
    #[error("Store error: {0}")]
    Store(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Re-tag a store failure as a locking failure; other errors pass through.
    pub(crate) fn into_locking(self) -> Self {
        match self {
            Self::Store(reason) => Self::Locking(reason),
            Self::LibSql(error) => Self::Locking(error.to_string()),
            other => other,
        }
    }
}
