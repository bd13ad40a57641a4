//! Conflict model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EntityRecord, EntityType};
use crate::error::Error;

/// A unique identifier for a conflict, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictId(Uuid);

impl ConflictId {
    /// Create a new unique conflict ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// How the two snapshots diverge. Labels history only; merging ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictType {
    Create,
    Update,
    Delete,
}

/// Policy used to collapse a conflict into one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    KeepLocal,
    KeepRemote,
    Merge,
    Manual,
}

impl ResolutionStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepLocal => "keep-local",
            Self::KeepRemote => "keep-remote",
            Self::Merge => "merge",
            Self::Manual => "manual",
        }
    }

    /// Whether the strategy is applied without a human in the loop
    pub const fn is_automatic(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-local" | "local" | "uselocal" => Ok(Self::KeepLocal),
            "keep-remote" | "remote" | "server" | "useserver" => Ok(Self::KeepRemote),
            "merge" => Ok(Self::Merge),
            "manual" => Ok(Self::Manual),
            other => Err(Error::InvalidInput(format!(
                "unknown resolution strategy: {other}"
            ))),
        }
    }
}

/// A detected divergence between a local and a remote copy of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: ConflictId,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub local_version: EntityRecord,
    pub remote_version: EntityRecord,
    pub conflict_type: ConflictType,
    pub detected_at: DateTime<Utc>,
    /// Raised for incomparable snapshots; never auto-resolved
    #[serde(default)]
    pub escalated: bool,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution_strategy: Option<ResolutionStrategy>,
    #[serde(default)]
    pub resolved_by: Option<String>,
}

impl Conflict {
    pub fn new(
        entity_type: EntityType,
        entity_id: impl Into<String>,
        local_version: EntityRecord,
        remote_version: EntityRecord,
        conflict_type: ConflictType,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            entity_type,
            entity_id: entity_id.into(),
            local_version,
            remote_version,
            conflict_type,
            detected_at,
            escalated: false,
            resolved_at: None,
            resolution_strategy: None,
            resolved_by: None,
        }
    }

    pub const fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// Seconds between detection and resolution, if resolved
    #[allow(clippy::cast_precision_loss)]
    pub fn resolution_seconds(&self) -> Option<f64> {
        self.resolved_at
            .map(|resolved_at| (resolved_at - self.detected_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Stamp the resolution fields
    pub fn mark_resolved(
        &mut self,
        strategy: ResolutionStrategy,
        resolved_by: impl Into<String>,
        resolved_at: DateTime<Utc>,
    ) {
        self.resolved_at = Some(resolved_at);
        self.resolution_strategy = Some(strategy);
        self.resolved_by = Some(resolved_by.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use chrono::Duration;

    #[test]
    fn test_conflict_id_unique() {
        assert_ne!(ConflictId::new(), ConflictId::new());
    }

    #[test]
    fn test_conflict_id_parse() {
        let id = ConflictId::new();
        let parsed: ConflictId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn strategy_parses_aliases() {
        assert_eq!(
            "server".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::KeepRemote
        );
        assert_eq!(
            "Keep-Local".parse::<ResolutionStrategy>().unwrap(),
            ResolutionStrategy::KeepLocal
        );
        assert!("coin-flip".parse::<ResolutionStrategy>().is_err());
    }

    #[test]
    fn strategy_serializes_kebab_case() {
        let json = serde_json::to_string(&ResolutionStrategy::KeepRemote).unwrap();
        assert_eq!(json, "\"keep-remote\"");
    }

    #[test]
    fn mark_resolved_sets_resolution_fields() {
        let detected_at = Utc::now();
        let note = EntityRecord::Note(Note::new("n1", "a", detected_at));
        let mut conflict = Conflict::new(
            EntityType::Note,
            "n1",
            note.clone(),
            note,
            ConflictType::Update,
            detected_at,
        );
        assert!(!conflict.is_resolved());
        assert_eq!(conflict.resolution_seconds(), None);

        conflict.mark_resolved(
            ResolutionStrategy::Merge,
            "u1",
            detected_at + Duration::seconds(30),
        );

        assert!(conflict.is_resolved());
        assert_eq!(conflict.resolved_by.as_deref(), Some("u1"));
        assert_eq!(conflict.resolution_seconds(), Some(30.0));
    }
}
