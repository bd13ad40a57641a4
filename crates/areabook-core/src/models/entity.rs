//! Entity type tags and the tagged record enum

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AccountabilityGroup, CalendarEvent, Goal, KeyIndicator, Note, Task};
use crate::error::{Error, Result};

/// Kind of synced record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Goal,
    Task,
    Event,
    Metric,
    Note,
    Group,
}

impl EntityType {
    pub const ALL: [Self; 6] = [
        Self::Goal,
        Self::Task,
        Self::Event,
        Self::Metric,
        Self::Note,
        Self::Group,
    ];

    /// Stable label used in lock/session keys and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goal => "Goal",
            Self::Task => "Task",
            Self::Event => "Event",
            Self::Metric => "Metric",
            Self::Note => "Note",
            Self::Group => "Group",
        }
    }

    /// Per-user collection holding records of this type
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Goal => "goals",
            Self::Task => "tasks",
            Self::Event => "events",
            Self::Metric => "metrics",
            Self::Note => "notes",
            Self::Group => "groups",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "goal" => Ok(Self::Goal),
            "task" => Ok(Self::Task),
            "event" | "calendarevent" => Ok(Self::Event),
            "metric" | "keyindicator" => Ok(Self::Metric),
            "note" => Ok(Self::Note),
            "group" | "accountabilitygroup" => Ok(Self::Group),
            other => Err(Error::InvalidInput(format!("unknown entity type: {other}"))),
        }
    }
}

/// Timestamps and soft-delete flag shared by every record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted: bool,
}

impl RecordMeta {
    /// Metadata for a record created at `now`
    pub const fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: Some(now),
            updated_at: Some(now),
            deleted: false,
        }
    }
}

/// A synced record, one variant per [`EntityType`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "snapshot")]
pub enum EntityRecord {
    Goal(Goal),
    Task(Task),
    Event(CalendarEvent),
    Metric(KeyIndicator),
    Note(Note),
    Group(AccountabilityGroup),
}

impl EntityRecord {
    /// Decode a raw store snapshot as a record of the given type.
    ///
    /// Missing `createdAt`/`updatedAt` decode to `None`; anything that does
    /// not fit the type's shape is reported as [`Error::MalformedSnapshot`].
    pub fn from_snapshot(entity_type: EntityType, snapshot: Value) -> Result<Self> {
        let malformed = |error: serde_json::Error| Error::MalformedSnapshot {
            entity_type: entity_type.to_string(),
            reason: error.to_string(),
        };

        Ok(match entity_type {
            EntityType::Goal => Self::Goal(serde_json::from_value(snapshot).map_err(malformed)?),
            EntityType::Task => Self::Task(serde_json::from_value(snapshot).map_err(malformed)?),
            EntityType::Event => Self::Event(serde_json::from_value(snapshot).map_err(malformed)?),
            EntityType::Metric => {
                Self::Metric(serde_json::from_value(snapshot).map_err(malformed)?)
            }
            EntityType::Note => Self::Note(serde_json::from_value(snapshot).map_err(malformed)?),
            EntityType::Group => Self::Group(serde_json::from_value(snapshot).map_err(malformed)?),
        })
    }

    /// Encode the inner record as a raw store snapshot
    pub fn to_snapshot(&self) -> Result<Value> {
        let value = match self {
            Self::Goal(record) => serde_json::to_value(record)?,
            Self::Task(record) => serde_json::to_value(record)?,
            Self::Event(record) => serde_json::to_value(record)?,
            Self::Metric(record) => serde_json::to_value(record)?,
            Self::Note(record) => serde_json::to_value(record)?,
            Self::Group(record) => serde_json::to_value(record)?,
        };
        Ok(value)
    }

    pub const fn entity_type(&self) -> EntityType {
        match self {
            Self::Goal(_) => EntityType::Goal,
            Self::Task(_) => EntityType::Task,
            Self::Event(_) => EntityType::Event,
            Self::Metric(_) => EntityType::Metric,
            Self::Note(_) => EntityType::Note,
            Self::Group(_) => EntityType::Group,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Goal(record) => &record.id,
            Self::Task(record) => &record.id,
            Self::Event(record) => &record.id,
            Self::Metric(record) => &record.id,
            Self::Note(record) => &record.id,
            Self::Group(record) => &record.id,
        }
    }

    pub const fn meta(&self) -> &RecordMeta {
        match self {
            Self::Goal(record) => &record.meta,
            Self::Task(record) => &record.meta,
            Self::Event(record) => &record.meta,
            Self::Metric(record) => &record.meta,
            Self::Note(record) => &record.meta,
            Self::Group(record) => &record.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Self::Goal(record) => &mut record.meta,
            Self::Task(record) => &mut record.meta,
            Self::Event(record) => &mut record.meta,
            Self::Metric(record) => &mut record.meta,
            Self::Note(record) => &mut record.meta,
            Self::Group(record) => &mut record.meta,
        }
    }

    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.meta().updated_at
    }

    /// Whether two records carry the same content apart from `updatedAt`
    pub fn same_content(&self, other: &Self) -> bool {
        let mut left = self.clone();
        let mut right = other.clone();
        left.meta_mut().updated_at = None;
        right.meta_mut().updated_at = None;
        left == right
    }
}
