//! Goal model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{HasId, RecordMeta};

/// Lifecycle state of a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Cancelled,
}

/// A sticky note pinned to a goal's board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyNote {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: String,
}

impl HasId for StickyNote {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A long-running goal tracked against key indicators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key_indicator_ids: BTreeSet<String>,
    /// Percent complete, 0-100
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub linked_note_ids: BTreeSet<String>,
    #[serde(default)]
    pub sticky_notes: Vec<StickyNote>,
}

impl Goal {
    pub fn new(id: impl Into<String>, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            meta: RecordMeta::created(now),
            title: title.into(),
            description: String::new(),
            key_indicator_ids: BTreeSet::new(),
            progress: 0,
            status: GoalStatus::Active,
            target_date: None,
            linked_note_ids: BTreeSet::new(),
            sticky_notes: Vec::new(),
        }
    }
}
