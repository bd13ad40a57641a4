//! Calendar event model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

/// A scheduled block of time with linked tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub linked_goal_id: Option<String>,
    #[serde(default)]
    pub task_ids: BTreeSet<String>,
    #[serde(default)]
    pub status: EventStatus,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            meta: RecordMeta::created(now),
            title: title.into(),
            description: String::new(),
            category: String::new(),
            start_time: Some(start_time),
            end_time: Some(end_time),
            linked_goal_id: None,
            task_ids: BTreeSet::new(),
            status: EventStatus::Scheduled,
        }
    }
}
