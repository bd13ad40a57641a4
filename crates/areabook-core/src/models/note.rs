//! Note model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordMeta;

/// A markdown note with tags and cross-references to other records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub title: String,
    /// Markdown content
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub linked_note_ids: BTreeSet<String>,
    #[serde(default)]
    pub linked_goal_ids: BTreeSet<String>,
    #[serde(default)]
    pub linked_task_ids: BTreeSet<String>,
    #[serde(default)]
    pub linked_event_ids: BTreeSet<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

impl Note {
    pub fn new(id: impl Into<String>, content: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            meta: RecordMeta::created(now),
            title: String::new(),
            content: content.into(),
            tags: BTreeSet::new(),
            linked_note_ids: BTreeSet::new(),
            linked_goal_ids: BTreeSet::new(),
            linked_task_ids: BTreeSet::new(),
            linked_event_ids: BTreeSet::new(),
            folder: None,
        }
    }

    /// Content length in characters (not bytes)
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_len_counts_chars() {
        let note = Note::new("n1", "héllo", Utc::now());
        assert_eq!(note.content_len(), 5);
        assert!(note.content.len() > 5);
    }

    #[test]
    fn test_note_new() {
        let now = Utc::now();
        let note = Note::new("n1", "Hello world", now);
        assert_eq!(note.content, "Hello world");
        assert!(!note.meta.deleted);
        assert_eq!(note.meta.created_at, Some(now));
        assert_eq!(note.meta.created_at, note.meta.updated_at);
    }
}
