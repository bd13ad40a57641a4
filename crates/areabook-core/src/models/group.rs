//! Accountability group model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordMeta;

/// A shared group whose members hold each other accountable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountabilityGroup {
    pub id: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub member_ids: BTreeSet<String>,
}

impl AccountabilityGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            meta: RecordMeta::created(now),
            name: name.into(),
            description: String::new(),
            owner_id: None,
            member_ids: BTreeSet::new(),
        }
    }
}
