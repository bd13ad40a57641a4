//! Key indicator (weekly metric) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordMeta;

/// A weekly progress counter such as "workouts per week"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyIndicator {
    pub id: String,
    #[serde(flatten)]
    pub meta: RecordMeta,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub weekly_target: i64,
    #[serde(default)]
    pub current_week_progress: i64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub color: String,
}

impl KeyIndicator {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weekly_target: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            meta: RecordMeta::created(now),
            name: name.into(),
            weekly_target,
            current_week_progress: 0,
            unit: String::new(),
            color: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn counters_use_camel_case_and_default_when_absent() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap();
        let mut metric = KeyIndicator::new("k1", "Reading", 4, now);
        metric.current_week_progress = 2;

        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["weeklyTarget"], 4);
        assert_eq!(value["currentWeekProgress"], 2);

        let sparse: KeyIndicator = serde_json::from_value(serde_json::json!({ "id": "k2" })).unwrap();
        assert_eq!(sparse.weekly_target, 0);
        assert_eq!(sparse.current_week_progress, 0);
    }
}
