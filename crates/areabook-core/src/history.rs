//! Per-user log of resolved conflicts and the statistics derived from it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Conflict, EntityType, ResolutionStrategy};
use crate::store::{DocumentStore, SetMode};
use crate::util::user_collection;

pub const HISTORY_COLLECTION: &str = "conflictHistory";

/// Aggregate view over a window of history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictAnalytics {
    pub total_conflicts: usize,
    pub resolved_conflicts: usize,
    /// Mean seconds from detection to resolution over resolved conflicts only
    pub average_resolution_time: f64,
    pub entity_type_breakdown: BTreeMap<EntityType, usize>,
    pub strategy_breakdown: BTreeMap<ResolutionStrategy, usize>,
}

/// Summarise a set of conflicts.
///
/// `average_resolution_time` is `0.0` when none of them is resolved.
#[allow(clippy::cast_precision_loss)]
pub fn compute_analytics(conflicts: &[Conflict]) -> ConflictAnalytics {
    let durations: Vec<f64> = conflicts
        .iter()
        .filter_map(Conflict::resolution_seconds)
        .collect();
    let average_resolution_time = if durations.is_empty() {
        0.0
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    };

    let mut entity_type_breakdown = BTreeMap::new();
    let mut strategy_breakdown = BTreeMap::new();
    for conflict in conflicts {
        *entity_type_breakdown.entry(conflict.entity_type).or_insert(0) += 1;
        if let Some(strategy) = conflict.resolution_strategy {
            *strategy_breakdown.entry(strategy).or_insert(0) += 1;
        }
    }

    ConflictAnalytics {
        total_conflicts: conflicts.len(),
        resolved_conflicts: durations.len(),
        average_resolution_time,
        entity_type_breakdown,
        strategy_breakdown,
    }
}

/// Append-only history under `users/{user}/conflictHistory`
pub struct HistoryLog<S> {
    store: Arc<S>,
    limit: usize,
}

impl<S: DocumentStore> HistoryLog<S> {
    pub const fn new(store: Arc<S>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Record a resolved conflict, keyed by its id
    pub async fn append(&self, conflict: &Conflict, user_id: &str) -> Result<()> {
        let collection = user_collection(user_id, HISTORY_COLLECTION);
        self.store
            .set(
                &collection,
                &conflict.id.as_str(),
                &serde_json::to_value(conflict)?,
                SetMode::Overwrite,
            )
            .await?;
        tracing::debug!(user_id, conflict_id = %conflict.id, "Appended conflict history");
        Ok(())
    }

    /// Most recent entries first, at most `limit` of them
    pub async fn list(&self, user_id: &str) -> Result<Vec<Conflict>> {
        let collection = user_collection(user_id, HISTORY_COLLECTION);
        let mut conflicts: Vec<Conflict> = self
            .store
            .list(&collection)
            .await?
            .into_iter()
            .filter_map(|(id, raw)| match serde_json::from_value(raw) {
                Ok(conflict) => Some(conflict),
                Err(error) => {
                    tracing::warn!(user_id, id = %id, %error, "Skipping undecodable history entry");
                    None
                }
            })
            .collect();

        conflicts.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        conflicts.truncate(self.limit);
        Ok(conflicts)
    }

    /// Analytics over the listed history window
    pub async fn analytics(&self, user_id: &str) -> Result<ConflictAnalytics> {
        Ok(compute_analytics(&self.list(user_id).await?))
    }
}
