//! Conflict resolution orchestrator.
//!
//! `ConflictService` owns the set of active conflicts for one process and
//! applies resolution strategies to them: it writes the outcome to the
//! document store, appends the resolved conflict to the acting user's
//! history and tells the notification sink. Resolutions for the same
//! `(entity_type, entity_id)` are serialised; different entities resolve
//! in parallel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::detector::ConflictDetector;
use crate::error::{Error, Result};
use crate::history::HistoryLog;
use crate::keyed::KeyedLocks;
use crate::merge::MergeEngine;
use crate::models::{Conflict, ConflictId, EntityRecord, ResolutionStrategy};
use crate::notify::NotificationSink;
use crate::store::{DocumentStore, SetMode};
use crate::util::{entity_key, user_collection};

/// A finished resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedRecord {
    /// The conflict with its resolution fields stamped
    pub conflict: Conflict,
    /// The record the caller should keep as its local copy
    pub record: EntityRecord,
}

/// Outcome of [`ConflictService::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Manual strategy: nothing was written and the conflict stays active
    Pending,
    Resolved(ResolvedRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    pub conflict_id: ConflictId,
    pub reason: String,
}

/// What an auto-resolve sweep did with each active conflict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub resolved: Vec<ResolvedRecord>,
    pub failed: Vec<SweepFailure>,
    /// Manual-only or escalated conflicts, left active
    pub skipped: Vec<ConflictId>,
}

pub struct ConflictService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    detector: ConflictDetector,
    merge_engine: MergeEngine,
    history: HistoryLog<S>,
    active: Mutex<Vec<Conflict>>,
    keys: KeyedLocks,
}

impl<S: DocumentStore> ConflictService<S> {
    pub fn new(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            history: HistoryLog::new(Arc::clone(&store), config.history_limit),
            store,
            clock,
            notifier,
            detector: ConflictDetector::new(config.missing_timestamp),
            merge_engine: MergeEngine::new(config.strategies.clone(), config.fallback_merge),
            active: Mutex::new(Vec::new()),
            keys: KeyedLocks::new(),
        }
    }

    pub const fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub const fn merge_engine(&self) -> &MergeEngine {
        &self.merge_engine
    }

    pub const fn history(&self) -> &HistoryLog<S> {
        &self.history
    }

    /// Add a conflict to the active set.
    ///
    /// A conflict already present is ignored. One still active for the same
    /// entity is replaced, so each entity has at most one active conflict.
    pub async fn register(&self, conflict: Conflict) {
        let mut active = self.active.lock().await;
        if active.iter().any(|existing| existing.id == conflict.id) {
            return;
        }
        if let Some(slot) = active.iter_mut().find(|existing| {
            existing.entity_type == conflict.entity_type && existing.entity_id == conflict.entity_id
        }) {
            tracing::info!(
                superseded = %slot.id,
                conflict_id = %conflict.id,
                entity_type = %conflict.entity_type,
                entity_id = %conflict.entity_id,
                "Sync conflict re-detected"
            );
            *slot = conflict;
            return;
        }
        tracing::info!(
            conflict_id = %conflict.id,
            entity_type = %conflict.entity_type,
            entity_id = %conflict.entity_id,
            conflict_type = ?conflict.conflict_type,
            escalated = conflict.escalated,
            "Sync conflict detected"
        );
        active.push(conflict);
    }

    /// Active conflicts in first-detection order
    pub async fn active_conflicts(&self) -> Vec<Conflict> {
        self.active.lock().await.clone()
    }

    pub async fn active_conflict(&self, id: ConflictId) -> Option<Conflict> {
        self.active
            .lock()
            .await
            .iter()
            .find(|conflict| conflict.id == id)
            .cloned()
    }

    /// Compare `local` against the stored copy and register any conflict.
    ///
    /// A record that does not exist remotely yet is never a conflict.
    pub async fn detect_against_remote(
        &self,
        user_id: &str,
        local: &EntityRecord,
    ) -> Result<Option<Conflict>> {
        let entity_type = local.entity_type();
        let collection = user_collection(user_id, entity_type.collection());
        let Some(raw) = self.store.get(&collection, local.id()).await? else {
            return Ok(None);
        };
        let remote = EntityRecord::from_snapshot(entity_type, raw)?;

        let conflict =
            self.detector
                .detect(local, &remote, entity_type, local.id(), self.clock.now());
        if let Some(conflict) = &conflict {
            self.register(conflict.clone()).await;
        }
        Ok(conflict)
    }

    /// Apply `strategy` to an active conflict on behalf of `user_id`.
    ///
    /// On failure nothing is stamped and the conflict stays active. A
    /// conflict that was already resolved is no longer active and yields
    /// [`Error::ConflictNotFound`].
    pub async fn resolve(
        &self,
        conflict_id: ConflictId,
        strategy: ResolutionStrategy,
        user_id: &str,
    ) -> Result<Resolution> {
        let conflict = self
            .active_conflict(conflict_id)
            .await
            .ok_or(Error::ConflictNotFound(conflict_id))?;
        let key = entity_key(conflict.entity_type, &conflict.entity_id);
        let _guard = self.keys.lock(&key).await;

        // Another resolution for this key may have finished while we waited.
        let mut conflict = self
            .active_conflict(conflict_id)
            .await
            .ok_or(Error::ConflictNotFound(conflict_id))?;

        let record = match strategy {
            ResolutionStrategy::Manual => {
                tracing::debug!(%conflict_id, %key, "Conflict left for manual resolution");
                return Ok(Resolution::Pending);
            }
            ResolutionStrategy::KeepLocal => {
                self.write_remote(user_id, &conflict.local_version).await?;
                conflict.local_version.clone()
            }
            ResolutionStrategy::KeepRemote => conflict.remote_version.clone(),
            ResolutionStrategy::Merge => {
                let merged = self.merge_engine.merge(
                    conflict.entity_type,
                    &conflict.local_version,
                    &conflict.remote_version,
                )?;
                self.write_remote(user_id, &merged).await?;
                merged
            }
        };

        conflict.mark_resolved(strategy, user_id, self.clock.now());
        self.history.append(&conflict, user_id).await?;
        self.active
            .lock()
            .await
            .retain(|active| active.id != conflict_id);

        if let Err(reason) = self.notifier.conflict_resolved(user_id, &conflict) {
            tracing::warn!(%conflict_id, %reason, "Conflict notification failed");
        }
        tracing::info!(%conflict_id, %key, %strategy, user_id, "Conflict resolved");

        Ok(Resolution::Resolved(ResolvedRecord { conflict, record }))
    }

    /// Resolve every active conflict whose type has an automatic default.
    ///
    /// Escalated and manual-only conflicts are skipped. A failure on one
    /// conflict is logged and recorded; the sweep carries on with the rest.
    pub async fn auto_resolve_conflicts(&self, user_id: &str) -> SweepReport {
        let mut report = SweepReport::default();

        for conflict in self.active_conflicts().await {
            let strategy = self.merge_engine.default_strategy(conflict.entity_type);
            if conflict.escalated || !strategy.is_automatic() {
                report.skipped.push(conflict.id);
                continue;
            }

            match self.resolve(conflict.id, strategy, user_id).await {
                Ok(Resolution::Resolved(resolved)) => report.resolved.push(resolved),
                Ok(Resolution::Pending) => report.skipped.push(conflict.id),
                Err(Error::ConflictNotFound(_)) => {
                    tracing::debug!(conflict_id = %conflict.id, "Conflict resolved elsewhere during sweep");
                }
                Err(error) => {
                    tracing::warn!(
                        conflict_id = %conflict.id,
                        entity_type = %conflict.entity_type,
                        entity_id = %conflict.entity_id,
                        %error,
                        "Auto-resolve failed; continuing sweep"
                    );
                    report.failed.push(SweepFailure {
                        conflict_id: conflict.id,
                        reason: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            resolved = report.resolved.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Auto-resolve sweep finished"
        );
        report
    }

    async fn write_remote(&self, user_id: &str, record: &EntityRecord) -> Result<()> {
        let collection = user_collection(user_id, record.entity_type().collection());
        self.store
            .set(&collection, record.id(), &record.to_snapshot()?, SetMode::Overwrite)
            .await
    }
}
