//! Merge engine.
//!
//! Each record type implements [`Mergeable`]; [`EntityRecord::merge_with`]
//! dispatches on the variant so an unhandled type is a compile error rather
//! than a runtime lookup miss. All mergers are pure and idempotent:
//! `x.merge(&x) == x` and `a.merge(&b).merge(&b) == a.merge(&b)`.

mod mergers;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{EntityRecord, EntityType, HasId, RecordMeta, ResolutionStrategy};

/// Combine a local copy (`self`) with a remote copy of the same record
pub trait Mergeable: Sized {
    fn merge(&self, remote: &Self) -> Self;
}

/// Remote items first, then every local item whose id the remote lacks
pub(crate) fn union_by_id<T: HasId + Clone>(local: &[T], remote: &[T]) -> Vec<T> {
    let mut combined = remote.to_vec();
    for item in local {
        if !combined.iter().any(|existing| existing.id() == item.id()) {
            combined.push(item.clone());
        }
    }
    combined
}

/// Whether `local` carries a strictly newer `updatedAt` than `remote`
pub(crate) fn local_is_newer(local: &RecordMeta, remote: &RecordMeta) -> bool {
    match (local.updated_at, remote.updated_at) {
        (Some(local), Some(remote)) => local > remote,
        _ => false,
    }
}

pub(crate) fn later(
    local: Option<DateTime<Utc>>,
    remote: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    local.max(remote)
}

impl EntityRecord {
    /// Merge with the type's merger. `Group` has none and takes the fallback.
    pub fn merge_with(&self, remote: &Self) -> Result<Self> {
        Ok(match (self, remote) {
            (Self::Goal(local), Self::Goal(remote)) => Self::Goal(local.merge(remote)),
            (Self::Task(local), Self::Task(remote)) => Self::Task(local.merge(remote)),
            (Self::Event(local), Self::Event(remote)) => Self::Event(local.merge(remote)),
            (Self::Metric(local), Self::Metric(remote)) => Self::Metric(local.merge(remote)),
            (Self::Note(local), Self::Note(remote)) => Self::Note(local.merge(remote)),
            (Self::Group(_), Self::Group(_)) => self.fallback_merge(remote),
            _ => {
                return Err(Error::Merge(format!(
                    "cannot merge {} with {}",
                    self.entity_type(),
                    remote.entity_type()
                )))
            }
        })
    }

    /// Remote verbatim, keeping only the local `updatedAt`.
    ///
    /// Not a real merge: it preserves the local edit-recency marker and
    /// nothing else.
    pub fn fallback_merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        merged.meta_mut().updated_at = self.updated_at();
        merged
    }
}

/// Whether a type has a dedicated merger (as opposed to the fallback)
pub const fn has_dedicated_merger(entity_type: EntityType) -> bool {
    !matches!(entity_type, EntityType::Group)
}

/// Default resolution strategy per entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    strategies: BTreeMap<EntityType, ResolutionStrategy>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let strategies = BTreeMap::from([
            (EntityType::Goal, ResolutionStrategy::Merge),
            (EntityType::Task, ResolutionStrategy::KeepLocal),
            (EntityType::Event, ResolutionStrategy::KeepLocal),
            (EntityType::Metric, ResolutionStrategy::Merge),
            (EntityType::Note, ResolutionStrategy::Merge),
            (EntityType::Group, ResolutionStrategy::Manual),
        ]);
        Self { strategies }
    }
}

impl StrategyTable {
    /// Strategy for a type; unlisted types are never auto-resolved
    pub fn default_for(&self, entity_type: EntityType) -> ResolutionStrategy {
        self.strategies
            .get(&entity_type)
            .copied()
            .unwrap_or(ResolutionStrategy::Manual)
    }

    pub fn set(&mut self, entity_type: EntityType, strategy: ResolutionStrategy) {
        self.strategies.insert(entity_type, strategy);
    }
}

/// Strategy table plus the merge dispatch used by the resolution service
#[derive(Debug, Clone)]
pub struct MergeEngine {
    strategies: StrategyTable,
    fallback_merge: bool,
}

impl MergeEngine {
    pub const fn new(strategies: StrategyTable, fallback_merge: bool) -> Self {
        Self {
            strategies,
            fallback_merge,
        }
    }

    pub const fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    pub fn default_strategy(&self, entity_type: EntityType) -> ResolutionStrategy {
        self.strategies.default_for(entity_type)
    }

    /// Merge a local/remote pair of the given type
    pub fn merge(
        &self,
        entity_type: EntityType,
        local: &EntityRecord,
        remote: &EntityRecord,
    ) -> Result<EntityRecord> {
        if local.entity_type() != entity_type || remote.entity_type() != entity_type {
            return Err(Error::Merge(format!(
                "expected {entity_type} snapshots, got {} and {}",
                local.entity_type(),
                remote.entity_type()
            )));
        }
        if !has_dedicated_merger(entity_type) && !self.fallback_merge {
            return Err(Error::StrategyNotSupported(entity_type));
        }
        local.merge_with(remote)
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new(StrategyTable::default(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountabilityGroup, Goal, Note};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    fn group(name: &str, updated_offset_secs: i64) -> EntityRecord {
        let mut group = AccountabilityGroup::new("grp", name, t0());
        group.meta.updated_at = Some(t0() + Duration::seconds(updated_offset_secs));
        EntityRecord::Group(group)
    }

    #[test]
    fn default_table_matches_stock_strategies() {
        let table = StrategyTable::default();
        assert_eq!(table.default_for(EntityType::Goal), ResolutionStrategy::Merge);
        assert_eq!(table.default_for(EntityType::Task), ResolutionStrategy::KeepLocal);
        assert_eq!(table.default_for(EntityType::Event), ResolutionStrategy::KeepLocal);
        assert_eq!(table.default_for(EntityType::Metric), ResolutionStrategy::Merge);
        assert_eq!(table.default_for(EntityType::Note), ResolutionStrategy::Merge);
        assert_eq!(table.default_for(EntityType::Group), ResolutionStrategy::Manual);
    }

    #[test]
    fn fallback_keeps_remote_content_and_local_timestamp() {
        let local = group("local name", 10);
        let remote = group("remote name", 20);

        let merged = local.merge_with(&remote).unwrap();
        let EntityRecord::Group(merged) = merged else {
            panic!("expected group");
        };
        assert_eq!(merged.name, "remote name");
        assert_eq!(merged.meta.updated_at, Some(t0() + Duration::seconds(10)));
    }

    #[test]
    fn fallback_is_idempotent() {
        let a = group("a", 10);
        let b = group("b", 20);
        let once = a.merge_with(&b).unwrap();
        assert_eq!(once.merge_with(&b).unwrap(), once);
        assert_eq!(a.merge_with(&a).unwrap(), a);
    }

    #[test]
    fn engine_rejects_fallback_when_disabled() {
        let engine = MergeEngine::new(StrategyTable::default(), false);
        let error = engine
            .merge(EntityType::Group, &group("a", 10), &group("b", 20))
            .unwrap_err();
        assert!(matches!(error, Error::StrategyNotSupported(EntityType::Group)));
    }

    #[test]
    fn engine_rejects_mismatched_variants() {
        let engine = MergeEngine::default();
        let goal = EntityRecord::Goal(Goal::new("x", "goal", t0()));
        let note = EntityRecord::Note(Note::new("x", "note", t0()));

        let error = engine.merge(EntityType::Goal, &goal, &note).unwrap_err();
        assert!(matches!(error, Error::Merge(_)));
        assert!(matches!(goal.merge_with(&note), Err(Error::Merge(_))));
    }
}
