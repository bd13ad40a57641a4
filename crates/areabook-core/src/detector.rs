//! Conflict detection between a local and a freshly fetched remote snapshot.

use chrono::{DateTime, Utc};

use crate::models::{Conflict, ConflictType, EntityRecord, EntityType};

/// What to do when either snapshot lacks `updatedAt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingTimestampPolicy {
    /// Report no conflict
    #[default]
    Ignore,
    /// Report an escalated conflict that only a human may resolve
    Escalate,
}

/// Pure comparison of two snapshots of the same record
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
    missing_timestamp: MissingTimestampPolicy,
}

impl ConflictDetector {
    pub const fn new(missing_timestamp: MissingTimestampPolicy) -> Self {
        Self { missing_timestamp }
    }

    /// Decide whether `remote` conflicts with `local`.
    ///
    /// A conflict exists only when the remote copy is strictly newer and the
    /// two differ in something other than `updatedAt`.
    pub fn detect(
        &self,
        local: &EntityRecord,
        remote: &EntityRecord,
        entity_type: EntityType,
        entity_id: &str,
        detected_at: DateTime<Utc>,
    ) -> Option<Conflict> {
        if local.entity_type() != entity_type || remote.entity_type() != entity_type {
            tracing::warn!(
                %entity_type,
                entity_id,
                local_type = %local.entity_type(),
                remote_type = %remote.entity_type(),
                "Snapshot type mismatch; treating as no conflict"
            );
            return None;
        }

        let (Some(local_updated), Some(remote_updated)) = (local.updated_at(), remote.updated_at())
        else {
            return match self.missing_timestamp {
                _ if local.same_content(remote) => None,
                MissingTimestampPolicy::Ignore => {
                    tracing::debug!(%entity_type, entity_id, "Missing updatedAt; skipping detection");
                    None
                }
                MissingTimestampPolicy::Escalate => {
                    tracing::info!(%entity_type, entity_id, "Missing updatedAt; escalating to manual");
                    let mut conflict = Conflict::new(
                        entity_type,
                        entity_id,
                        local.clone(),
                        remote.clone(),
                        classify(local, remote),
                        detected_at,
                    );
                    conflict.escalated = true;
                    Some(conflict)
                }
            };
        };

        if remote_updated <= local_updated || local.same_content(remote) {
            return None;
        }

        Some(Conflict::new(
            entity_type,
            entity_id,
            local.clone(),
            remote.clone(),
            classify(local, remote),
            detected_at,
        ))
    }
}

/// Delete beats create beats update
pub fn classify(local: &EntityRecord, remote: &EntityRecord) -> ConflictType {
    let (local_meta, remote_meta) = (local.meta(), remote.meta());
    if local_meta.deleted != remote_meta.deleted {
        ConflictType::Delete
    } else if local_meta.created_at != remote_meta.created_at {
        ConflictType::Create
    } else {
        ConflictType::Update
    }
}
