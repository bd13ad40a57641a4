//! Advisory presence tracking for records being edited by several users.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::Result;
use crate::keyed::KeyedLocks;
use crate::models::EntityType;
use crate::store::{DocumentStore, SetMode};
use crate::util::entity_key;

pub const SESSIONS_COLLECTION: &str = "collaborativeSessions";

/// Who is currently editing one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborativeSession {
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(default)]
    pub active_users: BTreeSet<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Join/leave bookkeeping over the `collaborativeSessions` collection.
///
/// Updates to one session are serialised within this process; concurrent
/// writers in other processes can still interleave.
pub struct SessionTracker<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    keys: KeyedLocks,
}

impl<S: DocumentStore> SessionTracker<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            keys: KeyedLocks::new(),
        }
    }

    /// Add `user_id` to the session, creating it if needed
    pub async fn join(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        user_id: &str,
    ) -> Result<CollaborativeSession> {
        let key = entity_key(entity_type, entity_id);
        let _guard = self.keys.lock(&key).await;
        let now = self.clock.now();

        let mut session = self.load(&key).await?.unwrap_or_else(|| CollaborativeSession {
            entity_type,
            entity_id: entity_id.to_string(),
            active_users: BTreeSet::new(),
            started_at: now,
            last_activity: now,
        });
        session.active_users.insert(user_id.to_string());
        session.last_activity = now;

        self.store
            .set(
                SESSIONS_COLLECTION,
                &key,
                &serde_json::to_value(&session)?,
                SetMode::Overwrite,
            )
            .await?;
        tracing::debug!(%key, user_id, users = session.active_users.len(), "Joined session");
        Ok(session)
    }

    /// Remove `user_id`; the session is deleted once nobody is left.
    ///
    /// Returns the remaining session, or `None` when it was closed or never
    /// existed.
    pub async fn leave(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        user_id: &str,
    ) -> Result<Option<CollaborativeSession>> {
        let key = entity_key(entity_type, entity_id);
        let _guard = self.keys.lock(&key).await;

        let Some(mut session) = self.load(&key).await? else {
            return Ok(None);
        };
        session.active_users.remove(user_id);
        session.last_activity = self.clock.now();

        if session.active_users.is_empty() {
            self.store.delete(SESSIONS_COLLECTION, &key).await?;
            tracing::debug!(%key, "Closed empty session");
            return Ok(None);
        }

        self.store
            .set(
                SESSIONS_COLLECTION,
                &key,
                &serde_json::to_value(&session)?,
                SetMode::Overwrite,
            )
            .await?;
        tracing::debug!(%key, user_id, users = session.active_users.len(), "Left session");
        Ok(Some(session))
    }

    /// Current presence for an entity
    pub async fn session(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<CollaborativeSession>> {
        self.load(&entity_key(entity_type, entity_id)).await
    }

    async fn load(&self, key: &str) -> Result<Option<CollaborativeSession>> {
        let Some(raw) = self.store.get(SESSIONS_COLLECTION, key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(raw) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                tracing::warn!(%key, %error, "Discarding undecodable session record");
                Ok(None)
            }
        }
    }
}
