//! Advisory, time-bounded entity leases.
//!
//! Leases live in the `entityLocks` collection keyed `{Type}_{entityId}`.
//! Acquisition goes through compare-and-set, so two clients racing for the
//! same free entity cannot both win. Expiry is TTL-only: there is no
//! heartbeat, and an expired lease is removed lazily by the next reader.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::EntityType;
use crate::store::DocumentStore;
use crate::util::entity_key;

pub const LOCKS_COLLECTION: &str = "entityLocks";

/// Attempts before giving up on a lease that keeps changing under us
const MAX_ACQUIRE_ATTEMPTS: usize = 3;

/// A lease record as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityLock {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EntityLock {
    /// Expired strictly after `expires_at`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

pub struct LockManager<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl<S: DocumentStore> LockManager<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            store,
            clock,
            default_ttl,
        }
    }

    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Take the lease on an entity for `ttl` (or the default TTL).
    ///
    /// A live lease held by someone else fails with [`Error::EntityLocked`].
    /// A live lease already held by `user_id` is returned as-is, not renewed.
    pub async fn acquire(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        user_id: &str,
        ttl: Option<Duration>,
    ) -> Result<EntityLock> {
        let ttl = chrono::Duration::from_std(ttl.unwrap_or(self.default_ttl))
            .map_err(|_| Error::InvalidInput("lock TTL out of range".to_string()))?;
        let key = entity_key(entity_type, entity_id);

        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            let now = self.clock.now();
            let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
                Error::InvalidInput(format!("lock TTL of {}s is out of range", ttl.num_seconds()))
            })?;
            let lock = EntityLock {
                entity_type,
                entity_id: entity_id.to_string(),
                locked_by: user_id.to_string(),
                locked_at: now,
                expires_at,
            };
            let document = serde_json::to_value(&lock)?;

            let current = self
                .store
                .get(LOCKS_COLLECTION, &key)
                .await
                .map_err(Error::into_locking)?;

            let expected = match current {
                None => None,
                Some(raw) => match serde_json::from_value::<EntityLock>(raw.clone()) {
                    Ok(existing) if !existing.is_expired(now) => {
                        if existing.locked_by == user_id {
                            return Ok(existing);
                        }
                        tracing::debug!(
                            %key,
                            locked_by = %existing.locked_by,
                            "Lock held by another user"
                        );
                        return Err(Error::EntityLocked {
                            locked_by: existing.locked_by,
                            expires_at: existing.expires_at,
                        });
                    }
                    Ok(_) => Some(raw),
                    Err(error) => {
                        tracing::warn!(%key, %error, "Replacing undecodable lock record");
                        Some(raw)
                    }
                },
            };

            let written = self
                .store
                .compare_and_set(LOCKS_COLLECTION, &key, expected.as_ref(), &document)
                .await
                .map_err(Error::into_locking)?;
            if written {
                tracing::info!(%key, user_id, expires_at = %lock.expires_at, "Lock acquired");
                return Ok(lock);
            }
            tracing::debug!(%key, attempt, "Lock changed during acquisition; retrying");
        }

        Err(Error::Locking(format!(
            "lock on {key} kept changing during acquisition"
        )))
    }

    /// Remove the lease.
    ///
    /// `user_id` is only logged: any user may release any lease.
    pub async fn release(
        &self,
        entity_type: EntityType,
        entity_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let key = entity_key(entity_type, entity_id);
        self.store
            .delete(LOCKS_COLLECTION, &key)
            .await
            .map_err(Error::into_locking)?;
        tracing::info!(%key, user_id, "Lock released");
        Ok(())
    }

    /// Whether a live lease exists; an expired one is deleted on the way
    pub async fn is_locked(&self, entity_type: EntityType, entity_id: &str) -> Result<bool> {
        Ok(self.lock_info(entity_type, entity_id).await?.is_some())
    }

    /// The live lease, if any (who holds it and until when)
    pub async fn lock_info(
        &self,
        entity_type: EntityType,
        entity_id: &str,
    ) -> Result<Option<EntityLock>> {
        let key = entity_key(entity_type, entity_id);

        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            let Some(raw) = self
                .store
                .get(LOCKS_COLLECTION, &key)
                .await
                .map_err(Error::into_locking)?
            else {
                return Ok(None);
            };

            if let Some(lock) = decode_lock(raw.clone()) {
                if !lock.is_expired(self.clock.now()) {
                    return Ok(Some(lock));
                }
            }

            // Only the record just read; a lease taken since then stays.
            let removed = self
                .store
                .compare_and_delete(LOCKS_COLLECTION, &key, &raw)
                .await
                .map_err(Error::into_locking)?;
            if removed {
                tracing::debug!(%key, "Removed expired lock");
                return Ok(None);
            }
            tracing::debug!(%key, attempt, "Expired lock replaced while reading; rereading");
        }

        Err(Error::Locking(format!(
            "lock on {key} kept changing while reading"
        )))
    }
}

fn decode_lock(raw: Value) -> Option<EntityLock> {
    serde_json::from_value(raw)
        .map_err(|error| tracing::warn!(%error, "Ignoring undecodable lock record"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{MemoryStore, SetMode};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex as StdMutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, LockManager<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let manager = LockManager::new(
            Arc::clone(&store),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(300),
        );
        (store, clock, manager)
    }

    #[tokio::test]
    async fn lease_expires_after_ttl_and_is_removed() {
        let (store, clock, manager) = setup();

        let lock = manager
            .acquire(EntityType::Task, "t1", "u1", None)
            .await
            .unwrap();
        assert_eq!(lock.locked_by, "u1");
        assert_eq!(lock.expires_at, t0() + chrono::Duration::seconds(300));
        assert!(manager.is_locked(EntityType::Task, "t1").await.unwrap());

        clock.advance(chrono::Duration::seconds(300));
        assert!(manager.is_locked(EntityType::Task, "t1").await.unwrap());

        clock.advance(chrono::Duration::seconds(1));
        assert!(!manager.is_locked(EntityType::Task, "t1").await.unwrap());
        assert_eq!(store.get(LOCKS_COLLECTION, "Task_t1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_user_is_rejected_while_lease_is_live() {
        let (_store, _clock, manager) = setup();
        manager
            .acquire(EntityType::Goal, "g1", "u1", None)
            .await
            .unwrap();

        let error = manager
            .acquire(EntityType::Goal, "g1", "u2", None)
            .await
            .unwrap_err();
        match error {
            Error::EntityLocked {
                locked_by,
                expires_at,
            } => {
                assert_eq!(locked_by, "u1");
                assert_eq!(expires_at, t0() + chrono::Duration::seconds(300));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn holder_reacquiring_gets_existing_lease_back() {
        let (_store, clock, manager) = setup();
        let first = manager
            .acquire(EntityType::Goal, "g1", "u1", None)
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(60));
        let second = manager
            .acquire(EntityType::Goal, "g1", "u1", None)
            .await
            .unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn stale_lease_is_replaced() {
        let (_store, clock, manager) = setup();
        manager
            .acquire(EntityType::Note, "n1", "u1", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(11));
        let lock = manager
            .acquire(EntityType::Note, "n1", "u2", None)
            .await
            .unwrap();
        assert_eq!(lock.locked_by, "u2");
        assert_eq!(
            manager.lock_info(EntityType::Note, "n1").await.unwrap(),
            Some(lock)
        );
    }

    #[tokio::test]
    async fn release_has_no_ownership_check() {
        let (_store, _clock, manager) = setup();
        manager
            .acquire(EntityType::Event, "e1", "u1", None)
            .await
            .unwrap();

        manager.release(EntityType::Event, "e1", "u2").await.unwrap();
        assert!(!manager.is_locked(EntityType::Event, "e1").await.unwrap());
        manager
            .acquire(EntityType::Event, "e1", "u2", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn garbage_lock_record_is_treated_as_free() {
        let (store, _clock, manager) = setup();
        store
            .set(
                LOCKS_COLLECTION,
                "Task_t9",
                &serde_json::json!({ "oops": true }),
                SetMode::Overwrite,
            )
            .await
            .unwrap();

        let lock = manager
            .acquire(EntityType::Task, "t9", "u1", None)
            .await
            .unwrap();
        assert_eq!(lock.locked_by, "u1");
    }

    /// Writes `replacement` into the store right after the next read, like a
    /// concurrent acquirer landing between our read and our write.
    #[derive(Default)]
    struct InterleavingStore {
        inner: MemoryStore,
        replacement: StdMutex<Option<Value>>,
    }

    impl DocumentStore for InterleavingStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
            let current = self.inner.get(collection, id).await?;
            let pending = self.replacement.lock().unwrap().take();
            if let Some(document) = pending {
                self.inner
                    .set(collection, id, &document, SetMode::Overwrite)
                    .await?;
            }
            Ok(current)
        }

        async fn set(
            &self,
            collection: &str,
            id: &str,
            document: &Value,
            mode: SetMode,
        ) -> Result<()> {
            self.inner.set(collection, id, document, mode).await
        }

        async fn compare_and_set(
            &self,
            collection: &str,
            id: &str,
            expected: Option<&Value>,
            document: &Value,
        ) -> Result<bool> {
            self.inner
                .compare_and_set(collection, id, expected, document)
                .await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<()> {
            self.inner.delete(collection, id).await
        }

        async fn compare_and_delete(
            &self,
            collection: &str,
            id: &str,
            expected: &Value,
        ) -> Result<bool> {
            self.inner.compare_and_delete(collection, id, expected).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
            self.inner.list(collection).await
        }
    }

    #[tokio::test]
    async fn expiry_cleanup_keeps_a_lease_taken_meanwhile() {
        let store = Arc::new(InterleavingStore::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let manager = LockManager::new(
            Arc::clone(&store),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(300),
        );
        manager
            .acquire(EntityType::Task, "t1", "u1", Some(Duration::from_secs(10)))
            .await
            .unwrap();

        clock.advance(chrono::Duration::seconds(11));
        let fresh = EntityLock {
            entity_type: EntityType::Task,
            entity_id: "t1".to_string(),
            locked_by: "u2".to_string(),
            locked_at: clock.now(),
            expires_at: clock.now() + chrono::Duration::seconds(300),
        };
        *store.replacement.lock().unwrap() = Some(serde_json::to_value(&fresh).unwrap());

        assert!(manager.is_locked(EntityType::Task, "t1").await.unwrap());
        assert_eq!(
            manager.lock_info(EntityType::Task, "t1").await.unwrap(),
            Some(fresh)
        );
        let error = manager
            .acquire(EntityType::Task, "t1", "u3", None)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::EntityLocked { locked_by, .. } if locked_by == "u2"));
    }

    #[tokio::test]
    async fn oversized_ttl_is_rejected_without_writing() {
        let (store, _clock, manager) = setup();
        let error = manager
            .acquire(
                EntityType::Task,
                "t1",
                "u1",
                Some(Duration::from_secs(10_000_000_000_000)),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert_eq!(store.get(LOCKS_COLLECTION, "Task_t1").await.unwrap(), None);
    }

    #[test]
    fn expiry_is_strictly_after_expires_at() {
        let lock = EntityLock {
            entity_type: EntityType::Task,
            entity_id: "t1".to_string(),
            locked_by: "u1".to_string(),
            locked_at: t0(),
            expires_at: t0() + chrono::Duration::seconds(300),
        };
        assert!(!lock.is_expired(lock.expires_at));
        assert!(lock.is_expired(lock.expires_at + chrono::Duration::milliseconds(1)));
    }
}
