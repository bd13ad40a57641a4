//! In-process document store

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::Mutex;

use super::{merge_documents, DocumentStore, SetMode};
use crate::error::Result;

/// `DocumentStore` backed by a map; each call is atomic
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.collections.lock().await;
        collections.get(collection).map_or(0, BTreeMap::len)
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
        mode: SetMode,
    ) -> Result<()> {
        let mut collections = self.collections.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if mode == SetMode::Merge {
            if let Some(existing) = documents.get_mut(id) {
                merge_documents(existing, document);
                return Ok(());
            }
        }
        documents.insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        expected: Option<&Value>,
        document: &Value,
    ) -> Result<bool> {
        let mut collections = self.collections.lock().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.get(id) != expected {
            return Ok(false);
        }
        documents.insert(id.to_string(), document.clone());
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.lock().await;
        if let Some(documents) = collections.get_mut(collection) {
            documents.remove(id);
        }
        Ok(())
    }

    async fn compare_and_delete(
        &self,
        collection: &str,
        id: &str,
        expected: &Value,
    ) -> Result<bool> {
        let mut collections = self.collections.lock().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };
        if documents.get(id) != Some(expected) {
            return Ok(false);
        }
        documents.remove(id);
        Ok(true)
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, document)| (id.clone(), document.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_merge_keeps_untouched_fields() {
        let store = MemoryStore::new();
        store
            .set("c", "1", &json!({ "a": 1, "b": 2 }), SetMode::Overwrite)
            .await
            .unwrap();
        store
            .set("c", "1", &json!({ "b": 3 }), SetMode::Merge)
            .await
            .unwrap();

        assert_eq!(
            store.get("c", "1").await.unwrap(),
            Some(json!({ "a": 1, "b": 3 }))
        );
    }

    #[tokio::test]
    async fn compare_and_set_creates_only_when_absent() {
        let store = MemoryStore::new();
        let first = json!({ "lockedBy": "u1" });
        let second = json!({ "lockedBy": "u2" });

        assert!(store.compare_and_set("locks", "k", None, &first).await.unwrap());
        assert!(!store.compare_and_set("locks", "k", None, &second).await.unwrap());
        assert!(store
            .compare_and_set("locks", "k", Some(&first), &second)
            .await
            .unwrap());
        assert_eq!(store.get("locks", "k").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn compare_and_delete_leaves_replaced_documents() {
        let store = MemoryStore::new();
        let stale = json!({ "lockedBy": "u1" });
        let fresh = json!({ "lockedBy": "u2" });
        store.set("locks", "k", &fresh, SetMode::Overwrite).await.unwrap();

        assert!(!store.compare_and_delete("locks", "k", &stale).await.unwrap());
        assert_eq!(store.get("locks", "k").await.unwrap(), Some(fresh.clone()));

        assert!(store.compare_and_delete("locks", "k", &fresh).await.unwrap());
        assert_eq!(store.get("locks", "k").await.unwrap(), None);
        assert!(!store.compare_and_delete("other", "k", &fresh).await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_document_is_ok() {
        let store = MemoryStore::new();
        store.delete("c", "missing").await.unwrap();
        assert_eq!(store.count("c").await, 0);
    }
}
