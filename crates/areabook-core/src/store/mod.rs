//! Document store abstraction.
//!
//! The remote store is the single arbiter of current state. Everything the
//! engine persists (entity records, leases, presence, history) goes through
//! this trait, addressed by `(collection, id)`.

mod memory;

pub use memory::MemoryStore;

use serde_json::Value;

use crate::error::Result;

/// How `set` treats an existing document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Replace the document entirely
    Overwrite,
    /// Shallow-merge top-level fields into the existing document
    Merge,
}

/// Narrow client for the remote document store (async)
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Fetch a document; `None` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Write a document
    async fn set(&self, collection: &str, id: &str, document: &Value, mode: SetMode)
        -> Result<()>;

    /// Conditionally write a document.
    ///
    /// With `expected == None` the write only happens if the document is
    /// absent (create-if-absent); otherwise only if the stored document
    /// equals `expected`. Returns whether the write happened.
    async fn compare_and_set(
        &self,
        collection: &str,
        id: &str,
        expected: Option<&Value>,
        document: &Value,
    ) -> Result<bool>;

    /// Delete a document; deleting a missing document is not an error
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Delete a document only if it still equals `expected`.
    /// Returns whether the delete happened.
    async fn compare_and_delete(&self, collection: &str, id: &str, expected: &Value)
        -> Result<bool>;

    /// All documents in a collection as `(id, document)` pairs
    async fn list(&self, collection: &str) -> Result<Vec<(String, Value)>>;
}

/// Apply `patch` on top of `base` the way `SetMode::Merge` does
pub fn merge_documents(base: &mut Value, patch: &Value) {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base_fields), Some(patch_fields)) => {
            for (key, value) in patch_fields {
                base_fields.insert(key.clone(), value.clone());
            }
        }
        _ => *base = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_documents_overlays_top_level_fields() {
        let mut base = json!({ "a": 1, "b": { "x": 1 } });
        merge_documents(&mut base, &json!({ "b": { "y": 2 }, "c": 3 }));
        assert_eq!(base, json!({ "a": 1, "b": { "y": 2 }, "c": 3 }));
    }

    #[test]
    fn merge_documents_replaces_non_objects() {
        let mut base = json!([1, 2]);
        merge_documents(&mut base, &json!({ "a": 1 }));
        assert_eq!(base, json!({ "a": 1 }));
    }
}
