//! Shared utility functions used across multiple modules.

use crate::models::EntityType;

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Flat document id for per-entity tables (`Task_t1`).
pub fn entity_key(entity_type: EntityType, entity_id: &str) -> String {
    format!("{}_{entity_id}", entity_type.as_str())
}

/// Collection holding one user's records of a type (`users/u1/tasks`).
pub fn user_collection(user_id: &str, collection: &str) -> String {
    format!("users/{user_id}/{collection}")
}
