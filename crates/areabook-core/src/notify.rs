//! Outbound notification hook fired after a conflict is resolved.
//!
//! Delivery is fire-and-forget: a sink failure is logged by the caller and
//! never rolls back a resolution.

use crate::models::Conflict;

/// Receiver of "conflict resolved" events
pub trait NotificationSink: Send + Sync {
    fn conflict_resolved(&self, user_id: &str, conflict: &Conflict) -> Result<(), String>;
}

/// Drops every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn conflict_resolved(&self, _user_id: &str, _conflict: &Conflict) -> Result<(), String> {
        Ok(())
    }
}

/// Emits each notification as an `info` log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn conflict_resolved(&self, user_id: &str, conflict: &Conflict) -> Result<(), String> {
        tracing::info!(
            user_id,
            conflict_id = %conflict.id,
            entity_type = %conflict.entity_type,
            entity_id = %conflict.entity_id,
            strategy = conflict.resolution_strategy.map(|s| s.as_str()),
            "Sync conflict resolved"
        );
        Ok(())
    }
}
