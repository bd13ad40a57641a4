//! Data models for AreaBook sync

mod conflict;
mod entity;
mod event;
mod goal;
mod group;
mod metric;
mod note;
mod task;

pub use conflict::{Conflict, ConflictId, ConflictType, ResolutionStrategy};
pub use entity::{EntityRecord, EntityType, RecordMeta};
pub use event::{CalendarEvent, EventStatus};
pub use goal::{Goal, GoalStatus, StickyNote};
pub use group::AccountabilityGroup;
pub use metric::KeyIndicator;
pub use note::Note;
pub use task::{Subtask, Task, TaskPriority, TaskStatus};

/// Sub-items that are unioned by their own id when merging
pub trait HasId {
    fn id(&self) -> &str;
}
