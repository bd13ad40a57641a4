//! Per-type merge rules. Remote is the base in every case.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{later, local_is_newer, union_by_id, Mergeable};
use crate::models::{CalendarEvent, Goal, KeyIndicator, Note, Task, TaskStatus};

fn union(local: &BTreeSet<String>, remote: &BTreeSet<String>) -> BTreeSet<String> {
    local.union(remote).cloned().collect()
}

fn earliest(
    local: Option<DateTime<Utc>>,
    remote: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (local, remote) {
        (Some(local), Some(remote)) => Some(local.min(remote)),
        (local, remote) => local.or(remote),
    }
}

impl Mergeable for Goal {
    fn merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        merged.sticky_notes = union_by_id(&self.sticky_notes, &remote.sticky_notes);
        merged.progress = self.progress.max(remote.progress);
        merged.key_indicator_ids = union(&self.key_indicator_ids, &remote.key_indicator_ids);
        merged.linked_note_ids = union(&self.linked_note_ids, &remote.linked_note_ids);
        merged.meta.updated_at = later(self.meta.updated_at, remote.meta.updated_at);
        merged
    }
}

impl Mergeable for Task {
    fn merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        merged.subtasks = union_by_id(&self.subtasks, &remote.subtasks);
        // Completion is sticky: once either side finished the task, it stays finished.
        if self.is_completed() || remote.is_completed() {
            merged.status = TaskStatus::Completed;
            merged.completed_at = earliest(self.completed_at, remote.completed_at);
        }
        merged.meta.updated_at = later(self.meta.updated_at, remote.meta.updated_at);
        merged
    }
}

impl Mergeable for KeyIndicator {
    fn merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        merged.current_week_progress = self.current_week_progress.max(remote.current_week_progress);
        if local_is_newer(&self.meta, &remote.meta) {
            merged.weekly_target = self.weekly_target;
        }
        merged.meta.updated_at = later(self.meta.updated_at, remote.meta.updated_at);
        merged
    }
}

impl Mergeable for Note {
    fn merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        // Longer content is assumed to be more complete; no textual merge.
        if self.content_len() > remote.content_len() {
            merged.content.clone_from(&self.content);
        }
        merged.tags = union(&self.tags, &remote.tags);
        merged.linked_note_ids = union(&self.linked_note_ids, &remote.linked_note_ids);
        merged.linked_goal_ids = union(&self.linked_goal_ids, &remote.linked_goal_ids);
        merged.linked_task_ids = union(&self.linked_task_ids, &remote.linked_task_ids);
        merged.linked_event_ids = union(&self.linked_event_ids, &remote.linked_event_ids);
        merged.meta.updated_at = later(self.meta.updated_at, remote.meta.updated_at);
        merged
    }
}

impl Mergeable for CalendarEvent {
    fn merge(&self, remote: &Self) -> Self {
        let mut merged = remote.clone();
        merged.task_ids = union(&self.task_ids, &remote.task_ids);
        if local_is_newer(&self.meta, &remote.meta) {
            merged.start_time = self.start_time;
            merged.end_time = self.end_time;
        }
        merged.meta.updated_at = later(self.meta.updated_at, remote.meta.updated_at);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StickyNote, Subtask};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap()
    }

    fn at(offset_secs: i64) -> Option<DateTime<Utc>> {
        Some(t0() + Duration::seconds(offset_secs))
    }

    fn ids(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    fn sticky(id: &str) -> StickyNote {
        StickyNote {
            id: id.to_string(),
            content: format!("note {id}"),
            color: "#FBBF24".to_string(),
        }
    }

    fn subtask(id: &str) -> Subtask {
        Subtask {
            id: id.to_string(),
            title: format!("step {id}"),
            completed: false,
        }
    }

    fn goal(progress: i64, notes: &[&str], updated: i64) -> Goal {
        let mut goal = Goal::new("g1", "Run a marathon", t0());
        goal.progress = progress;
        goal.sticky_notes = notes.iter().map(|id| sticky(id)).collect();
        goal.meta.updated_at = at(updated);
        goal
    }

    fn sticky_ids(goal: &Goal) -> BTreeSet<String> {
        goal.sticky_notes.iter().map(|note| note.id.clone()).collect()
    }

    #[test]
    fn goal_merge_scenario() {
        let local = goal(40, &["A"], 10);
        let remote = goal(60, &["B"], 20);

        let merged = local.merge(&remote);
        assert_eq!(merged.progress, 60);
        assert_eq!(sticky_ids(&merged), ids(&["A", "B"]));
    }

    #[test]
    fn goal_sub_item_union_is_order_independent() {
        let left = goal(0, &["A", "B"], 10);
        let right = goal(0, &["B", "C"], 20);

        assert_eq!(sticky_ids(&left.merge(&right)), ids(&["A", "B", "C"]));
        assert_eq!(sticky_ids(&right.merge(&left)), ids(&["A", "B", "C"]));
    }

    #[test]
    fn goal_duplicate_id_keeps_remote_copy() {
        let mut local = goal(0, &["A"], 10);
        local.sticky_notes[0].content = "local edit".to_string();
        let remote = goal(0, &["A"], 20);

        let merged = local.merge(&remote);
        assert_eq!(merged.sticky_notes.len(), 1);
        assert_eq!(merged.sticky_notes[0].content, "note A");
    }

    #[test]
    fn goal_link_ids_are_unioned() {
        let mut local = goal(0, &[], 10);
        local.key_indicator_ids = ids(&["k1", "k2"]);
        let mut remote = goal(0, &[], 20);
        remote.key_indicator_ids = ids(&["k2", "k3"]);

        assert_eq!(local.merge(&remote).key_indicator_ids, ids(&["k1", "k2", "k3"]));
    }

    #[test]
    fn goal_merge_is_idempotent() {
        let a = goal(40, &["A"], 10);
        let b = goal(60, &["B"], 20);
        let once = a.merge(&b);

        assert_eq!(a.merge(&a), a);
        assert_eq!(once.merge(&b), once);
    }

    fn task(status: TaskStatus, completed_at: Option<DateTime<Utc>>, updated: i64) -> Task {
        let mut task = Task::new("t1", "File taxes", t0());
        task.status = status;
        task.completed_at = completed_at;
        task.meta.updated_at = at(updated);
        task
    }

    #[test]
    fn task_completion_wins_from_either_side() {
        let local = task(TaskStatus::Completed, at(5), 10);
        let remote = task(TaskStatus::Pending, None, 20);

        let merged = local.merge(&remote);
        assert_eq!(merged.status, TaskStatus::Completed);
        assert_eq!(merged.completed_at, at(5));

        let merged = remote.merge(&local);
        assert_eq!(merged.status, TaskStatus::Completed);
        assert_eq!(merged.completed_at, at(5));
    }

    #[test]
    fn task_completed_at_is_the_earlier_timestamp() {
        let local = task(TaskStatus::Completed, at(50), 60);
        let remote = task(TaskStatus::Completed, at(30), 70);

        assert_eq!(local.merge(&remote).completed_at, at(30));
    }

    #[test]
    fn task_without_completion_takes_remote_status() {
        let local = task(TaskStatus::Skipped, None, 10);
        let remote = task(TaskStatus::Failed, None, 20);

        assert_eq!(local.merge(&remote).status, TaskStatus::Failed);
    }

    #[test]
    fn task_subtasks_are_unioned_by_id() {
        let mut local = task(TaskStatus::Pending, None, 10);
        local.subtasks = vec![subtask("s1"), subtask("s2")];
        let mut remote = task(TaskStatus::Pending, None, 20);
        remote.subtasks = vec![subtask("s2"), subtask("s3")];

        let merged = local.merge(&remote);
        let merged_ids: Vec<&str> = merged.subtasks.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(merged_ids, vec!["s2", "s3", "s1"]);
    }

    #[test]
    fn task_merge_is_idempotent() {
        let completed = task(TaskStatus::Completed, at(5), 10);
        assert_eq!(completed.merge(&completed), completed);

        let a = task(TaskStatus::Completed, at(5), 10);
        let b = task(TaskStatus::Pending, None, 20);
        let once = a.merge(&b);
        assert_eq!(once.merge(&b), once);
    }

    fn metric(progress: i64, target: i64, updated: i64) -> KeyIndicator {
        let mut metric = KeyIndicator::new("k1", "Workouts", target, t0());
        metric.current_week_progress = progress;
        metric.meta.updated_at = at(updated);
        metric
    }

    #[test]
    fn metric_progress_is_the_maximum() {
        for (local, remote) in [(3, 5), (5, 3), (4, 4)] {
            let merged = metric(local, 5, 10).merge(&metric(remote, 5, 20));
            assert_eq!(merged.current_week_progress, local.max(remote));
        }
    }

    #[test]
    fn metric_target_follows_newer_side() {
        let newer_local = metric(0, 7, 30);
        let older_remote = metric(0, 5, 20);
        assert_eq!(newer_local.merge(&older_remote).weekly_target, 7);

        let older_local = metric(0, 7, 10);
        assert_eq!(older_local.merge(&older_remote).weekly_target, 5);
    }

    #[test]
    fn metric_merge_is_idempotent_when_local_is_newer() {
        let a = metric(2, 7, 30);
        let b = metric(4, 5, 20);
        let once = a.merge(&b);

        assert_eq!(once.weekly_target, 7);
        assert_eq!(once.merge(&b), once);
        assert_eq!(a.merge(&a), a);
    }

    fn note(content: &str, tags: &[&str], updated: i64) -> Note {
        let mut note = Note::new("n1", content, t0());
        note.tags = ids(tags);
        note.meta.updated_at = at(updated);
        note
    }

    #[test]
    fn note_keeps_longer_content() {
        let local = note("a much longer local draft", &[], 10);
        let remote = note("short", &[], 20);
        assert_eq!(local.merge(&remote).content, "a much longer local draft");
        assert_eq!(remote.merge(&local).content, "a much longer local draft");
    }

    #[test]
    fn note_equal_length_content_keeps_remote() {
        let local = note("aaaa", &[], 10);
        let remote = note("bbbb", &[], 20);
        assert_eq!(local.merge(&remote).content, "bbbb");
    }

    #[test]
    fn note_tags_and_links_are_unioned() {
        let mut local = note("x", &["work"], 10);
        local.linked_goal_ids = ids(&["g1"]);
        let mut remote = note("x", &["home"], 20);
        remote.linked_goal_ids = ids(&["g2"]);

        let merged = local.merge(&remote);
        assert_eq!(merged.tags, ids(&["home", "work"]));
        assert_eq!(merged.linked_goal_ids, ids(&["g1", "g2"]));
    }

    #[test]
    fn note_merge_is_idempotent() {
        let a = note("longer local", &["a"], 10);
        let b = note("short", &["b"], 20);
        let once = a.merge(&b);

        assert_eq!(a.merge(&a), a);
        assert_eq!(once.merge(&b), once);
    }

    fn event(start_hour: i64, task_ids: &[&str], updated: i64) -> CalendarEvent {
        let start = t0() + Duration::hours(start_hour);
        let mut event = CalendarEvent::new("e1", "Standup", start, start + Duration::hours(1), t0());
        event.task_ids = ids(task_ids);
        event.meta.updated_at = at(updated);
        event
    }

    #[test]
    fn event_time_range_follows_newer_side() {
        let local = event(10, &[], 30);
        let remote = event(14, &[], 20);
        let merged = local.merge(&remote);
        assert_eq!(merged.start_time, local.start_time);
        assert_eq!(merged.end_time, local.end_time);
    }

    #[test]
    fn event_equal_timestamps_keep_remote_range() {
        let local = event(10, &[], 20);
        let remote = event(14, &[], 20);
        assert_eq!(local.merge(&remote).start_time, remote.start_time);
    }

    #[test]
    fn event_task_ids_are_unioned() {
        let local = event(10, &["t1"], 10);
        let remote = event(10, &["t2"], 20);
        assert_eq!(local.merge(&remote).task_ids, ids(&["t1", "t2"]));
    }

    #[test]
    fn event_merge_is_idempotent() {
        let a = event(10, &["t1"], 30);
        let b = event(14, &["t2"], 20);
        let once = a.merge(&b);

        assert_eq!(a.merge(&a), a);
        assert_eq!(once.merge(&b), once);
    }
}
