//! Cooperative single-threaded scheduler.
//!
//! Nothing here runs on its own: the owner asks for the next due task with
//! [`Scheduler::pop_due`] and dispatches it. Cancelling a [`TaskId`] removes
//! the entry outright, so a superseded callback can never fire.

use serde::{Deserialize, Serialize};

use crate::SoundId;

/// Handle for a scheduled task. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

/// Which host facility a task rides on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lane {
    /// Display-refresh callbacks. The host may hold these back while the view
    /// is hidden.
    Frame,
    /// Plain timers. Always delivered, though possibly late.
    Timer,
}

/// Every kind of callback the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    VisualFrame,
    Watchdog,
    Ramp(SoundId),
    PreviewHold(SoundId),
}

#[derive(Debug, Clone)]
struct Entry {
    id: TaskId,
    task: Task,
    lane: Lane,
    due_ms: u64,
    period_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
    next_id: u64,
    frames_suspended: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to fire every `period_ms`, first at `now_ms + period_ms`.
    pub fn every(&mut self, task: Task, lane: Lane, period_ms: u64, now_ms: u64) -> TaskId {
        let period_ms = period_ms.max(1);
        self.insert(task, lane, now_ms + period_ms, Some(period_ms))
    }

    /// Schedules a one-shot timer.
    pub fn after(&mut self, task: Task, delay_ms: u64, now_ms: u64) -> TaskId {
        self.insert(task, Lane::Timer, now_ms + delay_ms, None)
    }

    fn insert(&mut self, task: Task, lane: Lane, due_ms: u64, period_ms: Option<u64>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        tracing::trace!(?id, ?task, ?lane, due_ms, "scheduled");
        self.entries.push(Entry {
            id,
            task,
            lane,
            due_ms,
            period_ms,
        });
        id
    }

    /// Removes a task. Returns `false` when it had already fired or been
    /// cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Number of pending entries for `task`.
    pub fn pending(&self, task: Task) -> usize {
        self.entries.iter().filter(|entry| entry.task == task).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Holds back (or releases) every frame-lane task, the way a host pauses
    /// display callbacks for a hidden view.
    pub fn set_frames_suspended(&mut self, suspended: bool) {
        self.frames_suspended = suspended;
    }

    pub fn frames_suspended(&self) -> bool {
        self.frames_suspended
    }

    /// Earliest deadline among deliverable tasks.
    pub fn next_due(&self) -> Option<u64> {
        self.deliverable().map(|entry| entry.due_ms).min()
    }

    /// Takes the earliest task due at `now_ms`. Periodic tasks are re-armed
    /// before they are handed out; missed periods collapse into one delivery.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TaskId, Task)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.is_deliverable(entry) && entry.due_ms <= now_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.id))
            .map(|(index, _)| index)?;

        let entry = &mut self.entries[index];
        let fired = (entry.id, entry.task);
        match entry.period_ms {
            Some(period) => {
                let next = entry.due_ms + period;
                entry.due_ms = if next <= now_ms { now_ms + period } else { next };
            }
            None => {
                self.entries.remove(index);
            }
        }
        Some(fired)
    }

    fn deliverable(&self) -> impl Iterator<Item = &Entry> {
        self.entries
            .iter()
            .filter(move |entry| self.is_deliverable(entry))
    }

    fn is_deliverable(&self, entry: &Entry) -> bool {
        !(self.frames_suspended && entry.lane == Lane::Frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_periodic_tasks_on_cadence() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.every(Task::Watchdog, Lane::Timer, 1_000, 0);

        assert_eq!(scheduler.pop_due(999), None);
        assert_eq!(scheduler.pop_due(1_000), Some((id, Task::Watchdog)));
        assert_eq!(scheduler.pop_due(1_000), None);
        assert_eq!(scheduler.next_due(), Some(2_000));
    }

    #[test]
    fn one_shot_tasks_fire_once() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.after(Task::PreviewHold(SoundId::Rain), 1_000, 100);

        assert_eq!(
            scheduler.pop_due(1_100),
            Some((id, Task::PreviewHold(SoundId::Rain)))
        );
        assert!(!scheduler.is_scheduled(id));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.every(Task::Ramp(SoundId::Waves), Lane::Timer, 50, 0);

        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert_eq!(scheduler.pop_due(10_000), None);
    }

    #[test]
    fn delivers_in_deadline_order() {
        let mut scheduler = Scheduler::new();
        let slow = scheduler.every(Task::Watchdog, Lane::Timer, 1_000, 0);
        let fast = scheduler.every(Task::VisualFrame, Lane::Frame, 16, 0);

        assert_eq!(scheduler.pop_due(1_000), Some((fast, Task::VisualFrame)));
        assert_eq!(scheduler.pop_due(1_000), Some((slow, Task::Watchdog)));
    }

    #[test]
    fn suspended_frames_are_held_but_timers_continue() {
        let mut scheduler = Scheduler::new();
        let frame = scheduler.every(Task::VisualFrame, Lane::Frame, 16, 0);
        let watchdog = scheduler.every(Task::Watchdog, Lane::Timer, 1_000, 0);
        scheduler.set_frames_suspended(true);

        assert_eq!(scheduler.next_due(), Some(1_000));
        assert_eq!(scheduler.pop_due(5_000), Some((watchdog, Task::Watchdog)));
        assert_eq!(scheduler.pop_due(5_000), None);

        scheduler.set_frames_suspended(false);
        assert_eq!(scheduler.pop_due(5_000), Some((frame, Task::VisualFrame)));
        assert_eq!(scheduler.next_due(), Some(5_016));
    }
}
