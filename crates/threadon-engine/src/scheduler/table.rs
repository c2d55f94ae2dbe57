//! Task table: the single owner of every live task
//!
//! The ready queue and the timer set only ever carry [`TaskId`]s. Resuming or
//! releasing a task always goes through this table, so a stale id can at worst
//! miss; it can never reach a task that was already released.

use crate::scheduler::{Task, TaskId, TaskState};
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

enum Slot {
    /// Parked between resumes
    Parked(Task),
    /// Taken by the worker for the duration of one resume
    CheckedOut,
}

/// Arena of live tasks keyed by never-reused ids
pub struct TaskTable {
    slots: Mutex<FxHashMap<TaskId, Slot>>,
    next_id: AtomicU64,
    /// Signalled whenever the table becomes empty
    idle: Condvar,
}

impl TaskTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
            idle: Condvar::new(),
        }
    }

    /// Take ownership of `task` and return its new id
    pub fn insert(&self, task: Task) -> TaskId {
        let id = TaskId::from_u64(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().insert(id, Slot::Parked(task));
        id
    }

    /// Take the task out for resumption.
    ///
    /// Returns `None` if the id is unknown (already completed or released) or
    /// the task is already checked out.
    pub fn check_out(&self, id: TaskId) -> Option<Task> {
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(&id)?;
        match std::mem::replace(slot, Slot::CheckedOut) {
            Slot::Parked(task) => Some(task),
            Slot::CheckedOut => None,
        }
    }

    /// Put a checked-out task back after a step that did not complete it.
    ///
    /// If the slot was released while the task was out, the task is dropped.
    pub fn check_in(&self, id: TaskId, task: Task) {
        let mut slots = self.slots.lock();
        match slots.get_mut(&id) {
            Some(slot) => *slot = Slot::Parked(task),
            None => {
                drop(slots);
                tracing::debug!(task = %id, "slot released while checked out");
            }
        }
    }

    /// Drop the slot of a task that finished while checked out
    pub fn retire(&self, id: TaskId) {
        let mut slots = self.slots.lock();
        slots.remove(&id);
        if slots.is_empty() {
            self.idle.notify_all();
        }
    }

    /// Remove a parked task, handing it back to the caller
    pub fn remove(&self, id: TaskId) -> Option<Task> {
        let mut slots = self.slots.lock();
        let removed = match slots.remove(&id)? {
            Slot::Parked(task) => Some(task),
            Slot::CheckedOut => None,
        };
        if slots.is_empty() {
            self.idle.notify_all();
        }
        removed
    }

    /// Whether `id` names a live task
    pub fn contains(&self, id: TaskId) -> bool {
        self.slots.lock().contains_key(&id)
    }

    /// State of a live task; checked-out tasks report `Running`
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        match self.slots.lock().get(&id)? {
            Slot::Parked(task) => Some(task.state()),
            Slot::CheckedOut => Some(TaskState::Running),
        }
    }

    /// Number of live tasks
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no task is live
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Remove every parked task, returning them so the caller controls when
    /// they are released
    pub fn drain(&self) -> Vec<Task> {
        let mut slots = self.slots.lock();
        let tasks = slots
            .drain()
            .filter_map(|(_, slot)| match slot {
                Slot::Parked(task) => Some(task),
                Slot::CheckedOut => None,
            })
            .collect();
        self.idle.notify_all();
        tasks
    }

    /// Block until the table is empty or `timeout` elapses.
    ///
    /// Returns whether the table was empty on return. A timeout too large to
    /// turn into a deadline waits without one.
    pub fn wait_empty(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut slots = self.slots.lock();
        while !slots.is_empty() {
            match deadline {
                Some(deadline) => {
                    if self.idle.wait_until(&mut slots, deadline).timed_out() {
                        return slots.is_empty();
                    }
                }
                None => self.idle.wait(&mut slots),
            }
        }
        true
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Context, Step};
    use std::sync::Arc;
    use std::thread;

    fn parked_task() -> Task {
        Task::new(|_cx: &mut Context<'_>| Step::Suspended)
    }

    #[test]
    fn test_ids_are_never_reused() {
        let table = TaskTable::new();
        let a = table.insert(parked_task());
        assert!(table.remove(a).is_some());
        let b = table.insert(parked_task());
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_check_out_and_in() {
        let table = TaskTable::new();
        let id = table.insert(parked_task());
        assert_eq!(table.state(id), Some(TaskState::Created));

        let task = table.check_out(id).expect("parked task");
        assert_eq!(table.state(id), Some(TaskState::Running));
        assert!(table.check_out(id).is_none(), "double check-out");

        table.check_in(id, task);
        assert_eq!(table.state(id), Some(TaskState::Created));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_retire_removes_slot() {
        let table = TaskTable::new();
        let id = table.insert(parked_task());
        let _task = table.check_out(id).unwrap();
        table.retire(id);
        assert!(!table.contains(id));
        assert!(table.check_out(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_stale_id_misses() {
        let table = TaskTable::new();
        assert!(table.check_out(TaskId::from_u64(42)).is_none());
        assert_eq!(table.state(TaskId::from_u64(42)), None);
    }

    #[test]
    fn test_drain_returns_parked_tasks() {
        let table = TaskTable::new();
        table.insert(parked_task());
        table.insert(parked_task());
        let out = table.insert(parked_task());
        let _checked_out = table.check_out(out).unwrap();

        let drained = table.drain();
        assert_eq!(drained.len(), 2);
        assert!(table.is_empty());
    }

    #[test]
    fn test_wait_empty() {
        let table = Arc::new(TaskTable::new());
        assert!(table.wait_empty(Duration::from_millis(1)));

        let id = table.insert(parked_task());
        assert!(!table.wait_empty(Duration::from_millis(20)));

        let remover = {
            let table = table.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                table.remove(id);
            })
        };
        assert!(table.wait_empty(Duration::from_secs(5)));
        remover.join().unwrap();
    }

    #[test]
    fn test_wait_empty_with_unbounded_timeout() {
        let table = Arc::new(TaskTable::new());
        assert!(table.wait_empty(Duration::MAX));

        let id = table.insert(parked_task());
        let remover = {
            let table = table.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                table.remove(id);
            })
        };
        assert!(table.wait_empty(Duration::MAX));
        remover.join().unwrap();
    }
}
