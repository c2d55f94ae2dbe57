//! Per-resume view of the scheduler handed to a running routine

use crate::scheduler::shared::Shared;
use crate::scheduler::{Routine, ScheduleError, Task, TaskId};
use std::time::{Duration, Instant};

/// What a routine can ask of the scheduler while it is being resumed.
///
/// A routine that returns [`Step::Suspended`](crate::Step::Suspended) without
/// calling [`sleep`](Self::sleep), [`yield_now`](Self::yield_now) or
/// [`schedule_after`](Self::schedule_after) on its own id stays parked until
/// someone else re-arms it through
/// [`Scheduler::schedule_after`](crate::Scheduler::schedule_after).
pub struct Context<'a> {
    task_id: TaskId,
    shared: &'a Shared,
    rearmed: bool,
}

impl<'a> Context<'a> {
    pub(crate) fn new(task_id: TaskId, shared: &'a Shared) -> Self {
        Self {
            task_id,
            shared,
            rearmed: false,
        }
    }

    /// Id of the task being resumed
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Current time on the scheduler's clock
    pub fn now(&self) -> Instant {
        self.shared.timers.now()
    }

    /// Resume this task again once `delay` has elapsed
    pub fn sleep(&mut self, delay: Duration) {
        self.shared.timers.schedule_after(self.task_id, delay);
        self.rearmed = true;
    }

    /// Resume this task again on a later loop iteration
    pub fn yield_now(&mut self) {
        self.shared.enqueue_or_defer(self.task_id);
        self.rearmed = true;
    }

    /// Spawn a new task. Never blocks the worker.
    pub fn spawn<R: Routine>(&mut self, routine: R) -> TaskId {
        self.shared.spawn_local(Task::new(routine))
    }

    /// Spawn a new task that first runs after `delay`
    pub fn spawn_after<R: Routine>(&mut self, routine: R, delay: Duration) -> TaskId {
        self.shared.spawn_after(Task::new(routine), delay)
    }

    /// Register any live task (this one included) for resumption after `delay`
    pub fn schedule_after(&mut self, id: TaskId, delay: Duration) -> Result<(), ScheduleError> {
        self.shared.schedule_after(id, delay)?;
        if id == self.task_id {
            self.rearmed = true;
        }
        Ok(())
    }

    /// Whether a stop has been requested
    pub fn is_stopping(&self) -> bool {
        self.shared.lifecycle.is_stopped()
    }

    pub(crate) fn rearmed(&self) -> bool {
        self.rearmed
    }
}
