//! Task handle and the resumable computation it wraps

use crate::scheduler::Context;
use std::fmt;

/// Outcome of one resumption step
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// The routine gave up the worker and wants to run again later.
    ///
    /// It must re-arm itself (for example with [`Context::sleep`] or
    /// [`Context::yield_now`]) before returning, or nobody will resume it.
    Suspended,
    /// The routine ran to completion
    Complete,
}

/// A unit of suspended computation.
///
/// Each call to `resume` runs one step and reports whether the routine has
/// finished. Routines are resumed only on the scheduler's worker thread, one
/// step at a time.
pub trait Routine: Send + 'static {
    /// Run until the next suspension point or completion
    fn resume(&mut self, cx: &mut Context<'_>) -> Step;
}

impl<F> Routine for F
where
    F: FnMut(&mut Context<'_>) -> Step + Send + 'static,
{
    fn resume(&mut self, cx: &mut Context<'_>) -> Step {
        self(cx)
    }
}

/// Unique identifier for a Task
///
/// Ids are handed out by the owning task table from a counter that never
/// repeats, so an id outliving its task can never name a different one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Create a TaskId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        TaskId(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a Task
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Created, never resumed
    Created,
    /// Checked out by the worker and executing a step
    Running,
    /// Between steps
    Suspended,
    /// Ran to completion; further resumes are no-ops
    Completed,
}

/// Move-only owner of one routine.
///
/// Dropping an unfinished task releases its routine. A task is never `Clone`,
/// so the routine is released exactly once.
pub struct Task {
    routine: Option<Box<dyn Routine>>,
    state: TaskState,
}

impl Task {
    /// Wrap a routine in a fresh, not-yet-started task
    pub fn new<R: Routine>(routine: R) -> Self {
        Self::from_boxed(Box::new(routine))
    }

    /// Wrap an already boxed routine
    pub fn from_boxed(routine: Box<dyn Routine>) -> Self {
        Self {
            routine: Some(routine),
            state: TaskState::Created,
        }
    }

    /// Run one step. A completed task is left untouched.
    ///
    /// The routine is released as soon as it reports completion.
    pub fn resume(&mut self, cx: &mut Context<'_>) -> TaskState {
        let Some(routine) = self.routine.as_mut() else {
            return self.state;
        };

        self.state = TaskState::Running;
        match routine.resume(cx) {
            Step::Complete => {
                self.state = TaskState::Completed;
                self.routine = None;
            }
            Step::Suspended => self.state = TaskState::Suspended,
        }
        self.state
    }

    /// Whether the routine has run to completion
    pub fn done(&self) -> bool {
        self.state == TaskState::Completed
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.state
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("state", &self.state).finish()
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if self.routine.take().is_some() {
            tracing::trace!(state = ?self.state, "releasing unfinished task");
        }
    }
}
