//! Task Scheduler — single worker, polling loop
//!
//! One worker thread owns the consuming end of the ready queue. Producers push
//! task ids through the single producer handle; the timer set feeds due ids
//! back into the same producer. Tasks themselves live in the task table and
//! are checked out only for the duration of a resume.

mod config;
mod context;
mod error;
pub mod queue;
#[allow(clippy::module_inception)]
mod scheduler;
mod shared;
mod table;
mod task;
pub mod timer;
mod worker;

pub use config::{ConfigError, SchedulerConfig};
pub use context::Context;
pub use error::{ScheduleError, SchedulerError, SpawnError};
pub use queue::{Consumer, Producer, ReadyQueue, DEFAULT_QUEUE_CAPACITY};
pub use scheduler::{Scheduler, SchedulerStats};
pub use table::TaskTable;
pub use task::{Routine, Step, Task, TaskId, TaskState};
pub use timer::{deadline_after, DueTimer, TimerSet, MAX_TIMER_DELAY};
