//! Threadon Engine
//!
//! A cooperative task scheduler built from three pieces:
//! - **Ready queue**: a bounded, lock-free single-producer/single-consumer ring
//!   of task ids (`scheduler::queue`)
//! - **Timer set**: a deadline-ordered heap that re-injects tasks into the ready
//!   queue once their delay has elapsed (`scheduler::timer`)
//! - **Scheduler loop**: one dedicated worker thread that batch-drains the ready
//!   queue, resumes tasks, promotes due timers and sleeps briefly between polls
//!
//! Tasks are [`Routine`]s: resumable state machines that run one step per
//! resume and report whether they are finished.
//!
//! # Example
//!
//! ```rust,ignore
//! use threadon_engine::{Scheduler, SchedulerConfig, Step};
//! use std::time::Duration;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::default());
//! scheduler.start();
//!
//! let mut ticks = 0;
//! scheduler.spawn(move |cx: &mut threadon_engine::Context<'_>| {
//!     ticks += 1;
//!     if ticks == 3 {
//!         return Step::Complete;
//!     }
//!     cx.sleep(Duration::from_millis(10));
//!     Step::Suspended
//! })?;
//!
//! scheduler.wait_idle(Duration::from_secs(1));
//! scheduler.shutdown();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Scheduler module: task handles, ready queue, timer set and worker loop
pub mod scheduler;

/// Clocks, sleeps and a stopwatch
pub mod time;

pub use scheduler::{
    ConfigError, Context, Routine, ScheduleError, Scheduler, SchedulerConfig, SchedulerError,
    SchedulerStats, SpawnError, Step, Task, TaskId, TaskState, MAX_TIMER_DELAY,
};
pub use time::{Clock, ManualClock, MonotonicClock, Stopwatch};
