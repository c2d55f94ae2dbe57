//! Public scheduler handle

use crate::scheduler::shared::Shared;
use crate::scheduler::worker::Worker;
use crate::scheduler::{
    ConfigError, Consumer, Routine, ScheduleError, SchedulerConfig, SpawnError, Task, TaskId,
    TaskState,
};
use crate::time::{Clock, MonotonicClock};
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scheduler statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Total tasks spawned
    pub tasks_spawned: u64,

    /// Total tasks that ran to completion
    pub tasks_completed: u64,

    /// Total resume steps executed
    pub resumes: u64,

    /// Timer entries promoted into the ready queue
    pub timers_fired: u64,

    /// Tasks currently owned by the scheduler
    pub live_tasks: usize,

    /// Timer entries not yet due
    pub pending_timers: usize,
}

/// Cooperative scheduler with a single worker thread.
///
/// Lifecycle: `new` → `start` → (`spawn`, `schedule_after`, ...) → `stop` →
/// `join`. `shutdown` does the last two and releases every task still parked;
/// dropping the scheduler calls it.
pub struct Scheduler {
    shared: Arc<Shared>,

    /// Consuming end of the ready queue until the worker takes it
    consumer: Mutex<Option<Consumer<TaskId>>>,

    worker: Mutex<Worker>,
}

impl Scheduler {
    /// Create a scheduler.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails [`SchedulerConfig::validate`].
    pub fn new(config: SchedulerConfig) -> Self {
        match Self::try_new(config) {
            Ok(scheduler) => scheduler,
            Err(err) => panic!("invalid scheduler config: {}", err),
        }
    }

    /// Create a scheduler, rejecting an invalid config
    pub fn try_new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Create a scheduler whose timer set reads time from `clock`
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shared, consumer) = Shared::with_clock(config, clock);
        let shared = Arc::new(shared);

        Ok(Self {
            worker: Mutex::new(Worker::new(shared.clone())),
            consumer: Mutex::new(Some(consumer)),
            shared,
        })
    }

    /// Configuration this scheduler was built with
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Start the worker thread.
    ///
    /// Only the first call starts anything; a scheduler is never restarted.
    /// Once [`stop`](Self::stop) or [`shutdown`](Self::shutdown) has been
    /// called, `start` does nothing.
    pub fn start(&self) -> io::Result<()> {
        let mut slot = self.consumer.lock();
        let Some(consumer) = slot.take() else {
            return Ok(());
        };

        if !self.shared.lifecycle.begin() {
            *slot = Some(consumer);
            tracing::debug!("stop already requested; worker not started");
            return Ok(());
        }
        drop(slot);

        self.worker.lock().start(consumer)?;
        tracing::info!(
            capacity = self.shared.config.queue_capacity,
            batch_size = self.shared.config.batch_size,
            "scheduler started"
        );
        Ok(())
    }

    /// Whether the worker thread is currently attached
    pub fn is_started(&self) -> bool {
        self.worker.lock().is_attached()
    }

    /// Whether the worker loop is (still) meant to run
    pub fn is_running(&self) -> bool {
        self.shared.lifecycle.is_running()
    }

    /// Spawn a routine and queue it for its first resume.
    ///
    /// Retries with backoff while the ready queue is full, for at most the
    /// configured spawn timeout.
    pub fn spawn<R: Routine>(&self, routine: R) -> Result<TaskId, SpawnError> {
        self.shared.spawn_task(Task::new(routine))
    }

    /// Spawn a routine whose first resume happens once `delay` has elapsed
    pub fn spawn_after<R: Routine>(&self, routine: R, delay: Duration) -> TaskId {
        self.shared.spawn_after(Task::new(routine), delay)
    }

    /// Spawn a routine whose first resume happens at `deadline`.
    ///
    /// Routines given the same deadline run in the order they were spawned.
    pub fn spawn_at<R: Routine>(&self, routine: R, deadline: Instant) -> TaskId {
        self.shared.spawn_at(Task::new(routine), deadline)
    }

    /// Register a live task for resumption after `delay`.
    ///
    /// Callable from any thread. The entry cannot be cancelled once added.
    pub fn schedule_after(&self, id: TaskId, delay: Duration) -> Result<(), ScheduleError> {
        self.shared.schedule_after(id, delay).map(|_| ())
    }

    /// State of a live task, or `None` once it has completed or been released
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.shared.table.state(id)
    }

    /// Number of live tasks
    pub fn task_count(&self) -> usize {
        self.shared.table.len()
    }

    /// Ask the worker to leave its loop. Queued tasks and timers are kept.
    ///
    /// Final: a stopped scheduler never starts again.
    pub fn stop(&self) {
        self.shared.lifecycle.stop();
    }

    /// Block until the worker thread has exited. Returns at once if the
    /// worker was never started.
    pub fn join(&self) {
        self.worker.lock().join();
    }

    /// Stop, join and release every task still owned by the scheduler
    pub fn shutdown(&self) {
        self.stop();
        self.join();

        let released = self.shared.table.drain();
        self.shared.timers.clear();
        if !released.is_empty() {
            tracing::debug!(released = released.len(), "released unfinished tasks");
        }
        drop(released);
    }

    /// Wait until no live task remains, or `timeout` elapses.
    ///
    /// Returns whether the scheduler went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.shared.table.wait_empty(timeout)
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            tasks_spawned: counters.spawned.load(Ordering::Relaxed),
            tasks_completed: counters.completed.load(Ordering::Relaxed),
            resumes: counters.resumes.load(Ordering::Relaxed),
            timers_fired: counters.timers_fired.load(Ordering::Relaxed),
            live_tasks: self.shared.table.len(),
            pending_timers: self.shared.timers.len(),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("running", &self.is_running())
            .field("live_tasks", &self.task_count())
            .field("pending_timers", &self.shared.timers.len())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
