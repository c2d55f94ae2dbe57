//! State shared between the scheduler handle and its worker thread

use crate::scheduler::{
    Consumer, Context, DueTimer, Producer, ReadyQueue, ScheduleError, SchedulerConfig, SpawnError,
    Task, TaskId, TaskState, TaskTable, TimerSet,
};
use crate::time::Clock;
use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic event counters
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) spawned: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) resumes: AtomicU64,
    pub(crate) timers_fired: AtomicU64,
}

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Worker lifecycle: Idle → Running → Stopped, or Idle → Stopped.
///
/// Never moves backwards, so a stop requested before the worker starts
/// keeps it from ever starting.
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Move Idle → Running. Fails once started or stopped.
    pub(crate) fn begin(&self) -> bool {
        self.0
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn stop(&self) {
        self.0.store(STOPPED, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) == RUNNING
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire) == STOPPED
    }
}

pub(crate) struct Shared {
    pub(crate) config: SchedulerConfig,
    pub(crate) table: TaskTable,
    pub(crate) timers: TimerSet,
    /// The one push capability on the ready queue. Every producer path
    /// (spawn, yield, timer promotion) goes through this lock.
    producer: Mutex<Producer<TaskId>>,
    /// Observed by the worker at the top of every iteration
    pub(crate) lifecycle: Lifecycle,
    pub(crate) counters: Counters,
}

impl Shared {
    /// Build shared state and return the consumer half for the worker.
    ///
    /// `config` must already be validated.
    pub(crate) fn with_clock(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, Consumer<TaskId>) {
        let (producer, consumer) = ReadyQueue::new(config.queue_capacity).split();
        let shared = Self {
            config,
            table: TaskTable::new(),
            timers: TimerSet::with_clock(clock),
            producer: Mutex::new(producer),
            lifecycle: Lifecycle::new(),
            counters: Counters::default(),
        };
        (shared, consumer)
    }

    #[cfg(test)]
    pub(crate) fn new(config: SchedulerConfig) -> (Self, Consumer<TaskId>) {
        Self::with_clock(config, Arc::new(crate::time::MonotonicClock))
    }

    /// Spawn from outside the worker: wait for room with bounded backoff.
    pub(crate) fn spawn_task(&self, task: Task) -> Result<TaskId, SpawnError> {
        let id = self.table.insert(task);
        match self.push_with_backoff(id) {
            Ok(()) => {
                self.counters.spawned.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(task = %id, "spawned");
                Ok(id)
            }
            Err(err) => {
                self.table.remove(id);
                tracing::warn!(task = %id, error = %err, "spawn rejected");
                Err(err)
            }
        }
    }

    /// Spawn from inside a routine. Never blocks the worker: if the queue is
    /// full the new task goes through the timer set instead.
    pub(crate) fn spawn_local(&self, task: Task) -> TaskId {
        let id = self.table.insert(task);
        self.enqueue_or_defer(id);
        self.counters.spawned.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Insert a task that first runs once `delay` has elapsed
    pub(crate) fn spawn_after(&self, task: Task, delay: Duration) -> TaskId {
        let id = self.table.insert(task);
        self.timers.schedule_after(id, delay);
        self.counters.spawned.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Insert a task that first runs at `deadline`
    pub(crate) fn spawn_at(&self, task: Task, deadline: Instant) -> TaskId {
        let id = self.table.insert(task);
        self.timers.schedule_at(id, deadline);
        self.counters.spawned.fetch_add(1, Ordering::Relaxed);
        id
    }

    /// Register a live task for resumption after `delay`
    pub(crate) fn schedule_after(
        &self,
        id: TaskId,
        delay: Duration,
    ) -> Result<Instant, ScheduleError> {
        if !self.table.contains(id) {
            return Err(ScheduleError::UnknownTask(id));
        }
        Ok(self.timers.schedule_after(id, delay))
    }

    /// Push without blocking; fall back to an already-due timer when full
    pub(crate) fn enqueue_or_defer(&self, id: TaskId) {
        let pushed = self.producer.lock().try_push(id);
        if pushed.is_err() {
            tracing::debug!(task = %id, "ready queue full, deferring to timer set");
            self.timers.schedule_after(id, Duration::ZERO);
        }
    }

    fn push_with_backoff(&self, id: TaskId) -> Result<(), SpawnError> {
        let timeout = self.config.spawn_timeout();
        let started = Instant::now();
        let backoff = Backoff::new();

        loop {
            let pushed = self.producer.lock().try_push(id);
            if pushed.is_ok() {
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(SpawnError::QueueFull {
                    capacity: self.config.queue_capacity,
                    waited,
                });
            }
            backoff.snooze();
        }
    }

    /// Resume one ready id. Must only be called from the worker thread.
    pub(crate) fn resume(&self, id: TaskId) {
        let Some(mut task) = self.table.check_out(id) else {
            tracing::trace!(task = %id, "skipping stale ready entry");
            return;
        };

        let mut cx = Context::new(id, self);
        let state = match panic::catch_unwind(AssertUnwindSafe(|| task.resume(&mut cx))) {
            Ok(state) => state,
            Err(payload) => {
                tracing::error!(
                    task = %id,
                    "routine panicked: {}; aborting",
                    panic_message(payload.as_ref())
                );
                std::process::abort();
            }
        };
        self.counters.resumes.fetch_add(1, Ordering::Relaxed);

        if state == TaskState::Completed {
            drop(task);
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
            self.table.retire(id);
            tracing::trace!(task = %id, "completed");
        } else {
            if !cx.rearmed() {
                tracing::trace!(task = %id, "suspended without re-arming; parked");
            }
            self.table.check_in(id, task);
        }
    }

    /// Move due timers into the ready queue. Entries that do not fit are
    /// restored with their original deadline. Returns how many were promoted.
    pub(crate) fn promote_due_timers(&self, due: &mut Vec<DueTimer>) -> usize {
        due.clear();
        if self.timers.drain_due(self.timers.now(), due) == 0 {
            return 0;
        }

        let mut promoted = 0;
        let mut full = false;
        let mut producer = self.producer.lock();
        for entry in due.drain(..) {
            if !full && producer.try_push(entry.task_id).is_ok() {
                promoted += 1;
                continue;
            }
            full = true;
            self.timers.restore(entry);
        }
        drop(producer);

        if full {
            tracing::debug!(promoted, "ready queue full during timer sweep");
        }
        self.counters
            .timers_fired
            .fetch_add(promoted as u64, Ordering::Relaxed);
        promoted
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
