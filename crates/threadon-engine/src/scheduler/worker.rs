//! Worker thread that drives the scheduler loop
//!
//! Each iteration drains a batch of ready ids and resumes them, promotes due
//! timers into the ready queue, then sleeps for the poll interval.

use crate::scheduler::shared::Shared;
use crate::scheduler::{Consumer, TaskId};
use std::io;
use std::sync::Arc;
use std::thread;

/// Worker thread that executes Tasks
pub(crate) struct Worker {
    /// Shared scheduler state
    shared: Arc<Shared>,

    /// Worker thread handle
    handle: Option<thread::JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            handle: None,
        }
    }

    /// Start the worker thread, handing it the consuming end of the queue.
    ///
    /// The caller must already have moved the lifecycle to running.
    pub(crate) fn start(&mut self, consumer: Consumer<TaskId>) -> io::Result<()> {
        let shared = self.shared.clone();

        let spawned = thread::Builder::new()
            .name("threadon-worker".to_string())
            .spawn(move || Worker::run_loop(shared, consumer));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                self.shared.lifecycle.stop();
                Err(err)
            }
        }
    }

    /// Whether a thread has been started and not yet joined
    pub(crate) fn is_attached(&self) -> bool {
        self.handle.is_some()
    }

    /// Block until the worker thread has left its loop
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("scheduler worker thread panicked");
            }
        }
    }

    /// Worker thread main loop
    fn run_loop(shared: Arc<Shared>, mut consumer: Consumer<TaskId>) {
        let batch_size = shared.config.batch_size;
        let poll_interval = shared.config.poll_interval();
        let mut batch = Vec::with_capacity(batch_size);
        let mut due = Vec::new();

        tracing::debug!(batch_size, ?poll_interval, "scheduler worker started");

        while shared.lifecycle.is_running() {
            batch.clear();
            if consumer.pop_batch(&mut batch, batch_size) > 0 {
                for id in batch.drain(..) {
                    shared.resume(id);
                }
            }

            shared.promote_due_timers(&mut due);

            thread::sleep(poll_interval);
        }

        tracing::debug!(
            queued = consumer.len(),
            pending_timers = shared.timers.len(),
            "scheduler worker exiting"
        );
    }
}
