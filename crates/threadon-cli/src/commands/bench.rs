//! `threadon bench`: spawn many single-shot routines and time them.

use crate::output::StyledOutput;
use anyhow::{bail, Context as _};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use threadon_engine::{Context, Scheduler, SchedulerConfig, SchedulerStats, Step, Stopwatch};

/// Outcome of a bench run
#[derive(Debug, Clone)]
pub struct BenchReport {
    /// Routines that ran to completion
    pub completed: usize,
    /// Time from the first spawn until the scheduler went idle
    pub elapsed: Duration,
    pub stats: SchedulerStats,
}

impl BenchReport {
    pub fn tasks_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.completed as f64 / secs
    }
}

/// Spawn `tasks` routines that each finish on their first resume, then wait
/// for all of them.
pub fn run(config: SchedulerConfig, tasks: usize, timeout: Duration) -> anyhow::Result<BenchReport> {
    let scheduler = Scheduler::try_new(config)?;
    scheduler
        .start()
        .context("failed to start scheduler worker")?;

    let completed = Arc::new(AtomicUsize::new(0));
    let stopwatch = Stopwatch::start_new();

    for n in 0..tasks {
        let completed = completed.clone();
        scheduler
            .spawn(move |_cx: &mut Context<'_>| {
                completed.fetch_add(1, Ordering::Relaxed);
                Step::Complete
            })
            .with_context(|| format!("failed to spawn routine {}", n))?;
    }

    if !scheduler.wait_idle(timeout) {
        let done = completed.load(Ordering::Relaxed);
        scheduler.shutdown();
        bail!(
            "only {} of {} routines completed within {:?}",
            done,
            tasks,
            timeout
        );
    }

    let elapsed = stopwatch.elapsed();
    let stats = scheduler.stats();
    scheduler.shutdown();
    tracing::info!(tasks, ?elapsed, "bench finished");

    Ok(BenchReport {
        completed: completed.load(Ordering::Relaxed),
        elapsed,
        stats,
    })
}

pub fn execute(
    out: &mut StyledOutput,
    config: SchedulerConfig,
    tasks: usize,
    timeout: Duration,
) -> anyhow::Result<()> {
    let capacity = config.queue_capacity;
    let report = run(config, tasks, timeout)?;

    out.heading("bench");
    out.field("queue capacity", capacity);
    out.field("tasks", tasks);
    out.field("completed", report.completed);
    out.field("elapsed", format!("{:.6}s", report.elapsed.as_secs_f64()));
    out.field("throughput", format!("{:.0} tasks/s", report.tasks_per_sec()));
    out.field("resumes", report.stats.resumes);

    if report.completed == tasks {
        out.success(&format!("All {} routines completed", tasks));
    } else {
        out.warning(&format!("{} of {} routines completed", report.completed, tasks));
    }
    out.newline();
    out.flush();
    Ok(())
}
