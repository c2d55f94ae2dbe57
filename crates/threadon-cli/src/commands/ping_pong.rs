//! `threadon ping-pong`: two routines take turns, yielding after every step.

use crate::output::StyledOutput;
use anyhow::{bail, ensure, Context as _};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use threadon_engine::{
    Context, Scheduler, SchedulerConfig, SchedulerError, SchedulerStats, Step, Stopwatch,
};

#[derive(Debug, Clone)]
pub struct PingPongReport {
    /// Who hit the ball, in order
    pub transcript: Vec<&'static str>,
    pub elapsed: Duration,
    pub stats: SchedulerStats,
}

impl PingPongReport {
    /// Whether no player ever hit twice in a row
    pub fn alternates(&self) -> bool {
        self.transcript.windows(2).all(|pair| pair[0] != pair[1])
    }
}

/// A player hits when the volley count has its parity, then yields so the
/// other player gets a turn.
fn player(
    name: &'static str,
    parity: usize,
    rounds: usize,
    volley: Arc<AtomicUsize>,
    transcript: Arc<Mutex<Vec<&'static str>>>,
) -> impl FnMut(&mut Context<'_>) -> Step {
    let mut hits = 0;
    move |cx: &mut Context<'_>| {
        if volley.load(Ordering::Acquire) % 2 == parity {
            transcript.lock().push(name);
            hits += 1;
            volley.fetch_add(1, Ordering::Release);
            if hits == rounds {
                return Step::Complete;
            }
        }
        cx.yield_now();
        Step::Suspended
    }
}

/// Build a scheduler with both players queued but the worker not started
pub fn set_table(
    config: SchedulerConfig,
    rounds: usize,
    volley: &Arc<AtomicUsize>,
    transcript: &Arc<Mutex<Vec<&'static str>>>,
) -> Result<Scheduler, SchedulerError> {
    let scheduler = Scheduler::try_new(config)?;
    scheduler.spawn(player("ping", 0, rounds, volley.clone(), transcript.clone()))?;
    scheduler.spawn(player("pong", 1, rounds, volley.clone(), transcript.clone()))?;
    Ok(scheduler)
}

pub fn run(config: SchedulerConfig, rounds: usize) -> anyhow::Result<PingPongReport> {
    ensure!(rounds > 0, "ping-pong needs at least one round");

    let volley = Arc::new(AtomicUsize::new(0));
    let transcript = Arc::new(Mutex::new(Vec::with_capacity(rounds * 2)));
    let scheduler = set_table(config, rounds, &volley, &transcript)?;

    let stopwatch = Stopwatch::start_new();
    scheduler
        .start()
        .context("failed to start scheduler worker")?;

    if !scheduler.wait_idle(Duration::from_secs(30)) {
        let hits = volley.load(Ordering::Acquire);
        scheduler.shutdown();
        bail!("rally stalled after {} hits", hits);
    }

    let elapsed = stopwatch.elapsed();
    let stats = scheduler.stats();
    scheduler.shutdown();

    let transcript = std::mem::take(&mut *transcript.lock());
    Ok(PingPongReport {
        transcript,
        elapsed,
        stats,
    })
}

pub fn execute(out: &mut StyledOutput, config: SchedulerConfig, rounds: usize) -> anyhow::Result<()> {
    let report = run(config, rounds)?;

    out.heading("ping-pong");
    for (turn, name) in report.transcript.iter().enumerate() {
        out.plain(&format!("  {:>4} ", turn + 1));
        if *name == "ping" {
            out.info(name);
        } else {
            out.warning(name);
        }
        out.newline();
    }
    out.field("hits", report.transcript.len());
    out.field("resumes", report.stats.resumes);
    out.field("elapsed", format!("{:?}", report.elapsed));

    if report.alternates() {
        out.success("Players alternated on every turn");
    } else {
        out.error("A player hit twice in a row");
    }
    out.newline();
    out.flush();
    Ok(())
}
