//! `threadon timers`: routines with random start delays, reported in the
//! order the scheduler fired them.

use crate::output::StyledOutput;
use anyhow::{bail, ensure, Context as _};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use threadon_engine::scheduler::deadline_after;
use threadon_engine::{Context, Scheduler, SchedulerConfig, Step, MAX_TIMER_DELAY};

/// One routine's first resume
#[derive(Debug, Clone, Copy)]
pub struct Firing {
    /// Registration order
    pub index: usize,
    pub delay: Duration,
    pub deadline: Instant,
    pub fired_at: Instant,
}

impl Firing {
    /// How far past its deadline the routine ran
    pub fn lateness(&self) -> Duration {
        self.fired_at.saturating_duration_since(self.deadline)
    }
}

#[derive(Debug, Clone)]
pub struct TimersReport {
    /// Firings in the order the worker resumed them
    pub firings: Vec<Firing>,
    pub elapsed: Duration,
}

impl TimersReport {
    /// Whether deadlines never decreased across the firing order
    pub fn in_order(&self) -> bool {
        self.firings
            .windows(2)
            .all(|pair| pair[0].deadline <= pair[1].deadline)
    }

    pub fn max_lateness(&self) -> Duration {
        self.firings
            .iter()
            .map(Firing::lateness)
            .max()
            .unwrap_or_default()
    }
}

/// Schedule `count` routines, each first resumed after a random delay in
/// `0..=max_delay`, and record when they actually ran.
pub fn run(
    config: SchedulerConfig,
    count: usize,
    max_delay: Duration,
    seed: Option<u64>,
) -> anyhow::Result<TimersReport> {
    ensure!(
        max_delay <= MAX_TIMER_DELAY,
        "max delay {:?} exceeds the timer limit of {:?}",
        max_delay,
        MAX_TIMER_DELAY
    );
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let max_ms = max_delay.as_millis() as u64;

    let scheduler = Scheduler::try_new(config)?;
    let fired = Arc::new(Mutex::new(Vec::with_capacity(count)));
    let base = Instant::now();

    for index in 0..count {
        let delay = Duration::from_millis(rng.gen_range(0..=max_ms));
        let deadline = deadline_after(base, delay);
        let fired = fired.clone();
        scheduler.spawn_at(
            move |cx: &mut Context<'_>| {
                fired.lock().push(Firing {
                    index,
                    delay,
                    deadline,
                    fired_at: cx.now(),
                });
                Step::Complete
            },
            deadline,
        );
    }

    scheduler
        .start()
        .context("failed to start scheduler worker")?;

    let timeout = max_delay.saturating_add(Duration::from_secs(5));
    if !scheduler.wait_idle(timeout) {
        let pending = scheduler.stats().pending_timers;
        scheduler.shutdown();
        bail!("{} timers still pending after {:?}", pending, timeout);
    }

    let elapsed = base.elapsed();
    scheduler.shutdown();

    let firings = std::mem::take(&mut *fired.lock());
    Ok(TimersReport { firings, elapsed })
}

pub fn execute(
    out: &mut StyledOutput,
    config: SchedulerConfig,
    count: usize,
    max_delay: Duration,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let report = run(config, count, max_delay, seed)?;

    out.heading("timers");
    for firing in &report.firings {
        out.plain(&format!(
            "  #{:<5} delay {:>6}ms  late {:>8.3}ms",
            firing.index,
            firing.delay.as_millis(),
            firing.lateness().as_secs_f64() * 1000.0
        ));
        out.newline();
    }
    out.field("fired", report.firings.len());
    out.field("max lateness", format!("{:?}", report.max_lateness()));
    out.field("elapsed", format!("{:?}", report.elapsed));

    if report.in_order() {
        out.pass_badge();
        out.plain(" deadlines fired in order");
        out.newline();
        out.flush();
        Ok(())
    } else {
        out.fail_badge();
        out.plain(" deadlines fired out of order");
        out.newline();
        out.flush();
        bail!("timer order check failed")
    }
}
