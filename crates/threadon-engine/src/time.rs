//! Time sources used by the timer set, plus a stopwatch and sleep helper.

use parking_lot::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Source of "now" for deadline computation.
///
/// The timer set reads the clock whenever a delay is turned into an absolute
/// deadline and whenever the worker sweeps for due entries.
pub trait Clock: Send + Sync {
    /// Current point in time
    fn now(&self) -> Instant;
}

/// Wall-independent monotonic clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
///
/// Lets timer ordering be tested without real sleeps.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a clock frozen at `start`
    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Measures elapsed wall time between `start()` and `elapsed()`.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started_at: Instant,
}

impl Stopwatch {
    /// Create a stopwatch that is already running
    pub fn start_new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Restart measurement from now
    pub fn start(&mut self) {
        self.started_at = Instant::now();
    }

    /// Time since the last `start()`
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time since the last `start()`, in fractional seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start_new()
    }
}

/// Block the calling thread for `ms` milliseconds.
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}
