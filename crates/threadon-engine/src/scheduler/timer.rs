//! Timer set for delayed re-entry into the ready queue
//!
//! Entries live in a min-heap ordered by deadline, ties broken by insertion
//! order. Registration is callable from any thread, the worker included. The
//! worker sweeps due entries out under the lock and only touches the task ids
//! after releasing it, so a resumed task may register a new timer freely.

use crate::scheduler::TaskId;
use crate::time::{Clock, MonotonicClock};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest delay a timer honours. Longer delays are clamped to it so the
/// deadline stays representable as an `Instant`.
pub const MAX_TIMER_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// `now + delay`, clamped to [`MAX_TIMER_DELAY`] and never overflowing
pub fn deadline_after(now: Instant, delay: Duration) -> Instant {
    let mut delay = delay.min(MAX_TIMER_DELAY);
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}

/// Entry in the timer heap
struct SleepEntry {
    /// When the task becomes ready
    wake_at: Instant,
    /// Insertion sequence, breaks ties between equal deadlines
    seq: u64,
    /// Task to wake
    task_id: TaskId,
}

impl SleepEntry {
    fn key(&self) -> (Instant, u64) {
        (self.wake_at, self.seq)
    }
}

// Reverse ordering for min-heap (earliest wake time first)
impl Ord for SleepEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for SleepEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SleepEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SleepEntry {}

/// A timer entry whose deadline has passed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    /// Task to wake
    pub task_id: TaskId,
    /// Deadline it was registered with
    pub deadline: Instant,
    seq: u64,
}

struct TimerState {
    sleeping: BinaryHeap<SleepEntry>,
    next_seq: u64,
}

/// Deadline-ordered set of task ids waiting to become ready
pub struct TimerSet {
    state: Mutex<TimerState>,
    clock: Arc<dyn Clock>,
}

impl TimerSet {
    /// Create an empty set on the monotonic clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock))
    }

    /// Create an empty set reading time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(TimerState {
                sleeping: BinaryHeap::new(),
                next_seq: 0,
            }),
            clock,
        }
    }

    /// Current time according to this set's clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Register `task_id` to become ready `delay` from now.
    ///
    /// Returns the absolute deadline. Delays beyond [`MAX_TIMER_DELAY`] are
    /// clamped.
    pub fn schedule_after(&self, task_id: TaskId, delay: Duration) -> Instant {
        let deadline = deadline_after(self.clock.now(), delay);
        self.schedule_at(task_id, deadline);
        deadline
    }

    /// Register `task_id` to become ready at `deadline`
    pub fn schedule_at(&self, task_id: TaskId, deadline: Instant) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.sleeping.push(SleepEntry {
            wake_at: deadline,
            seq,
            task_id,
        });
    }

    /// Move every entry with a deadline at or before `now` into `out`, in
    /// deadline order. Returns how many were moved.
    pub fn drain_due(&self, now: Instant, out: &mut Vec<DueTimer>) -> usize {
        let mut state = self.state.lock();
        let before = out.len();
        while let Some(entry) = state.sleeping.peek() {
            if entry.wake_at > now {
                break;
            }
            if let Some(entry) = state.sleeping.pop() {
                out.push(DueTimer {
                    task_id: entry.task_id,
                    deadline: entry.wake_at,
                    seq: entry.seq,
                });
            }
        }
        out.len() - before
    }

    /// Put a due entry back with its original deadline and position.
    ///
    /// Used when the ready queue had no room for it; the entry is picked up
    /// again by the next sweep.
    pub fn restore(&self, due: DueTimer) {
        self.state.lock().sleeping.push(SleepEntry {
            wake_at: due.deadline,
            seq: due.seq,
            task_id: due.task_id,
        });
    }

    /// Earliest registered deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.lock().sleeping.peek().map(|entry| entry.wake_at)
    }

    /// Number of pending entries
    pub fn len(&self) -> usize {
        self.state.lock().sleeping.len()
    }

    /// Whether no entry is pending
    pub fn is_empty(&self) -> bool {
        self.state.lock().sleeping.is_empty()
    }

    /// Drop every pending entry
    pub fn clear(&self) {
        self.state.lock().sleeping.clear();
    }
}

impl Default for TimerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSet")
            .field("pending", &self.len())
            .finish()
    }
}
