//! Bounded lock-free SPSC ring buffer for ready tasks.
//!
//! # Layout
//!
//! `C = 2^k` slots, a producer-owned `head` (next free slot) and a
//! consumer-owned `tail` (next occupied slot). Both indices are stored already
//! wrapped through `mask = C - 1`. `head == tail` means empty, so the queue
//! reports full when the slot after `head` would collide with `tail`: one slot
//! is always kept free and at most `C - 1` entries are live.
//!
//! # Ordering
//!
//! ```text
//! Producer writes slot, then Release-stores head  →  consumer Acquire-loads head, then reads slot
//! Consumer reads slot, then Release-stores tail   →  producer Acquire-loads tail, then writes slot
//! ```
//!
//! Each side reads its own index with `Relaxed`, since it is the only writer.
//!
//! # Single producer, single consumer
//!
//! [`ReadyQueue::split`] hands out exactly one [`Producer`] and one
//! [`Consumer`]. Neither is `Clone`, and both mutate through `&mut self`, so
//! two threads can never push (or pop) at the same time without some outer
//! synchronization the caller owns.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default capacity of a bare ready queue (2^20 slots)
pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 20;

/// Shared storage behind a producer/consumer pair.
///
/// Slots in `[tail, head)` (walking forward through the mask) are
/// initialized; every other slot is uninitialized.
struct Ring<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Next free slot. Written only by the producer.
    head: CachePadded<AtomicUsize>,
    /// Next occupied slot. Written only by the consumer.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: the producer only writes slots outside [tail, head) and the consumer
// only reads slots inside it; the Release/Acquire index handoff orders every
// slot access against the index update that makes it visible.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        assert!(
            capacity >= 2 && capacity.is_power_of_two(),
            "ready queue capacity must be a power of two >= 2, got {}",
            capacity
        );

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    fn capacity(&self) -> usize {
        self.mask + 1
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }

    fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Acquire) == self.head.load(Ordering::Acquire)
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let mut tail = *self.tail.get_mut();

        while tail != head {
            // SAFETY: slots in [tail, head) are initialized and nobody else can
            // observe the ring once we hold `&mut self`.
            unsafe { self.slots[tail].get_mut().assume_init_drop() };
            tail = (tail + 1) & self.mask;
        }
    }
}

/// A ready queue that has not been split into its two halves yet.
pub struct ReadyQueue<T> {
    ring: Arc<Ring<T>>,
}

impl<T> ReadyQueue<T> {
    /// Create a queue with `capacity` slots (`capacity - 1` usable).
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of two or is smaller than 2.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Ring::new(capacity)),
        }
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Split into the single producer and the single consumer
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        let producer = Producer {
            ring: Arc::clone(&self.ring),
        };
        let consumer = Consumer { ring: self.ring };
        (producer, consumer)
    }
}

impl<T> Default for ReadyQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl<T> fmt::Debug for ReadyQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.ring.len())
            .finish()
    }
}

/// Push rights on a ready queue. There is exactly one per queue.
pub struct Producer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Producer<T> {
    /// Try to append `value`.
    ///
    /// Returns `Err(value)` without blocking when the queue is full.
    pub fn try_push(&mut self, value: T) -> Result<(), T> {
        let ring = &*self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let next = (head + 1) & ring.mask;

        if next == ring.tail.load(Ordering::Acquire) {
            return Err(value);
        }

        // SAFETY: `head` is outside [tail, head), so the consumer is not
        // reading it, and it stays invisible until the Release store below.
        unsafe { (*ring.slots[head].get()).write(value) };
        ring.head.store(next, Ordering::Release);
        Ok(())
    }

    /// Whether the queue looked full at the time of the call
    pub fn is_full(&self) -> bool {
        let ring = &*self.ring;
        let next = (ring.head.load(Ordering::Relaxed) + 1) & ring.mask;
        next == ring.tail.load(Ordering::Acquire)
    }

    /// Advisory emptiness snapshot
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Advisory length snapshot
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of entries the queue can hold at once (`capacity - 1`)
    pub fn usable_capacity(&self) -> usize {
        self.ring.mask
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Pop rights on a ready queue. There is exactly one per queue.
pub struct Consumer<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Consumer<T> {
    /// Remove the oldest entry, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        let ring = &*self.ring;
        let tail = ring.tail.load(Ordering::Relaxed);

        if tail == ring.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: `tail` is inside [tail, head) as observed by the Acquire load,
        // so the producer's write to it happened-before this read.
        let value = unsafe { (*ring.slots[tail].get()).assume_init_read() };
        ring.tail.store((tail + 1) & ring.mask, Ordering::Release);
        Some(value)
    }

    /// Move up to `max` entries into `out`, oldest first.
    ///
    /// `head` is read once at the start, so entries pushed during the drain
    /// may be left for the next call. Returns how many entries were moved.
    pub fn pop_batch(&mut self, out: &mut Vec<T>, max: usize) -> usize {
        let ring = &*self.ring;
        let mut tail = ring.tail.load(Ordering::Relaxed);
        let head = ring.head.load(Ordering::Acquire);

        let available = head.wrapping_sub(tail) & ring.mask;
        let take = available.min(max);
        if take == 0 {
            return 0;
        }

        out.reserve(take);
        for _ in 0..take {
            // SAFETY: every slot visited lies in the [tail, head) snapshot.
            let value = unsafe { (*ring.slots[tail].get()).assume_init_read() };
            out.push(value);
            tail = (tail + 1) & ring.mask;
        }

        ring.tail.store(tail, Ordering::Release);
        take
    }

    /// Advisory emptiness snapshot
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Advisory length snapshot
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
