//! Construction-time scheduler configuration

use serde::Deserialize;
use std::time::Duration;

/// Default ready-queue capacity for a scheduler (2^21 slots)
pub const DEFAULT_SCHEDULER_CAPACITY: usize = 1 << 21;

/// Default number of tasks resumed per loop iteration
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default pause between loop iterations, in microseconds
pub const DEFAULT_POLL_INTERVAL_US: u64 = 50;

/// Default time `spawn` keeps retrying against a full queue, in milliseconds
pub const DEFAULT_SPAWN_TIMEOUT_MS: u64 = 1_000;

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Ready-queue capacity is not a power of two
    #[error("queue capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
    /// Ready-queue capacity leaves no usable slot
    #[error("queue capacity {0} is too small (minimum 2)")]
    CapacityTooSmall(usize),
    /// Batch size of zero would never drain the queue
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// Scheduler tuning knobs.
///
/// Deserializes from a table such as:
///
/// ```toml
/// queue_capacity = 4096
/// batch_size = 64
/// poll_interval_us = 50
/// spawn_timeout_ms = 1000
/// ```
///
/// Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Ready-queue slots; must be a power of two
    pub queue_capacity: usize,
    /// Maximum tasks resumed per loop iteration
    pub batch_size: usize,
    /// Pause between loop iterations, in microseconds
    pub poll_interval_us: u64,
    /// How long `spawn` retries against a full queue, in milliseconds
    pub spawn_timeout_ms: u64,
}

impl SchedulerConfig {
    /// Set the ready-queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the per-iteration batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the pause between loop iterations
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_us = interval.as_micros().min(u64::MAX as u128) as u64;
        self
    }

    /// Set how long `spawn` retries against a full queue
    pub fn with_spawn_timeout(mut self, timeout: Duration) -> Self {
        self.spawn_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    /// Pause between loop iterations
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// How long `spawn` retries against a full queue
    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_millis(self.spawn_timeout_ms)
    }

    /// Check every field against its constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.queue_capacity));
        }
        if !self.queue_capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(self.queue_capacity));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_SCHEDULER_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            spawn_timeout_ms: DEFAULT_SPAWN_TIMEOUT_MS,
        }
    }
}
