//! Scheduler error types

use crate::scheduler::{ConfigError, TaskId};
use std::time::Duration;

/// Errors from spawning a task
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    /// The ready queue stayed full for the whole spawn timeout
    #[error("ready queue full (capacity {capacity}) after waiting {waited:?}")]
    QueueFull {
        /// Slot count of the ready queue
        capacity: usize,
        /// How long the spawn kept retrying
        waited: Duration,
    },
}

/// Errors from registering a timer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The id does not name a live task
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
}

/// Any scheduler error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid configuration
    #[error("invalid scheduler config: {0}")]
    Config(#[from] ConfigError),
    /// Spawn failure
    #[error("spawn failed: {0}")]
    Spawn(#[from] SpawnError),
    /// Timer registration failure
    #[error("schedule failed: {0}")]
    Schedule(#[from] ScheduleError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;

    fn validated(config: SchedulerConfig) -> Result<SchedulerConfig, SchedulerError> {
        config.validate()?;
        Ok(config)
    }

    fn unknown(id: TaskId) -> Result<(), SchedulerError> {
        let lookup: Result<(), ScheduleError> = Err(ScheduleError::UnknownTask(id));
        lookup?;
        Ok(())
    }

    #[test]
    fn test_config_error_converts() {
        let err = validated(SchedulerConfig::default().with_batch_size(0)).unwrap_err();
        assert_eq!(err, SchedulerError::Config(ConfigError::ZeroBatchSize));
        assert_eq!(
            err.to_string(),
            "invalid scheduler config: batch size must be at least 1"
        );
    }

    #[test]
    fn test_spawn_error_converts() {
        let err: SchedulerError = SpawnError::QueueFull {
            capacity: 4,
            waited: Duration::from_millis(3),
        }
        .into();
        assert!(matches!(
            err,
            SchedulerError::Spawn(SpawnError::QueueFull { capacity: 4, .. })
        ));
        assert!(err.to_string().starts_with("spawn failed: ready queue full (capacity 4)"));
    }

    #[test]
    fn test_schedule_error_converts() {
        let err = unknown(TaskId::from_u64(9)).unwrap_err();
        assert_eq!(err, SchedulerError::Schedule(ScheduleError::UnknownTask(TaskId::from_u64(9))));
        assert_eq!(err.to_string(), "schedule failed: unknown task #9");
    }
}
