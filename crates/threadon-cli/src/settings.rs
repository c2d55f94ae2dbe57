//! Scheduler configuration from a TOML file plus command-line overrides

use crate::cli::GlobalArgs;
use anyhow::Context as _;
use std::fs;
use std::path::Path;
use std::time::Duration;
use threadon_engine::SchedulerConfig;

/// Build the scheduler config for this invocation.
///
/// Starts from `--config` (or the defaults), applies any override flags, then
/// validates the result.
pub fn resolve(global: &GlobalArgs) -> anyhow::Result<SchedulerConfig> {
    let mut config = match &global.config {
        Some(path) => read_config(path)?,
        None => SchedulerConfig::default(),
    };

    if let Some(capacity) = global.capacity {
        config = config.with_queue_capacity(capacity);
    }
    if let Some(batch_size) = global.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(poll_us) = global.poll_us {
        config = config.with_poll_interval(Duration::from_micros(poll_us));
    }

    config.validate().context("invalid scheduler configuration")?;
    Ok(config)
}

/// Read and parse a scheduler config file
pub fn read_config(path: &Path) -> anyhow::Result<SchedulerConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse scheduler config from TOML text. Missing keys take their defaults.
pub fn parse_config(text: &str) -> Result<SchedulerConfig, toml::de::Error> {
    toml::from_str(text)
}
