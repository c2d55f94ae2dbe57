//! Subcommand implementations.
//!
//! Each command has a `run` that drives a scheduler and returns a report, and
//! an `execute` that prints that report.

pub mod bench;
pub mod ping_pong;
pub mod timers;
