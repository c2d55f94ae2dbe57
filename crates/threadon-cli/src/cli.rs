//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "threadon")]
#[command(about = "Cooperative task scheduler demos and load runs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every subcommand
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Scheduler config file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Colorize output
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    pub color: Option<String>,

    /// Log scheduler internals at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ready queue capacity (power of two)
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Maximum ready ids drained per worker iteration
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Worker sleep between iterations, in microseconds
    #[arg(long, global = true)]
    pub poll_us: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Spawn many single-shot routines and time how long they take to finish
    Bench {
        /// Number of routines to spawn
        #[arg(long, default_value_t = 1_000_000)]
        tasks: usize,

        /// Give up if the routines have not finished after this many seconds
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },

    /// Schedule routines with random delays and report the order they fire in
    Timers {
        /// Number of routines to schedule
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Upper bound for each random delay
        #[arg(long, default_value_t = 100)]
        max_delay_ms: u64,

        /// Seed for a reproducible delay sequence
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Two routines that take turns by yielding back to the scheduler
    PingPong {
        /// Hits per player
        #[arg(long, default_value_t = 5)]
        rounds: usize,
    },
}
