//! threadon CLI
//!
//! Demos and load runs for the cooperative scheduler in `threadon-engine`.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use threadon_cli::cli::{Cli, Commands};
use threadon_cli::commands::{bench, ping_pong, timers};
use threadon_cli::output::{format_error, resolve_color_choice, StyledOutput};
use threadon_cli::settings;

fn main() -> ExitCode {
    let cli = Cli::parse();
    threadon_cli::init_tracing(cli.global.verbose);

    let mut out = StyledOutput::new(resolve_color_choice(cli.global.color.as_deref()));
    match run(cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.stderr_error(&format_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let config = settings::resolve(&cli.global)?;

    match cli.command {
        Commands::Bench {
            tasks,
            timeout_secs,
        } => bench::execute(out, config, tasks, Duration::from_secs(timeout_secs)),

        Commands::Timers {
            count,
            max_delay_ms,
            seed,
        } => timers::execute(out, config, count, Duration::from_millis(max_delay_ms), seed),

        Commands::PingPong { rounds } => ping_pong::execute(out, config, rounds),
    }
}
