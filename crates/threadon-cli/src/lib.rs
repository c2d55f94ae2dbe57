//! threadon command-line front end
//!
//! Load runs and small demos on top of `threadon-engine`. The binary in
//! `main.rs` only parses arguments and dispatches; everything else lives here
//! so it can be driven from tests.

pub mod cli;
pub mod commands;
pub mod output;
pub mod settings;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `warn`, or `debug` with
/// `-v`. Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
