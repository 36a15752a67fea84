//! Tracing subscriber setup
//!
//! JSON events at `info` by default, human-readable events at `debug` with
//! `--verbose`. `KMSTOOL_LOG` takes precedence over both levels.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "KMSTOOL_LOG";

const CRATES: [&str; 3] = ["kmstool", "kmstool_core", "kmstool_cloud"];

/// Install the global subscriber; a second call is a no-op
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter(verbose));

    let result = if verbose {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

fn default_filter(verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    let directives = CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(format!("warn,{directives}"))
}
