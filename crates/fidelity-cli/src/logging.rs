//! Log subscriber setup
//!
//! Events go to stderr so stdout carries only the result table. `RUST_LOG`
//! takes precedence over the verbosity flags.

use crate::config::{CliConfig, Verbosity};
use crate::error::{CliError, CliResult};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::new(verbosity.log_directive())
}

/// Install the global subscriber for this process
pub fn init_logging(config: &CliConfig) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(config.verbosity));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.log_json {
        builder.json().try_init().map_err(CliError::logging)
    } else {
        builder
            .with_ansi(config.color.should_color())
            .try_init()
            .map_err(CliError::logging)
    }
}
