//! Fidelity CLI Library
//!
//! Command-line surface for the Fidelity visual regression engine:
//! argument parsing, layered configuration, logging setup and terminal
//! output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, MetricArg, RendererArg};
pub use config::{
    CliConfig, ColorChoice, FileConfig, ResponsiveFileConfig, ResponsiveSettings, RunSettings,
    Verbosity,
};
pub use error::{CliError, CliResult};
pub use logging::{default_filter, init_logging};
pub use output::ProgressReporter;
pub use runner::{CompareRunner, RunOutcome, EXIT_ERROR};
