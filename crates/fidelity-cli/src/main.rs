//! Fidelity CLI: visual regression reports for reproduced websites
//!
//! ## Usage
//!
//! ```bash
//! fidelity --original shots/original --clone shots/clone --output report
//! fidelity --original o --clone c --output r --metric pixel --threshold 90
//! fidelity --original o --clone c --output r --responsive --pages site --breakpoints 375,1280
//! fidelity --config fidelity.yaml -v
//! ```
//!
//! Exit codes: 0 when no page failed, 1 when any page failed, 2 when the
//! run could not complete.

use clap::Parser;
use fidelity_cli::{
    init_logging, Cli, CliConfig, CliResult, CompareRunner, FileConfig, ProgressReporter,
    RunOutcome, RunSettings, EXIT_ERROR,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    let use_color = config.color.should_color();
    console::set_colors_enabled(use_color);
    console::set_colors_enabled_stderr(use_color);
    let reporter = ProgressReporter::new(use_color, config.verbosity.is_quiet());

    if let Err(e) = init_logging(&config) {
        reporter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    match run(&cli, reporter) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            ProgressReporter::new(use_color, false).error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: &Cli, reporter: ProgressReporter) -> CliResult<RunOutcome> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = RunSettings::resolve(cli, &file)?;
    tracing::debug!(?settings, "resolved settings");

    let (report, _) = CompareRunner::new(settings, reporter).run()?;
    Ok(RunOutcome::of(&report))
}
