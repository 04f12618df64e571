//! Terminal output and progress reporting

use console::{style, Style, Term};
use fidelity::{PageStatus, Report};
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar and result output for one run
#[derive(Debug)]
pub struct ProgressReporter {
    out: Term,
    err: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar on stderr
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.err.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Update progress message
    pub fn set_message(&self, message: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_message(message.to_string());
        }
    }

    /// Remove the progress bar
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };

        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    /// Print an error; shown even in quiet mode
    pub fn error(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "Error:".to_string()
        };

        let _ = self.err.write_line(&format!("{prefix} {message}"));
    }

    fn status_style(&self, status: PageStatus) -> Style {
        if !self.use_color {
            return Style::new();
        }
        match status {
            PageStatus::Pass => Style::new().green().bold(),
            PageStatus::Fail => Style::new().red().bold(),
            PageStatus::Missing => Style::new().yellow(),
        }
    }

    /// Print the header, page table and summary line.
    ///
    /// Quiet mode prints only the failing rows and the summary line,
    /// and nothing at all when every page passed.
    pub fn print_report(&self, report: &Report) {
        if self.quiet && !report.has_failures() {
            return;
        }

        let table = report.table();
        if !self.quiet {
            let _ = self.out.write_line(&report.header_line());
            let _ = self.out.write_line("");
            let _ = self.out.write_line(&table.heading);
            let _ = self.out.write_line(&table.rule);
        }
        for row in &table.rows {
            if self.quiet && row.status != PageStatus::Fail {
                continue;
            }
            let styled = self.status_style(row.status).apply_to(&row.status_text);
            let _ = self.out.write_line(&format!("{}{styled}", row.cells));
        }

        if !self.quiet {
            self.print_responsive(report);
            let _ = self.out.write_line("");
        }

        let summary = report.summary_line();
        let summary = if self.use_color && report.has_failures() {
            style(summary).red().bold().to_string()
        } else if self.use_color {
            style(summary).green().bold().to_string()
        } else {
            summary
        };
        let _ = self.out.write_line(&summary);
    }

    fn print_responsive(&self, report: &Report) {
        let lines = report.responsive_lines();
        if lines.is_empty() {
            return;
        }
        let _ = self.out.write_line("");
        let title = if self.use_color {
            style("Responsive").bold().underlined().to_string()
        } else {
            "=== Responsive ===".to_string()
        };
        let _ = self.out.write_line(&title);
        for line in &lines {
            let _ = self.out.write_line(line);
        }
    }

    /// Print where the report landed
    pub fn report_location(&self, path: &std::path::Path) {
        if self.quiet {
            return;
        }
        let _ = self.out.write_line(&format!("Report: {}", path.display()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use fidelity::{Metric, MissingSide, PageResult, RunInfo, Thresholds};
    use std::collections::BTreeMap;

    fn report() -> Report {
        let run = RunInfo::now(Metric::Pixel, Metric::Pixel, Thresholds::default(), 4);
        Report::new(
            run,
            vec![
                PageResult::missing("about-us", MissingSide::NoClone),
                PageResult::errored("home", Metric::Pixel, "Failed to decode home.png"),
            ],
            BTreeMap::new(),
        )
    }

    #[test]
    fn test_quiet_report_prints_failures_only() {
        let reporter = ProgressReporter::new(false, true);
        reporter.print_report(&report());
        let table = report().table();
        assert_eq!(
            table
                .rows
                .iter()
                .filter(|row| row.status == PageStatus::Fail)
                .count(),
            1
        );
    }

    #[test]
    fn test_reporter_defaults() {
        let reporter = ProgressReporter::default();
        assert!(reporter.use_color);
        assert!(!reporter.quiet);
    }
}
