//! Run orchestration for the CLI

use crate::commands::RendererArg;
use crate::config::{ResponsiveSettings, RunSettings};
use crate::error::CliResult;
use crate::output::ProgressReporter;
use fidelity::{Engine, FidelityResult, HeadlessChromeRenderer, Renderer, Report};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Exit status of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No page failed (missing pages allowed)
    Clean,
    /// At least one page failed
    Failures,
}

impl RunOutcome {
    /// From a finished report
    #[must_use]
    pub const fn of(report: &Report) -> Self {
        if report.has_failures() {
            Self::Failures
        } else {
            Self::Clean
        }
    }

    /// Process exit code
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Clean => 0,
            Self::Failures => 1,
        }
    }
}

/// Exit code for a run that could not complete
pub const EXIT_ERROR: u8 = 2;

/// Executes one comparison run
#[derive(Debug)]
pub struct CompareRunner {
    settings: RunSettings,
    reporter: ProgressReporter,
}

impl CompareRunner {
    /// Create a runner
    #[must_use]
    pub const fn new(settings: RunSettings, reporter: ProgressReporter) -> Self {
        Self { settings, reporter }
    }

    fn engine(&self) -> CliResult<Engine> {
        let mut engine = Engine::new(
            &self.settings.original,
            &self.settings.clone,
            &self.settings.output,
            self.settings.compare.clone(),
        )?;
        if engine.effective_metric() != self.settings.compare.metric {
            self.reporter
                .warning("structural similarity unavailable; comparing by pixel tolerance");
        }
        if let Some(responsive) = &self.settings.responsive {
            engine = engine.with_responsive(&responsive.pages, responsive.config.clone())?;
        }
        Ok(engine)
    }

    /// Compare every page, capture breakpoints and write the report
    pub fn run(&mut self) -> CliResult<(Report, PathBuf)> {
        let engine = self.engine()?;
        let pairs = engine.pairs()?;
        std::fs::create_dir_all(engine.output_dir())?;

        self.reporter
            .start_progress(pairs.len() as u64, "comparing pages");
        let mut pages = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            self.reporter.set_message(&pair.name);
            pages.push(engine.compare_pair(pair));
            self.reporter.increment(1);
        }
        self.reporter.finish();

        let responsive = match &self.settings.responsive {
            Some(settings) => self.capture(&engine, settings)?,
            None => BTreeMap::new(),
        };

        let report = engine.assemble(pages, responsive);
        let path = report.write(engine.output_dir())?;
        self.reporter.print_report(&report);
        self.reporter.report_location(&path);
        Ok((report, path))
    }

    fn capture(
        &self,
        engine: &Engine,
        settings: &ResponsiveSettings,
    ) -> CliResult<BTreeMap<String, Vec<fidelity::BreakpointResult>>> {
        let Some(mut renderer) = self.renderer(settings)? else {
            return Ok(BTreeMap::new());
        };
        self.reporter.info(&format!(
            "capturing breakpoints {:?}",
            settings.config.widths
        ));
        Ok(engine.capture_responsive(renderer.as_mut()))
    }

    /// Build the configured renderer; `None` when no browser can be started
    fn renderer(&self, settings: &ResponsiveSettings) -> CliResult<Option<Box<dyn Renderer>>> {
        let built = match settings.renderer {
            RendererArg::Chrome => Self::chrome_renderer(settings),
            RendererArg::Cdp => Self::cdp_renderer(settings)?,
        };
        Ok(self.launched(built))
    }

    /// A renderer that failed to start only skips responsive capture
    fn launched(&self, built: FidelityResult<Box<dyn Renderer>>) -> Option<Box<dyn Renderer>> {
        match built {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                tracing::warn!(error = %e, "responsive capture skipped");
                self.reporter
                    .warning(&format!("{e}; skipping responsive capture"));
                None
            }
        }
    }

    fn chrome_renderer(settings: &ResponsiveSettings) -> FidelityResult<Box<dyn Renderer>> {
        let mut renderer = HeadlessChromeRenderer::from_env()?.with_timeout(settings.timeout);
        if settings.no_sandbox {
            renderer = renderer.with_no_sandbox();
        }
        tracing::debug!(executable = %renderer.executable().display(), "using headless renderer");
        Ok(Box::new(renderer))
    }

    /// Outer error: the renderer cannot exist in this build.
    /// Inner error: the browser failed to launch.
    #[cfg(feature = "browser")]
    #[allow(clippy::unnecessary_wraps)]
    fn cdp_renderer(
        settings: &ResponsiveSettings,
    ) -> CliResult<FidelityResult<Box<dyn Renderer>>> {
        let config = fidelity::CdpConfig {
            chromium_path: std::env::var_os(fidelity::CHROMIUM_PATH_ENV).map(PathBuf::from),
            sandbox: !settings.no_sandbox,
            timeout: settings.timeout,
        };
        Ok(fidelity::CdpRenderer::launch(config).map(|r| Box::new(r) as Box<dyn Renderer>))
    }

    #[cfg(not(feature = "browser"))]
    fn cdp_renderer(
        _settings: &ResponsiveSettings,
    ) -> CliResult<FidelityResult<Box<dyn Renderer>>> {
        Err(crate::error::CliError::config(
            "the cdp renderer requires building with the `browser` feature",
        ))
    }
}
