//! CLI configuration
//!
//! Settings come from three layers: flags, then the `--config` YAML file,
//! then built-in defaults. The first layer that sets a value wins.

use crate::commands::{Cli, RendererArg};
use crate::error::{CliError, CliResult};
use fidelity::{
    parse_breakpoints, CompareConfig, Metric, ResponsiveConfig, DEFAULT_RENDER_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - per-page log events
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From the `-v` count and `-q` flag
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter directive for this level
    #[must_use]
    pub const fn log_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// Terminal behaviour of one invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// JSON log lines
    pub log_json: bool,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set JSON logging
    #[must_use]
    pub const fn with_log_json(mut self, log_json: bool) -> Self {
        self.log_json = log_json;
        self
    }

    /// From parsed arguments
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self::new()
            .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
            .with_color(cli.color.clone().into())
            .with_log_json(cli.log_json)
    }
}

/// Contents of a `--config` YAML file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Original screenshot directory
    pub original: Option<PathBuf>,
    /// Clone screenshot directory
    pub clone: Option<PathBuf>,
    /// Output directory
    pub output: Option<PathBuf>,
    /// Pass threshold on the effective metric's scale
    pub threshold: Option<f64>,
    /// Metric preference
    pub metric: Option<Metric>,
    /// Region count
    pub regions: Option<usize>,
    /// Per-channel tolerance
    pub tolerance: Option<u8>,
    /// Overlay threshold
    pub diff_threshold: Option<u32>,
    /// Responsive capture settings
    pub responsive: Option<ResponsiveFileConfig>,
}

/// `responsive:` section of the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResponsiveFileConfig {
    /// Enable responsive capture
    pub enabled: bool,
    /// Breakpoint widths
    pub breakpoints: Option<Vec<u32>>,
    /// Clone HTML directory
    pub pages: Option<PathBuf>,
    /// Viewport height
    pub viewport_height: Option<u32>,
    /// Renderer implementation
    pub renderer: Option<RendererArg>,
    /// Per-capture timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Disable the browser sandbox
    pub no_sandbox: bool,
}

impl FileConfig {
    /// Read and parse a YAML config file
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    /// Parse YAML text
    pub fn parse(text: &str) -> CliResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(text)?)
    }
}

/// Responsive settings after layering
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsiveSettings {
    /// Clone HTML directory
    pub pages: PathBuf,
    /// Breakpoints, viewport height and metric
    pub config: ResponsiveConfig,
    /// Renderer implementation
    pub renderer: RendererArg,
    /// Per-capture timeout
    pub timeout: Duration,
    /// Run the browser without its sandbox
    pub no_sandbox: bool,
}

/// Fully resolved settings of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Original screenshot directory
    pub original: PathBuf,
    /// Clone screenshot directory
    pub clone: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Comparison settings
    pub compare: CompareConfig,
    /// Responsive capture, when enabled
    pub responsive: Option<ResponsiveSettings>,
}

fn required(flag: Option<&PathBuf>, file: Option<&PathBuf>, name: &str) -> CliResult<PathBuf> {
    flag.or(file).cloned().ok_or_else(|| {
        CliError::invalid_argument(format!("--{name} is required (flag or config file)"))
    })
}

impl RunSettings {
    /// Layer `cli` over `file` over defaults
    pub fn resolve(cli: &Cli, file: &FileConfig) -> CliResult<Self> {
        let original = required(cli.original.as_ref(), file.original.as_ref(), "original")?;
        let clone = required(cli.clone.as_ref(), file.clone.as_ref(), "clone")?;
        let output = required(cli.output.as_ref(), file.output.as_ref(), "output")?;

        let metric = cli.metric.map(Metric::from).or(file.metric).unwrap_or_default();
        let defaults = CompareConfig::default();
        let mut compare = defaults
            .clone()
            .with_metric(metric)
            .with_region_count(cli.regions.or(file.regions).unwrap_or(defaults.region_count))
            .with_tolerance(cli.tolerance.or(file.tolerance).unwrap_or(defaults.tolerance))
            .with_diff_threshold(
                cli.diff_threshold
                    .or(file.diff_threshold)
                    .unwrap_or(defaults.diff_threshold),
            );
        if let Some(threshold) = cli.threshold.or(file.threshold) {
            compare = compare.with_threshold(threshold);
        }
        compare.validate()?;

        let responsive = Self::resolve_responsive(cli, file.responsive.as_ref(), metric)?;

        Ok(Self {
            original,
            clone,
            output,
            compare,
            responsive,
        })
    }

    fn resolve_responsive(
        cli: &Cli,
        file: Option<&ResponsiveFileConfig>,
        metric: Metric,
    ) -> CliResult<Option<ResponsiveSettings>> {
        let section = file.cloned().unwrap_or_default();
        if !(cli.responsive || section.enabled) {
            return Ok(None);
        }

        let pages = cli.pages.clone().or(section.pages).ok_or_else(|| {
            CliError::invalid_argument("--responsive needs --pages <DIR> with the clone's HTML")
        })?;

        let mut config = ResponsiveConfig::default().with_metric(metric);
        if let Some(list) = &cli.breakpoints {
            config = config.with_widths(parse_breakpoints(list)?);
        } else if let Some(widths) = section.breakpoints {
            config = config.with_widths(widths);
        }
        if let Some(height) = section.viewport_height {
            config = config.with_viewport_height(height);
        }
        config.validate()?;

        let timeout = cli
            .render_timeout
            .or(section.timeout_secs)
            .map_or(DEFAULT_RENDER_TIMEOUT, Duration::from_secs);

        Ok(Some(ResponsiveSettings {
            pages,
            config,
            renderer: cli.renderer.or(section.renderer).unwrap_or_default(),
            timeout,
            no_sandbox: cli.no_sandbox || section.no_sandbox,
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fidelity").chain(args.iter().copied())).unwrap()
    }

    const DIRS: [&str; 6] = ["--original", "o", "--clone", "c", "--output", "out"];

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(3, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
        }

        #[test]
        fn test_log_directive() {
            assert_eq!(Verbosity::Quiet.log_directive(), "error");
            assert_eq!(Verbosity::Normal.log_directive(), "warn");
            assert_eq!(Verbosity::Verbose.log_directive(), "info");
            assert_eq!(Verbosity::Debug.log_directive(), "debug");
        }

        #[test]
        fn test_is_quiet_and_verbose() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod file_config_tests {
        use super::*;

        #[test]
        fn test_parse_full_file() {
            let config = FileConfig::parse(
                r"
original: shots/original
clone: shots/clone
output: report
threshold: 0.9
metric: structural
regions: 6
responsive:
  enabled: true
  breakpoints: [375, 1280]
  pages: site
  renderer: cdp
",
            )
            .unwrap();
            assert_eq!(config.metric, Some(Metric::Structural));
            assert_eq!(config.regions, Some(6));
            let responsive = config.responsive.unwrap();
            assert!(responsive.enabled);
            assert_eq!(responsive.breakpoints, Some(vec![375, 1280]));
            assert_eq!(responsive.renderer, Some(RendererArg::Cdp));
        }

        #[test]
        fn test_empty_file_is_default() {
            assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
        }

        #[test]
        fn test_unknown_key_rejected() {
            assert!(FileConfig::parse("thresold: 90").is_err());
        }

        #[test]
        fn test_load_missing_file() {
            let err = FileConfig::load(Path::new("/nonexistent/fidelity.yaml")).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let settings = RunSettings::resolve(&cli(&DIRS), &FileConfig::default()).unwrap();
            assert_eq!(settings.original, PathBuf::from("o"));
            assert_eq!(settings.compare.region_count, 4);
            assert_eq!(settings.compare.tolerance, 10);
            assert_eq!(settings.compare.diff_threshold, 30);
            assert!(settings.responsive.is_none());
        }

        #[test]
        fn test_flag_overrides_file() {
            let file = FileConfig {
                regions: Some(8),
                tolerance: Some(3),
                ..FileConfig::default()
            };
            let mut args = DIRS.to_vec();
            args.extend(["--regions", "2"]);
            let settings = RunSettings::resolve(&cli(&args), &file).unwrap();
            assert_eq!(settings.compare.region_count, 2);
            assert_eq!(settings.compare.tolerance, 3);
        }

        #[test]
        fn test_directories_from_file() {
            let file = FileConfig {
                original: Some(PathBuf::from("fo")),
                clone: Some(PathBuf::from("fc")),
                output: Some(PathBuf::from("fout")),
                ..FileConfig::default()
            };
            let settings = RunSettings::resolve(&cli(&["--clone", "flag-clone"]), &file).unwrap();
            assert_eq!(settings.original, PathBuf::from("fo"));
            assert_eq!(settings.clone, PathBuf::from("flag-clone"));
        }

        #[test]
        fn test_missing_directory_flag() {
            let err = RunSettings::resolve(&cli(&["--original", "o"]), &FileConfig::default())
                .unwrap_err();
            assert!(err.to_string().contains("--clone"));
        }

        #[test]
        fn test_pixel_threshold_flag() {
            let mut args = DIRS.to_vec();
            args.extend(["--metric", "pixel", "--threshold", "90"]);
            let settings = RunSettings::resolve(&cli(&args), &FileConfig::default()).unwrap();
            assert_eq!(settings.compare.thresholds.pixel, 90.0);
        }

        #[test]
        fn test_out_of_range_threshold_rejected() {
            let mut args = DIRS.to_vec();
            args.extend(["--metric", "pixel", "--threshold", "190"]);
            assert!(RunSettings::resolve(&cli(&args), &FileConfig::default()).is_err());
        }

        #[test]
        fn test_zero_regions_rejected() {
            let mut args = DIRS.to_vec();
            args.extend(["--regions", "0"]);
            assert!(RunSettings::resolve(&cli(&args), &FileConfig::default()).is_err());
        }

        #[test]
        fn test_responsive_needs_pages() {
            let mut args = DIRS.to_vec();
            args.push("--responsive");
            let err = RunSettings::resolve(&cli(&args), &FileConfig::default()).unwrap_err();
            assert!(err.to_string().contains("--pages"));
        }

        #[test]
        fn test_responsive_breakpoints() {
            let mut args = DIRS.to_vec();
            args.extend(["--responsive", "--pages", "site", "--breakpoints", "375, 1280"]);
            let settings = RunSettings::resolve(&cli(&args), &FileConfig::default()).unwrap();
            let responsive = settings.responsive.unwrap();
            assert_eq!(responsive.config.widths, vec![375, 1280]);
            assert_eq!(responsive.renderer, RendererArg::Chrome);
            assert_eq!(responsive.timeout, DEFAULT_RENDER_TIMEOUT);
        }

        #[test]
        fn test_bad_breakpoints_rejected() {
            let mut args = DIRS.to_vec();
            args.extend(["--responsive", "--pages", "site", "--breakpoints", "wide"]);
            assert!(RunSettings::resolve(&cli(&args), &FileConfig::default()).is_err());
        }

        #[test]
        fn test_responsive_enabled_from_file() {
            let file = FileConfig {
                responsive: Some(ResponsiveFileConfig {
                    enabled: true,
                    pages: Some(PathBuf::from("site")),
                    viewport_height: Some(2000),
                    timeout_secs: Some(5),
                    ..ResponsiveFileConfig::default()
                }),
                ..FileConfig::default()
            };
            let settings = RunSettings::resolve(&cli(&DIRS), &file).unwrap();
            let responsive = settings.responsive.unwrap();
            assert_eq!(responsive.config.viewport_height, 2000);
            assert_eq!(responsive.timeout, Duration::from_secs(5));
            assert_eq!(responsive.config.widths, vec![320, 768, 1024, 1440]);
        }
    }
}
