//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Fidelity: compare an original site's screenshots against its clone
#[derive(Parser, Debug)]
#[command(name = "fidelity")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,

    /// Emit log events as JSON lines on stderr
    #[arg(long)]
    pub log_json: bool,

    /// YAML config file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory containing original screenshots
    #[arg(long, value_name = "DIR")]
    pub original: Option<PathBuf>,

    /// Directory containing clone screenshots
    #[arg(long, value_name = "DIR")]
    pub clone: Option<PathBuf>,

    /// Output directory for the report and images
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Pass threshold on the scale of the metric that runs
    /// (default: 95 for pixel, 0.95 for structural)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Comparison metric; structural falls back to pixel when unavailable
    #[arg(short, long)]
    pub metric: Option<MetricArg>,

    /// Number of horizontal regions scored per page
    #[arg(long, value_name = "N")]
    pub regions: Option<usize>,

    /// Per-channel pixel tolerance (0-255)
    #[arg(long)]
    pub tolerance: Option<u8>,

    /// Summed channel difference above which the overlay marks a pixel
    #[arg(long, value_name = "SUM")]
    pub diff_threshold: Option<u32>,

    /// Capture the clone's HTML pages at every breakpoint
    #[arg(long)]
    pub responsive: bool,

    /// Comma-separated breakpoint widths (default: 320,768,1024,1440)
    #[arg(long, value_name = "WIDTHS")]
    pub breakpoints: Option<String>,

    /// Directory containing the clone's HTML pages
    #[arg(long, value_name = "DIR")]
    pub pages: Option<PathBuf>,

    /// Renderer used for responsive captures
    #[arg(long)]
    pub renderer: Option<RendererArg>,

    /// Per-capture renderer timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub render_timeout: Option<u64>,

    /// Disable the browser sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,
}

/// Metric argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricArg {
    /// Tolerance-based pixel match percentage
    Pixel,
    /// Structural similarity (SSIM)
    Structural,
}

impl From<MetricArg> for fidelity::Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Pixel => Self::Pixel,
            MetricArg::Structural => Self::Structural,
        }
    }
}

/// Renderer argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererArg {
    /// Headless Chromium screenshot mode, one process per capture
    #[default]
    Chrome,
    /// Chromium over the DevTools protocol (feature `browser`)
    Cdp,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
