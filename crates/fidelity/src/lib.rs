//! Fidelity: visual regression engine for reproduced websites
//!
//! Compares screenshots of an original site against screenshots of its
//! clone and reports, per page, a pixel match percentage, a structural
//! similarity score, per-band scores, difference overlays and heatmaps,
//! plus a pass/fail verdict. Clone documents can also be re-rendered at a
//! list of viewport widths and compared breakpoint by breakpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────────┐    ┌────────────┐
//! │ Pairing      │───►│ Pixel / Structural   │───►│ Diff       │
//! │ Matcher      │    │ scorers + Regions    │    │ Visualizer │
//! └──────────────┘    └──────────────────────┘    └─────┬──────┘
//!                                                       ▼
//! ┌──────────────┐                                ┌────────────┐
//! │ Responsive   │───────────────────────────────►│ Report     │
//! │ Orchestrator │  (Renderer per breakpoint)     │ Aggregator │
//! └──────────────┘                                └────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fidelity::{CompareConfig, Engine, Metric};
//!
//! let config = CompareConfig::default().with_metric(Metric::Pixel);
//! let engine = Engine::new("shots/original", "shots/clone", "report", config)?;
//! let report = engine.run(None)?;
//! println!("{}", report.render_text());
//! # Ok::<(), fidelity::FidelityError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod diff;
#[allow(clippy::missing_errors_doc)]
mod engine;
mod loader;
mod pairing;
#[allow(clippy::cast_precision_loss)]
mod pixel;
mod regions;
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
mod renderer;
#[allow(clippy::missing_errors_doc, clippy::format_push_string)]
mod report;
#[allow(clippy::missing_errors_doc)]
mod responsive;
mod result;
mod strategy;
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
mod structural;

pub use diff::{
    difference_overlay, heatmap_color, marker_alpha, save_png, structural_heatmap, DiffOverlay,
    DEFAULT_DIFF_THRESHOLD,
};
pub use engine::{CompareConfig, Engine, CLONES_DIR, DIFFS_DIR, HEATMAPS_DIR, ORIGINALS_DIR};
pub use loader::{match_dimensions, ComparisonPair, ImageBuffer, RESAMPLE_FILTER};
pub use pairing::{
    is_image_path, match_directories, match_screenshots, page_name, scan_images, MissingSide,
    PagePair, IMAGE_EXTENSIONS,
};
pub use pixel::{
    channel_diff_sum, is_identical, pixel_similarity, pixels_match, DEFAULT_CHANNEL_TOLERANCE,
};
pub use regions::{partition, region_label, region_scores, Band, RegionScore, DEFAULT_REGION_COUNT};
#[cfg(feature = "browser")]
pub use renderer::{CdpConfig, CdpRenderer};
pub use renderer::{
    file_url, locate_chromium, HeadlessChromeRenderer, Renderer, CHROMIUM_PATH_ENV,
    DEFAULT_RENDER_TIMEOUT,
};
pub use report::{
    breakpoint_cell, format_score, verdict, PageResult, PageStatus, Report, RunInfo, Summary,
    TableLines, TableRow, Thresholds, HTML_REPORT, JSON_REPORT,
};
pub use responsive::{
    find_original_capture, parse_breakpoints, scan_documents, BreakpointResult, ResponsiveConfig,
    ResponsiveOrchestrator, DEFAULT_BREAKPOINTS, DEFAULT_VIEWPORT_HEIGHT, RESPONSIVE_DIR,
};
pub use result::{FidelityError, FidelityResult};
#[cfg(feature = "structural")]
pub use strategy::StructuralStrategy;
pub use strategy::{select_strategy, Capabilities, Metric, PixelStrategy, Score, SimilarityStrategy};
#[cfg(feature = "structural")]
pub use structural::structural_similarity;
pub use structural::{SimilarityMap, StructuralScore, SSIM_C1, SSIM_C2, WINDOW_SIZE};
