//! Comparison engine.
//!
//! One [`Engine`] run pairs the two screenshot directories, compares every
//! page in pairing order, optionally captures responsive breakpoints and
//! writes the report. Pages are processed one at a time; each page's
//! buffers are dropped before the next page is decoded.

use crate::diff::{difference_overlay, save_png, structural_heatmap, DEFAULT_DIFF_THRESHOLD};
use crate::loader::{ComparisonPair, ImageBuffer};
use crate::pairing::{match_directories, MissingSide, PagePair};
use crate::pixel::{is_identical, pixel_similarity, DEFAULT_CHANNEL_TOLERANCE};
use crate::regions::{region_scores, DEFAULT_REGION_COUNT};
use crate::renderer::Renderer;
use crate::report::{verdict, PageResult, Report, RunInfo, Thresholds};
use crate::responsive::{scan_documents, BreakpointResult, ResponsiveConfig, ResponsiveOrchestrator};
use crate::result::{FidelityError, FidelityResult};
use crate::strategy::{select_strategy, Capabilities, Metric, SimilarityStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Copied original screenshots
pub const ORIGINALS_DIR: &str = "originals";
/// Copied clone screenshots
pub const CLONES_DIR: &str = "clones";
/// Difference overlays
pub const DIFFS_DIR: &str = "diffs";
/// Structural heatmaps
pub const HEATMAPS_DIR: &str = "heatmaps";

/// Per-page comparison settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Preferred metric
    pub metric: Metric,
    /// Pass thresholds
    pub thresholds: Thresholds,
    /// Number of horizontal bands
    pub region_count: usize,
    /// Per-channel pixel tolerance
    pub tolerance: u8,
    /// Summed channel difference marking a pixel as changed
    pub diff_threshold: u32,
    /// Write difference overlays
    pub generate_diffs: bool,
    /// Write structural heatmaps
    pub generate_heatmaps: bool,
    /// Available comparison capabilities
    #[serde(skip)]
    pub capabilities: Capabilities,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            thresholds: Thresholds::default(),
            region_count: DEFAULT_REGION_COUNT,
            tolerance: DEFAULT_CHANNEL_TOLERANCE,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            generate_diffs: true,
            generate_heatmaps: true,
            capabilities: Capabilities::detect(),
        }
    }
}

impl CompareConfig {
    /// Set the preferred metric
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set both thresholds
    #[must_use]
    pub const fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the threshold of the metric that will actually run.
    ///
    /// Resolved against the current metric and capabilities, so call it
    /// after [`Self::with_metric`] and [`Self::with_capabilities`].
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.thresholds = self.thresholds.with(self.effective_metric(), threshold);
        self
    }

    /// Set the region count
    #[must_use]
    pub const fn with_region_count(mut self, count: usize) -> Self {
        self.region_count = count;
        self
    }

    /// Set the per-channel tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the overlay threshold
    #[must_use]
    pub const fn with_diff_threshold(mut self, threshold: u32) -> Self {
        self.diff_threshold = threshold;
        self
    }

    /// Enable or disable difference overlays
    #[must_use]
    pub const fn with_diffs(mut self, enabled: bool) -> Self {
        self.generate_diffs = enabled;
        self
    }

    /// Enable or disable structural heatmaps
    #[must_use]
    pub const fn with_heatmaps(mut self, enabled: bool) -> Self {
        self.generate_heatmaps = enabled;
        self
    }

    /// Replace the detected capabilities
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Metric that will run for the preferred one
    #[must_use]
    pub const fn effective_metric(&self) -> Metric {
        self.capabilities.resolve(self.metric)
    }

    /// Reject unusable settings
    pub fn validate(&self) -> FidelityResult<()> {
        if self.region_count == 0 {
            return Err(FidelityError::invalid_argument(
                "region count must be at least 1",
            ));
        }
        let Thresholds { pixel, structural } = self.thresholds;
        if !(0.0..=100.0).contains(&pixel) {
            return Err(FidelityError::invalid_argument(format!(
                "pixel threshold {pixel} is outside 0-100"
            )));
        }
        if !(0.0..=1.0).contains(&structural) {
            return Err(FidelityError::invalid_argument(format!(
                "structural threshold {structural} is outside 0-1"
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ResponsiveRun {
    pages_dir: PathBuf,
    config: ResponsiveConfig,
    strategy: Box<dyn SimilarityStrategy>,
}

/// Sequences one comparison run
#[derive(Debug)]
pub struct Engine {
    original_dir: PathBuf,
    clone_dir: PathBuf,
    output_dir: PathBuf,
    config: CompareConfig,
    strategy: Box<dyn SimilarityStrategy>,
    responsive: Option<ResponsiveRun>,
}

impl Engine {
    /// Create an engine; the strategy is resolved here, once
    pub fn new(
        original_dir: impl Into<PathBuf>,
        clone_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        config: CompareConfig,
    ) -> FidelityResult<Self> {
        config.validate()?;
        let strategy = select_strategy(config.metric, &config.capabilities, config.tolerance);
        if strategy.metric() != config.metric {
            tracing::warn!(
                requested = %config.metric,
                effective = %strategy.metric(),
                "structural similarity unavailable, falling back to pixel comparison"
            );
        }
        Ok(Self {
            original_dir: original_dir.into(),
            clone_dir: clone_dir.into(),
            output_dir: output_dir.into(),
            config,
            strategy,
            responsive: None,
        })
    }

    /// Enable responsive capture of the HTML documents in `pages_dir`.
    ///
    /// The directory must exist now, so a bad path fails before any page
    /// is compared.
    pub fn with_responsive(
        mut self,
        pages_dir: impl Into<PathBuf>,
        config: ResponsiveConfig,
    ) -> FidelityResult<Self> {
        config.validate()?;
        let pages_dir = pages_dir.into();
        if !pages_dir.is_dir() {
            return Err(FidelityError::DirectoryNotFound { path: pages_dir });
        }
        let strategy = select_strategy(
            config.metric,
            &self.config.capabilities,
            self.config.tolerance,
        );
        self.responsive = Some(ResponsiveRun {
            pages_dir,
            config,
            strategy,
        });
        Ok(self)
    }

    /// Comparison settings
    #[must_use]
    pub const fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Metric that actually runs
    #[must_use]
    pub fn effective_metric(&self) -> Metric {
        self.strategy.metric()
    }

    /// Threshold on the effective metric's scale
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.config.thresholds.for_metric(self.effective_metric())
    }

    /// True when responsive capture is configured
    #[must_use]
    pub const fn responsive_enabled(&self) -> bool {
        self.responsive.is_some()
    }

    /// Pair the input directories; no screenshots at all is an error
    pub fn pairs(&self) -> FidelityResult<Vec<PagePair>> {
        let pairs = match_directories(&self.original_dir, &self.clone_dir)?;
        if pairs.is_empty() {
            return Err(FidelityError::NoScreenshots {
                original_dir: self.original_dir.clone(),
                clone_dir: self.clone_dir.clone(),
            });
        }
        Ok(pairs)
    }

    /// Compare one pair; failures are folded into the result
    #[must_use]
    pub fn compare_pair(&self, pair: &PagePair) -> PageResult {
        let (original, clone) = match (&pair.original, &pair.clone) {
            (Some(original), Some(clone)) => (original, clone),
            (Some(_), None) => return Self::missing(&pair.name, MissingSide::NoClone),
            (None, _) => return Self::missing(&pair.name, MissingSide::NoOriginal),
        };

        match self.compare_files(&pair.name, original, clone) {
            Ok(result) => {
                tracing::info!(
                    page = %result.name,
                    status = result.status.label(),
                    pixel = result.pixel_similarity,
                    structural = result.structural_score,
                    "compared page"
                );
                result
            }
            Err(e) => {
                tracing::warn!(page = %pair.name, error = %e, "page could not be compared");
                PageResult::errored(&pair.name, self.effective_metric(), e.to_string())
            }
        }
    }

    fn missing(name: &str, side: MissingSide) -> PageResult {
        tracing::info!(page = name, reason = side.reason(), "page missing a side");
        PageResult::missing(name, side)
    }

    fn compare_files(
        &self,
        name: &str,
        original_path: &Path,
        clone_path: &Path,
    ) -> FidelityResult<PageResult> {
        let pair = ComparisonPair::matched(
            name,
            ImageBuffer::load(original_path)?,
            ImageBuffer::load(clone_path)?,
        );
        let (original, clone) = pair
            .normalized()
            .ok_or_else(|| FidelityError::invalid_argument("pair lacks a side"))?;

        let metric = self.effective_metric();
        let pixel = pixel_similarity(original, &clone, self.config.tolerance);
        let structural =
            (metric == Metric::Structural).then(|| self.strategy.score(original, &clone));
        let primary = structural.as_ref().map_or(pixel, |score| score.value);
        let status = verdict(primary, self.threshold());
        tracing::debug!(page = name, pixel, primary, metric = %metric, "scored page");

        let regions = region_scores(
            original,
            &clone,
            self.config.region_count,
            self.strategy.as_ref(),
        )?;

        let mut result = PageResult {
            name: name.to_string(),
            status,
            pixel_similarity: Some(pixel),
            structural_score: structural.as_ref().map(|score| score.value),
            metric: Some(metric),
            regions,
            original_image_path: self.copy_source(original_path, ORIGINALS_DIR),
            clone_image_path: self.copy_source(clone_path, CLONES_DIR),
            diff_image_path: None,
            heatmap_path: None,
            detail: None,
        };

        if is_identical(original, &clone) {
            return Ok(result);
        }

        if self.config.generate_diffs {
            let overlay = difference_overlay(original, &clone, self.config.diff_threshold);
            tracing::debug!(page = name, changed = overlay.changed_pixels, "built difference overlay");
            let relative = format!("{DIFFS_DIR}/{name}_diff.png");
            result.diff_image_path = self.save_artifact(&overlay.composite, relative);
        }

        if self.config.generate_heatmaps {
            if let Some(map) = structural.as_ref().and_then(|score| score.map.as_ref()) {
                let relative = format!("{HEATMAPS_DIR}/{name}_heatmap.png");
                result.heatmap_path = self.save_artifact(&structural_heatmap(map), relative);
            }
        }

        Ok(result)
    }

    fn save_artifact(&self, image: &image::RgbImage, relative: String) -> Option<String> {
        match save_png(image, &self.output_dir.join(&relative)) {
            Ok(()) => Some(relative),
            Err(e) => {
                tracing::warn!(path = %relative, error = %e, "could not write artifact");
                None
            }
        }
    }

    fn copy_source(&self, source: &Path, dir: &str) -> Option<String> {
        let file_name = source.file_name()?.to_string_lossy().into_owned();
        let target_dir = self.output_dir.join(dir);
        let copied = std::fs::create_dir_all(&target_dir)
            .and_then(|()| std::fs::copy(source, target_dir.join(&file_name)));
        match copied {
            Ok(_) => Some(format!("{dir}/{file_name}")),
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "could not copy screenshot");
                None
            }
        }
    }

    /// Capture the configured breakpoints; empty when responsive is off
    /// or the documents cannot be listed
    #[must_use]
    pub fn capture_responsive(
        &self,
        renderer: &mut dyn Renderer,
    ) -> BTreeMap<String, Vec<BreakpointResult>> {
        let Some(run) = &self.responsive else {
            return BTreeMap::new();
        };
        let documents = match scan_documents(&run.pages_dir) {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!(
                    pages = %run.pages_dir.display(),
                    error = %e,
                    "responsive capture skipped"
                );
                return BTreeMap::new();
            }
        };
        tracing::info!(
            documents = documents.len(),
            widths = ?run.config.widths,
            "capturing responsive breakpoints"
        );
        let orchestrator = ResponsiveOrchestrator::new(
            &run.config,
            run.strategy.as_ref(),
            &self.original_dir,
            &self.output_dir,
        );
        orchestrator.run(renderer, &documents)
    }

    /// Assemble the report for `pages` and `responsive`
    #[must_use]
    pub fn assemble(
        &self,
        pages: Vec<PageResult>,
        responsive: BTreeMap<String, Vec<BreakpointResult>>,
    ) -> Report {
        let run = RunInfo::now(
            self.config.metric,
            self.effective_metric(),
            self.config.thresholds,
            self.config.region_count,
        );
        Report::new(run, pages, responsive)
    }

    /// Run every step and write `index.html` and `results.json`
    pub fn run(&self, renderer: Option<&mut dyn Renderer>) -> FidelityResult<Report> {
        let pairs = self.pairs()?;
        std::fs::create_dir_all(&self.output_dir)?;
        tracing::info!(
            pages = pairs.len(),
            metric = %self.effective_metric(),
            threshold = self.threshold(),
            "comparing pages"
        );

        let pages: Vec<PageResult> = pairs.iter().map(|pair| self.compare_pair(pair)).collect();

        let responsive = match renderer {
            Some(renderer) => self.capture_responsive(renderer),
            None => {
                if self.responsive_enabled() {
                    tracing::warn!("responsive capture requested without a renderer");
                }
                BTreeMap::new()
            }
        };

        let report = self.assemble(pages, responsive);
        report.write(&self.output_dir)?;
        Ok(report)
    }
}
