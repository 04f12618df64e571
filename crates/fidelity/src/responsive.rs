//! Responsive capture across viewport widths.
//!
//! Every clone document is rendered once per configured width. The capture
//! is persisted as `responsive/<page>/<page>-<width>.png` and compared with
//! an original capture when one can be found: `<page>-<width>.<ext>` first,
//! then the full-page `<page>.<ext>`. A renderer failure only affects its
//! own breakpoint.

use crate::loader::ImageBuffer;
use crate::pairing::{page_name, scan_images};
use crate::renderer::Renderer;
use crate::result::{FidelityError, FidelityResult};
use crate::strategy::{Metric, SimilarityStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default breakpoint widths
pub const DEFAULT_BREAKPOINTS: [u32; 4] = [320, 768, 1024, 1440];

/// Viewport height used for every capture
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 5000;

/// Directory (under the output directory) holding responsive captures
pub const RESPONSIVE_DIR: &str = "responsive";

/// Responsive capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveConfig {
    /// Viewport widths, captured in this order
    pub widths: Vec<u32>,
    /// Viewport height handed to the renderer
    pub viewport_height: u32,
    /// Metric preference for breakpoint comparisons
    pub metric: Metric,
}

impl Default for ResponsiveConfig {
    fn default() -> Self {
        Self {
            widths: DEFAULT_BREAKPOINTS.to_vec(),
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            metric: Metric::default(),
        }
    }
}

impl ResponsiveConfig {
    /// Set the breakpoint widths
    #[must_use]
    pub fn with_widths(mut self, widths: impl Into<Vec<u32>>) -> Self {
        self.widths = widths.into();
        self
    }

    /// Set the viewport height
    #[must_use]
    pub const fn with_viewport_height(mut self, height: u32) -> Self {
        self.viewport_height = height;
        self
    }

    /// Set the metric preference
    #[must_use]
    pub const fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Reject configurations that cannot be captured
    pub fn validate(&self) -> FidelityResult<()> {
        if self.widths.is_empty() {
            return Err(FidelityError::invalid_argument(
                "at least one breakpoint width is required",
            ));
        }
        if self.widths.contains(&0) {
            return Err(FidelityError::invalid_argument(
                "breakpoint widths must be positive",
            ));
        }
        if self.viewport_height == 0 {
            return Err(FidelityError::invalid_argument(
                "viewport height must be positive",
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated width list such as `320,768,1024`
pub fn parse_breakpoints(list: &str) -> FidelityResult<Vec<u32>> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u32>()
                .ok()
                .filter(|width| *width > 0)
                .ok_or_else(|| {
                    FidelityError::invalid_argument(format!("invalid breakpoint width '{item}'"))
                })
        })
        .collect()
}

/// Outcome for one page at one width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakpointResult {
    /// Viewport width
    pub width: u32,
    /// Clone capture, relative to the output directory
    pub clone_image_path: Option<String>,
    /// Copied original capture, relative to the output directory
    pub original_image_path: Option<String>,
    /// Score on `metric`'s scale, absent without an original
    pub score: Option<f64>,
    /// Metric that produced (or would have produced) `score`
    pub metric: Metric,
    /// Capture or comparison failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BreakpointResult {
    pub(crate) fn empty(width: u32, metric: Metric) -> Self {
        Self {
            width,
            clone_image_path: None,
            original_image_path: None,
            score: None,
            metric,
            error: None,
        }
    }

    /// True when a clone capture exists for this width
    #[must_use]
    pub const fn captured(&self) -> bool {
        self.clone_image_path.is_some()
    }
}

/// HTML documents directly inside `dir`, sorted by path
pub fn scan_documents(dir: &Path) -> FidelityResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FidelityError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
        if path.is_file() && is_html {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

fn find_with_stem<'a>(images: &'a [PathBuf], stem: &str) -> Option<&'a PathBuf> {
    images
        .iter()
        .find(|path| page_name(path).is_some_and(|name| name == stem))
}

/// Original capture for `page` at `width`, falling back to the full page.
///
/// Extensions match case-insensitively, the same way pairing scans them.
#[must_use]
pub fn find_original_capture(original_dir: &Path, page: &str, width: u32) -> Option<PathBuf> {
    let images = scan_images(original_dir).ok()?;
    find_with_stem(&images, &format!("{page}-{width}"))
        .or_else(|| find_with_stem(&images, page))
        .cloned()
}

fn relative(parts: &[&str]) -> String {
    parts.join("/")
}

/// Captures clone documents at every breakpoint and scores them
#[derive(Debug)]
pub struct ResponsiveOrchestrator<'a> {
    config: &'a ResponsiveConfig,
    strategy: &'a dyn SimilarityStrategy,
    original_dir: &'a Path,
    output_dir: &'a Path,
}

impl<'a> ResponsiveOrchestrator<'a> {
    /// Create an orchestrator writing under `output_dir`
    #[must_use]
    pub const fn new(
        config: &'a ResponsiveConfig,
        strategy: &'a dyn SimilarityStrategy,
        original_dir: &'a Path,
        output_dir: &'a Path,
    ) -> Self {
        Self {
            config,
            strategy,
            original_dir,
            output_dir,
        }
    }

    /// Capture every document, keyed by page name
    pub fn run(
        &self,
        renderer: &mut dyn Renderer,
        documents: &[PathBuf],
    ) -> BTreeMap<String, Vec<BreakpointResult>> {
        let mut results = BTreeMap::new();
        for document in documents {
            let Some(page) = crate::pairing::page_name(document) else {
                continue;
            };
            let breakpoints = self.capture_page(renderer, document, &page);
            results.insert(page, breakpoints);
        }
        results
    }

    /// Capture one document at every configured width
    pub fn capture_page(
        &self,
        renderer: &mut dyn Renderer,
        document: &Path,
        page: &str,
    ) -> Vec<BreakpointResult> {
        self.config
            .widths
            .iter()
            .map(|&width| self.capture_breakpoint(renderer, document, page, width))
            .collect()
    }

    fn capture_breakpoint(
        &self,
        renderer: &mut dyn Renderer,
        document: &Path,
        page: &str,
        width: u32,
    ) -> BreakpointResult {
        let mut result = BreakpointResult::empty(width, self.strategy.metric());

        let bytes = match renderer.render(document, width, self.config.viewport_height) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(page, width, error = %e, "breakpoint capture failed");
                result.error = Some(e.to_string());
                return result;
            }
        };

        let clone_name = format!("{page}-{width}.png");
        let clone_path = self.output_dir.join(RESPONSIVE_DIR).join(page).join(&clone_name);
        if let Err(e) = persist(&clone_path, &bytes) {
            tracing::warn!(page, width, error = %e, "could not store breakpoint capture");
            result.error = Some(e.to_string());
            return result;
        }
        result.clone_image_path = Some(relative(&[RESPONSIVE_DIR, page, &clone_name]));
        tracing::info!(page, width, "captured breakpoint");

        let Some(original) = find_original_capture(self.original_dir, page, width) else {
            tracing::debug!(page, width, "no original capture for breakpoint");
            return result;
        };

        let ext = original
            .extension()
            .map_or_else(|| "png".to_string(), |e| e.to_string_lossy().to_lowercase());
        let original_name = format!("{page}-{width}-original.{ext}");
        let original_copy = self
            .output_dir
            .join(RESPONSIVE_DIR)
            .join(page)
            .join(&original_name);
        match std::fs::copy(&original, &original_copy) {
            Ok(_) => {
                result.original_image_path =
                    Some(relative(&[RESPONSIVE_DIR, page, &original_name]));
            }
            Err(e) => tracing::warn!(page, width, error = %e, "could not copy original capture"),
        }

        match score_capture(self.strategy, &original, &bytes, &clone_path) {
            Ok(score) => {
                tracing::debug!(page, width, score, metric = %result.metric, "scored breakpoint");
                result.score = Some(score);
            }
            Err(e) => {
                tracing::warn!(page, width, error = %e, "breakpoint comparison failed");
                result.error = Some(e.to_string());
            }
        }
        result
    }
}

fn persist(path: &Path, bytes: &[u8]) -> FidelityResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

fn score_capture(
    strategy: &dyn SimilarityStrategy,
    original: &Path,
    clone_bytes: &[u8],
    clone_path: &Path,
) -> FidelityResult<f64> {
    let original = ImageBuffer::load(original)?;
    let clone = ImageBuffer::from_encoded(clone_bytes, clone_path)?;
    Ok(strategy.score(original.as_rgb(), clone.as_rgb()).value)
}
