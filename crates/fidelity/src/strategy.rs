//! Similarity strategies and capability-checked selection.
//!
//! Callers ask for a metric by preference and receive a boxed
//! [`SimilarityStrategy`]. When structural similarity is not available the
//! pixel strategy is handed out instead, and every [`Score`] records the
//! metric that actually ran.

use crate::pixel::{pixel_similarity, DEFAULT_CHANNEL_TOLERANCE};
use crate::structural::SimilarityMap;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Tolerance-based pixel match percentage (0-100)
    Pixel,
    /// Structural similarity (0-1)
    #[default]
    Structural,
}

impl Metric {
    /// Lowercase name used in reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pixel => "pixel",
            Self::Structural => "structural",
        }
    }

    /// Default pass threshold on this metric's scale
    #[must_use]
    pub const fn default_threshold(self) -> f64 {
        match self {
            Self::Pixel => 95.0,
            Self::Structural => 0.95,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which optional comparison capabilities this process can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Structural similarity is available
    pub structural: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

impl Capabilities {
    /// Detect what was compiled in
    #[must_use]
    pub const fn detect() -> Self {
        Self {
            structural: cfg!(feature = "structural"),
        }
    }

    /// Only the pixel metric, regardless of build features
    #[must_use]
    pub const fn pixel_only() -> Self {
        Self { structural: false }
    }

    /// Metric that will run when `preferred` is requested
    #[must_use]
    pub const fn resolve(&self, preferred: Metric) -> Metric {
        match preferred {
            Metric::Structural if self.structural => Metric::Structural,
            _ => Metric::Pixel,
        }
    }
}

/// Outcome of one strategy invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    /// Score on the metric's own scale
    pub value: f64,
    /// Metric that produced `value`
    pub metric: Metric,
    /// Per-pixel map, only produced by the structural strategy
    pub map: Option<SimilarityMap>,
}

/// A way of scoring a clone against its original
pub trait SimilarityStrategy: fmt::Debug {
    /// Metric this strategy reports
    fn metric(&self) -> Metric;

    /// Score `clone` against `original`, resampling the clone when needed
    fn score(&self, original: &RgbImage, clone: &RgbImage) -> Score;
}

/// Pixel tolerance strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelStrategy {
    tolerance: u8,
}

impl Default for PixelStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_TOLERANCE)
    }
}

impl PixelStrategy {
    /// Create with a per-channel tolerance
    #[must_use]
    pub const fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

impl SimilarityStrategy for PixelStrategy {
    fn metric(&self) -> Metric {
        Metric::Pixel
    }

    fn score(&self, original: &RgbImage, clone: &RgbImage) -> Score {
        Score {
            value: pixel_similarity(original, clone, self.tolerance),
            metric: Metric::Pixel,
            map: None,
        }
    }
}

/// Structural similarity strategy
#[cfg(feature = "structural")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuralStrategy;

#[cfg(feature = "structural")]
impl SimilarityStrategy for StructuralStrategy {
    fn metric(&self) -> Metric {
        Metric::Structural
    }

    fn score(&self, original: &RgbImage, clone: &RgbImage) -> Score {
        let result = crate::structural::structural_similarity(original, clone);
        Score {
            value: result.score,
            metric: Metric::Structural,
            map: Some(result.map),
        }
    }
}

/// Strategy for `preferred`, downgraded to pixel when `capabilities` lack it
#[must_use]
pub fn select_strategy(
    preferred: Metric,
    capabilities: &Capabilities,
    tolerance: u8,
) -> Box<dyn SimilarityStrategy> {
    match capabilities.resolve(preferred) {
        #[cfg(feature = "structural")]
        Metric::Structural => Box::new(StructuralStrategy),
        _ => Box::new(PixelStrategy::new(tolerance)),
    }
}
