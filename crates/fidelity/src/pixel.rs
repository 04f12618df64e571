//! Tolerance-based pixel similarity.
//!
//! A pixel matches when every channel differs by at most the tolerance
//! (10 out of 255 by default). The score is the matching share in percent.

use crate::loader::match_dimensions;
use image::{Rgb, RgbImage};

/// Default per-channel tolerance (0-255)
pub const DEFAULT_CHANNEL_TOLERANCE: u8 = 10;

/// Whether two pixels match within `tolerance` on every channel
#[must_use]
pub fn pixels_match(a: Rgb<u8>, b: Rgb<u8>, tolerance: u8) -> bool {
    a.0.iter()
        .zip(b.0.iter())
        .all(|(&x, &y)| x.abs_diff(y) <= tolerance)
}

/// Sum of absolute RGB channel differences (0-765)
#[must_use]
pub fn channel_diff_sum(a: Rgb<u8>, b: Rgb<u8>) -> u32 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(&x, &y)| u32::from(x.abs_diff(y)))
        .sum()
}

/// Percentage (0.0-100.0) of pixels of `clone` matching `original`.
///
/// `clone` is resampled to `original`'s frame first when needed. A zero-area
/// original scores 0.0.
#[must_use]
pub fn pixel_similarity(original: &RgbImage, clone: &RgbImage, tolerance: u8) -> f64 {
    let total = original.width() as usize * original.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let clone = match_dimensions(original, clone);

    let matching = original
        .pixels()
        .zip(clone.pixels())
        .filter(|(a, b)| pixels_match(**a, **b, tolerance))
        .count();

    (matching as f64 / total as f64) * 100.0
}

/// Whether the two images are identical pixel for pixel (no tolerance)
#[must_use]
pub fn is_identical(original: &RgbImage, clone: &RgbImage) -> bool {
    original.dimensions() == clone.dimensions() && original.as_raw() == clone.as_raw()
}
