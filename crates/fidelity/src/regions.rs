//! Horizontal band partitioning.
//!
//! An image of height `H` split into `N` bands gives the first `N - 1`
//! bands a height of `floor(H / N)`; the last band takes that height plus the
//! remainder `H mod N`. Bands tile the image exactly, top to bottom.

use crate::loader::match_dimensions;
use crate::result::{FidelityError, FidelityResult};
use crate::strategy::{Metric, SimilarityStrategy};
use image::imageops;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Default number of bands
pub const DEFAULT_REGION_COUNT: usize = 4;

/// One horizontal strip of the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// Zero-based band index, top first
    pub index: usize,
    /// First row of the band
    pub y: u32,
    /// Number of rows
    pub height: u32,
}

/// Score of one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionScore {
    /// Display label, e.g. `Region 1 (top)`
    pub label: String,
    /// Score on `metric`'s scale
    pub score: f64,
    /// Metric that produced `score`
    pub metric: Metric,
}

/// Split `height` rows into `count` bands
pub fn partition(height: u32, count: usize) -> FidelityResult<Vec<Band>> {
    if count == 0 {
        return Err(FidelityError::invalid_argument(
            "region count must be at least 1",
        ));
    }
    let count_u32 = u32::try_from(count)
        .map_err(|_| FidelityError::invalid_argument(format!("region count {count} too large")))?;
    let band_height = height / count_u32;

    Ok((0..count_u32)
        .map(|i| {
            let y = i * band_height;
            let rows = if i + 1 == count_u32 {
                height - y
            } else {
                band_height
            };
            Band {
                index: i as usize,
                y,
                height: rows,
            }
        })
        .collect())
}

/// Label for band `index` out of `count`
#[must_use]
pub fn region_label(index: usize, count: usize) -> String {
    let number = index + 1;
    match (index == 0, index + 1 == count) {
        (true, true) => format!("Region {number} (top/bottom)"),
        (true, false) => format!("Region {number} (top)"),
        (false, true) => format!("Region {number} (bottom)"),
        (false, false) => format!("Region {number}"),
    }
}

/// Score each of `count` bands of the pair with `strategy`.
///
/// The clone is brought into the original's frame first, so both crops
/// cover the same rows.
pub fn region_scores(
    original: &RgbImage,
    clone: &RgbImage,
    count: usize,
    strategy: &dyn SimilarityStrategy,
) -> FidelityResult<Vec<RegionScore>> {
    let clone = match_dimensions(original, clone);
    let width = original.width();

    partition(original.height(), count)?
        .into_iter()
        .map(|band| {
            let original_band = imageops::crop_imm(original, 0, band.y, width, band.height).to_image();
            let clone_band = imageops::crop_imm(&*clone, 0, band.y, width, band.height).to_image();
            let score = strategy.score(&original_band, &clone_band);
            Ok(RegionScore {
                label: region_label(band.index, count),
                score: score.value,
                metric: score.metric,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::strategy::{select_strategy, Capabilities, PixelStrategy};
    use image::Rgb;
    use proptest::prelude::*;

    fn red_with_blue_top(rows: u32) -> (RgbImage, RgbImage) {
        let red = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let mut changed = red.clone();
        for y in 0..rows {
            for x in 0..100 {
                changed.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        (red, changed)
    }

    #[test]
    fn test_partition_even() {
        let bands = partition(100, 4).unwrap();
        assert_eq!(bands.len(), 4);
        assert!(bands.iter().all(|b| b.height == 25));
        assert_eq!(bands[3].y, 75);
    }

    #[test]
    fn test_last_band_absorbs_remainder() {
        let bands = partition(103, 4).unwrap();
        let heights: Vec<u32> = bands.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![25, 25, 25, 28]);
    }

    #[test]
    fn test_more_bands_than_rows() {
        let bands = partition(2, 4).unwrap();
        let heights: Vec<u32> = bands.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![0, 0, 0, 2]);
    }

    #[test]
    fn test_zero_count_rejected() {
        assert!(partition(100, 0).is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(region_label(0, 4), "Region 1 (top)");
        assert_eq!(region_label(1, 4), "Region 2");
        assert_eq!(region_label(3, 4), "Region 4 (bottom)");
        assert_eq!(region_label(0, 1), "Region 1 (top/bottom)");
    }

    #[test]
    fn test_identical_images_all_regions_100() {
        let (red, _) = red_with_blue_top(0);
        let scores = region_scores(&red, &red, 4, &PixelStrategy::default()).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|r| r.score == 100.0 && r.metric == Metric::Pixel));
    }

    #[test]
    fn test_top_band_difference_localised() {
        let (red, changed) = red_with_blue_top(5);
        let scores = region_scores(&red, &changed, 4, &PixelStrategy::default()).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores[0].score < scores[3].score);
        assert!((scores[0].score - 80.0).abs() < 1e-9);
        assert!(scores[0].label.contains("top"));
        assert!(scores[3].label.contains("bottom"));
    }

    #[test]
    fn test_regions_handle_different_sizes() {
        let original = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let small = RgbImage::from_pixel(50, 50, Rgb([255, 0, 0]));
        let scores = region_scores(&original, &small, 4, &PixelStrategy::default()).unwrap();
        assert_eq!(scores.len(), 4);
    }

    #[test]
    fn test_fallback_metric_recorded_per_region() {
        let (red, changed) = red_with_blue_top(5);
        let strategy = select_strategy(Metric::Structural, &Capabilities::pixel_only(), 10);
        let scores = region_scores(&red, &changed, 3, strategy.as_ref()).unwrap();
        assert!(scores.iter().all(|r| r.metric == Metric::Pixel));
    }

    #[cfg(feature = "structural")]
    #[test]
    fn test_structural_regions_identical() {
        let (red, _) = red_with_blue_top(0);
        let strategy = select_strategy(Metric::Structural, &Capabilities::detect(), 10);
        let scores = region_scores(&red, &red, 3, strategy.as_ref()).unwrap();
        for region in scores {
            assert_eq!(region.metric, Metric::Structural);
            assert!((region.score - 1.0).abs() < 0.001);
        }
    }

    proptest! {
        #[test]
        fn prop_bands_tile_image(height in 0u32..5000, count in 1usize..64) {
            let bands = partition(height, count).unwrap();
            prop_assert_eq!(bands.len(), count);
            let mut next = 0u32;
            for band in &bands {
                prop_assert_eq!(band.y, next);
                next += band.height;
            }
            prop_assert_eq!(next, height);
            let expected = height / count as u32;
            for band in &bands[..count - 1] {
                prop_assert_eq!(band.height, expected);
            }
        }
    }
}
