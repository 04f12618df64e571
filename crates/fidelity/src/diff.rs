//! Difference overlays and structural heatmaps.

use crate::loader::match_dimensions;
use crate::pixel::channel_diff_sum;
use crate::result::{FidelityError, FidelityResult};
use crate::structural::SimilarityMap;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/// Default summed channel difference above which a pixel counts as changed
pub const DEFAULT_DIFF_THRESHOLD: u32 = 30;

/// Red highlight layer plus its composite over the original
#[derive(Debug, Clone)]
pub struct DiffOverlay {
    /// Transparent layer with a red marker on every changed pixel
    pub highlight: RgbaImage,
    /// Highlight composited over the original
    pub composite: RgbImage,
    /// Number of changed pixels
    pub changed_pixels: usize,
}

impl DiffOverlay {
    /// Pixels of the highlight layer that are not fully transparent
    #[must_use]
    pub fn opaque_pixels(&self) -> usize {
        self.highlight.pixels().filter(|p| p.0[3] > 0).count()
    }
}

/// Marker alpha for a summed channel difference
#[must_use]
pub fn marker_alpha(diff_sum: u32) -> u8 {
    diff_sum.saturating_mul(2).min(255) as u8
}

/// Build the red-highlight overlay of `clone` against `original`.
///
/// A pixel is marked when its summed channel difference exceeds
/// `threshold`; the marker alpha is `min(255, 2 * sum)`. Unmarked pixels
/// are fully transparent, so the composite equals the original there.
#[must_use]
pub fn difference_overlay(original: &RgbImage, clone: &RgbImage, threshold: u32) -> DiffOverlay {
    let clone = match_dimensions(original, clone);
    let (width, height) = original.dimensions();
    let mut highlight = RgbaImage::new(width, height);
    let mut composite = original.clone();
    let mut changed_pixels = 0usize;

    for (x, y, base) in original.enumerate_pixels() {
        let diff = channel_diff_sum(*base, *clone.get_pixel(x, y));
        if diff <= threshold {
            continue;
        }
        changed_pixels += 1;
        let alpha = marker_alpha(diff);
        highlight.put_pixel(x, y, Rgba([255, 0, 0, alpha]));
        composite.put_pixel(x, y, blend_red(*base, alpha));
    }

    DiffOverlay {
        highlight,
        composite,
        changed_pixels,
    }
}

/// Source-over blend of pure red at `alpha` onto `base`
fn blend_red(base: Rgb<u8>, alpha: u8) -> Rgb<u8> {
    let a = u32::from(alpha);
    let mix = |src: u32, dst: u8| ((src * a + u32::from(dst) * (255 - a) + 127) / 255) as u8;
    let Rgb([r, g, b]) = base;
    Rgb([mix(255, r), mix(0, g), mix(0, b)])
}

/// Heatmap colour for a similarity value.
///
/// Red grows as similarity falls, blue grows as it rises, green peaks at 0.5.
#[must_use]
pub fn heatmap_color(value: f32) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);
    let channel = |x: f32| (255.0 * x).round() as u8;
    Rgb([
        channel(1.0 - v),
        channel(2.0 * v.min(1.0 - v)),
        channel(v),
    ])
}

/// Render a similarity map as an RGB heatmap
#[must_use]
pub fn structural_heatmap(map: &SimilarityMap) -> RgbImage {
    let width = map.width();
    let height = map.height();
    let values = map.values();
    RgbImage::from_fn(width, height, |x, y| {
        heatmap_color(values[y as usize * width as usize + x as usize])
    })
}

/// Write `image` as PNG, creating parent directories
pub fn save_png(image: &RgbImage, path: &Path) -> FidelityResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| FidelityError::encode(path, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_identical_images_have_no_markers() {
        let img = solid(40, 30, [12, 34, 56]);
        let overlay = difference_overlay(&img, &img, DEFAULT_DIFF_THRESHOLD);
        assert_eq!(overlay.changed_pixels, 0);
        assert_eq!(overlay.opaque_pixels(), 0);
        assert_eq!(overlay.composite, img);
    }

    #[test]
    fn test_wholly_different_images_mark_every_pixel() {
        let red = solid(40, 30, [255, 0, 0]);
        let blue = solid(40, 30, [0, 0, 255]);
        let overlay = difference_overlay(&red, &blue, DEFAULT_DIFF_THRESHOLD);
        assert_eq!(overlay.changed_pixels, 40 * 30);
        assert_eq!(overlay.opaque_pixels(), 40 * 30);
        assert_eq!(overlay.highlight.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_marked_area_scales_with_image() {
        let small = difference_overlay(
            &solid(10, 10, [0, 0, 0]),
            &solid(10, 10, [255, 255, 255]),
            DEFAULT_DIFF_THRESHOLD,
        );
        let large = difference_overlay(
            &solid(20, 20, [0, 0, 0]),
            &solid(20, 20, [255, 255, 255]),
            DEFAULT_DIFF_THRESHOLD,
        );
        assert_eq!(large.changed_pixels, 4 * small.changed_pixels);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let base = solid(1, 1, [100, 100, 100]);
        let at = solid(1, 1, [110, 110, 110]);
        let above = solid(1, 1, [110, 110, 111]);
        assert_eq!(difference_overlay(&base, &at, 30).changed_pixels, 0);
        assert_eq!(difference_overlay(&base, &above, 30).changed_pixels, 1);
    }

    #[test]
    fn test_marker_alpha_proportional_and_capped() {
        assert_eq!(marker_alpha(31), 62);
        assert_eq!(marker_alpha(127), 254);
        assert_eq!(marker_alpha(765), 255);
    }

    #[test]
    fn test_unchanged_pixels_preserved_in_composite() {
        let original = solid(4, 4, [0, 128, 0]);
        let mut clone = original.clone();
        clone.put_pixel(2, 2, Rgb([255, 255, 255]));
        let overlay = difference_overlay(&original, &clone, DEFAULT_DIFF_THRESHOLD);
        assert_eq!(overlay.changed_pixels, 1);
        assert_eq!(overlay.composite.get_pixel(0, 0), &Rgb([0, 128, 0]));
        let marked = overlay.composite.get_pixel(2, 2);
        assert!(marked[0] > 200);
    }

    #[test]
    fn test_overlay_matches_original_size() {
        let original = solid(100, 100, [255, 0, 0]);
        let small = solid(50, 50, [0, 0, 255]);
        let overlay = difference_overlay(&original, &small, DEFAULT_DIFF_THRESHOLD);
        assert_eq!(overlay.composite.dimensions(), (100, 100));
    }

    #[test]
    fn test_heatmap_gradient_endpoints() {
        assert_eq!(heatmap_color(1.0), Rgb([0, 0, 255]));
        assert_eq!(heatmap_color(0.0), Rgb([255, 0, 0]));
        assert_eq!(heatmap_color(0.5), Rgb([128, 255, 128]));
        assert_eq!(heatmap_color(-3.0), heatmap_color(0.0));
    }

    #[test]
    fn test_heatmap_shape_follows_map() {
        let map = SimilarityMap::new(3, 2, vec![1.0, 0.5, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let heatmap = structural_heatmap(&map);
        assert_eq!(heatmap.dimensions(), (3, 2));
        assert_eq!(heatmap.get_pixel(2, 0), &Rgb([255, 0, 0]));
        assert_eq!(heatmap.get_pixel(0, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_save_png_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diffs/nested/home_diff.png");
        save_png(&solid(2, 2, [1, 1, 1]), &path).unwrap();
        assert!(path.exists());
    }
}
