//! Structural similarity (SSIM).
//!
//! Each RGB channel is compared with a sliding 7x7 uniform window (clamped
//! at the image border). Per-window means, variances and the covariance are
//! combined with the usual stabilising constants `C1 = (0.01 * 255)^2` and
//! `C2 = (0.03 * 255)^2`. The per-pixel map is the mean over the three
//! channels and the scalar score is the mean of that map.
//!
//! Window moments are integer sums kept in `u64`, streamed one row at a time
//! so memory stays proportional to the image width.

use serde::{Deserialize, Serialize};

/// Side length of the comparison window
pub const WINDOW_SIZE: usize = 7;

/// `(K1 * L)^2` with `K1 = 0.01`, `L = 255`
pub const SSIM_C1: f64 = 6.5025;
/// `(K2 * L)^2` with `K2 = 0.03`, `L = 255`
pub const SSIM_C2: f64 = 58.5225;

/// Per-pixel similarity values in `[0, 1]`, row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl SimilarityMap {
    /// Build a map; `values.len()` must equal `width * height`
    #[must_use]
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        (values.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            values,
        })
    }

    /// Map width
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Similarity at `(x, y)`
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Row-major values
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mean similarity, 0.0 for an empty map
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().map(|&v| f64::from(v)).sum::<f64>() / self.values.len() as f64
    }
}

/// Structural score with its map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralScore {
    /// Mean SSIM in `[0, 1]`
    pub score: f64,
    /// Per-pixel similarity, same shape as the original
    pub map: SimilarityMap,
}

#[cfg(feature = "structural")]
pub use algorithm::structural_similarity;

#[cfg(feature = "structural")]
mod algorithm {
    use super::{SimilarityMap, StructuralScore, SSIM_C1, SSIM_C2, WINDOW_SIZE};
    use crate::loader::match_dimensions;
    use image::RgbImage;

    const RADIUS: usize = WINDOW_SIZE / 2;
    const CHANNELS: usize = 3;

    #[derive(Debug, Clone, Copy, Default)]
    struct Moments {
        a: u64,
        b: u64,
        aa: u64,
        bb: u64,
        ab: u64,
    }

    impl Moments {
        fn of(a: u8, b: u8) -> Self {
            let (a, b) = (u64::from(a), u64::from(b));
            Self {
                a,
                b,
                aa: a * a,
                bb: b * b,
                ab: a * b,
            }
        }

        fn add(&mut self, other: Self) {
            self.a += other.a;
            self.b += other.b;
            self.aa += other.aa;
            self.bb += other.bb;
            self.ab += other.ab;
        }

        fn sub(&mut self, other: Self) {
            self.a -= other.a;
            self.b -= other.b;
            self.aa -= other.aa;
            self.bb -= other.bb;
            self.ab -= other.ab;
        }

        fn between(upper: Self, lower: Self) -> Self {
            let mut out = upper;
            out.sub(lower);
            out
        }

        fn ssim(self, n: f64) -> f64 {
            let mu_a = self.a as f64 / n;
            let mu_b = self.b as f64 / n;
            let var_a = self.aa as f64 / n - mu_a * mu_a;
            let var_b = self.bb as f64 / n - mu_b * mu_b;
            let cov = self.ab as f64 / n - mu_a * mu_b;

            let numerator = (2.0 * mu_a * mu_b + SSIM_C1) * (2.0 * cov + SSIM_C2);
            let denominator = (mu_a * mu_a + mu_b * mu_b + SSIM_C1) * (var_a + var_b + SSIM_C2);
            numerator / denominator
        }
    }

    /// Structural similarity of `clone` against `original`.
    ///
    /// `clone` is resampled into `original`'s frame when the dimensions
    /// differ. A zero-area original scores 0.0 with an empty map.
    #[must_use]
    pub fn structural_similarity(original: &RgbImage, clone: &RgbImage) -> StructuralScore {
        let (width, height) = original.dimensions();
        let (w, h) = (width as usize, height as usize);
        if w == 0 || h == 0 {
            return StructuralScore {
                score: 0.0,
                map: SimilarityMap {
                    width,
                    height,
                    values: Vec::new(),
                },
            };
        }
        let clone = match_dimensions(original, clone);

        let mut totals = vec![0.0f64; w * h];
        for channel in 0..CHANNELS {
            accumulate_channel(original.as_raw(), clone.as_raw(), w, h, channel, &mut totals);
        }

        let values: Vec<f32> = totals
            .iter()
            .map(|&sum| (sum / CHANNELS as f64).clamp(0.0, 1.0) as f32)
            .collect();
        let score = totals.iter().sum::<f64>() / (CHANNELS * w * h) as f64;

        StructuralScore {
            score: score.clamp(0.0, 1.0),
            map: SimilarityMap {
                width,
                height,
                values,
            },
        }
    }

    fn accumulate_channel(
        a: &[u8],
        b: &[u8],
        w: usize,
        h: usize,
        channel: usize,
        totals: &mut [f64],
    ) {
        let row_moments = |row: usize, x: usize| {
            let idx = (row * w + x) * CHANNELS + channel;
            Moments::of(a[idx], b[idx])
        };

        // Column sums over the rows currently inside the window.
        let mut columns = vec![Moments::default(); w];
        let mut prefix = vec![Moments::default(); w + 1];
        let (mut top, mut bottom) = (0usize, 0usize);

        for y in 0..h {
            let want_top = y.saturating_sub(RADIUS);
            let want_bottom = (y + RADIUS + 1).min(h);
            while bottom < want_bottom {
                for (x, column) in columns.iter_mut().enumerate() {
                    column.add(row_moments(bottom, x));
                }
                bottom += 1;
            }
            while top < want_top {
                for (x, column) in columns.iter_mut().enumerate() {
                    column.sub(row_moments(top, x));
                }
                top += 1;
            }

            for x in 0..w {
                let mut next = prefix[x];
                next.add(columns[x]);
                prefix[x + 1] = next;
            }

            let rows = bottom - top;
            for x in 0..w {
                let x0 = x.saturating_sub(RADIUS);
                let x1 = (x + RADIUS + 1).min(w);
                let window = Moments::between(prefix[x1], prefix[x0]);
                totals[y * w + x] += window.ssim((rows * (x1 - x0)) as f64);
            }
        }
    }
}

#[cfg(all(test, feature = "structural"))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_identical_images_score_one() {
        let img = gradient(64, 48);
        let result = structural_similarity(&img, &img.clone());
        assert!((result.score - 1.0).abs() < 0.001);
        assert!(result.map.values().iter().all(|&v| (v - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_identical_solid_images_score_one() {
        let img = solid(100, 100, [255, 0, 0]);
        let result = structural_similarity(&img, &img.clone());
        assert!((result.score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_red_vs_blue_below_half() {
        let red = solid(100, 100, [255, 0, 0]);
        let blue = solid(100, 100, [0, 0, 255]);
        assert!(structural_similarity(&red, &blue).score < 0.5);
    }

    #[test]
    fn test_map_has_original_shape() {
        let a = gradient(30, 20);
        let b = gradient(15, 10);
        let result = structural_similarity(&a, &b);
        assert_eq!(result.map.width(), 30);
        assert_eq!(result.map.height(), 20);
        assert_eq!(result.map.values().len(), 600);
    }

    #[test]
    fn test_resized_same_color_scores_high() {
        let original = solid(100, 100, [255, 0, 0]);
        let small = solid(50, 50, [255, 0, 0]);
        assert!(structural_similarity(&original, &small).score > 0.9);
    }

    #[test]
    fn test_top_band_change_localised_in_map() {
        let red = solid(100, 100, [255, 0, 0]);
        let mut changed = red.clone();
        for y in 0..5 {
            for x in 0..100 {
                changed.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        let result = structural_similarity(&red, &changed);
        assert!(result.score > 0.8 && result.score < 1.0);
        assert!(result.map.get(50, 0).unwrap() < 0.5);
        assert!((result.map.get(50, 99).unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_image_smaller_than_window() {
        let a = gradient(3, 2);
        let result = structural_similarity(&a, &a.clone());
        assert!((result.score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_image_scores_zero() {
        let empty = RgbImage::new(0, 0);
        let result = structural_similarity(&empty, &empty);
        assert_eq!(result.score, 0.0);
        assert!(result.map.values().is_empty());
    }

    #[test]
    fn test_similarity_map_accessors() {
        let map = SimilarityMap::new(2, 1, vec![0.25, 0.75]).unwrap();
        assert_eq!(map.get(1, 0), Some(0.75));
        assert_eq!(map.get(2, 0), None);
        assert!((map.mean() - 0.5).abs() < 1e-9);
        assert!(SimilarityMap::new(2, 2, vec![0.0]).is_none());
    }
}
