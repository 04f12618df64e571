//! Image pair loading and dimension normalisation.
//!
//! The original capture is always the reference frame: when the two sides
//! disagree on dimensions only the clone is resampled, with a Lanczos3
//! filter, to the original's width and height.

use crate::result::{FidelityError, FidelityResult};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use std::borrow::Cow;
use std::path::Path;

/// Filter used whenever a clone is resampled onto the original's frame
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Decoded 3-channel raster, immutable once loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pixels: RgbImage,
}

impl ImageBuffer {
    /// Decode the image at `path`.
    ///
    /// The format is sniffed from the file content, so a mislabelled
    /// extension still decodes. Alpha is discarded.
    pub fn load(path: &Path) -> FidelityResult<Self> {
        let reader = ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|e| FidelityError::decode(path, e))?;
        let decoded = reader.decode().map_err(|e| FidelityError::decode(path, e))?;
        Ok(Self::from_dynamic(decoded))
    }

    /// Decode an in-memory encoded image; `origin` is only used in errors
    pub fn from_encoded(bytes: &[u8], origin: &Path) -> FidelityResult<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| FidelityError::decode(origin, e))?;
        Ok(Self::from_dynamic(decoded))
    }

    /// Wrap an already decoded image
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.to_rgb8(),
        }
    }

    /// Wrap an RGB buffer
    #[must_use]
    pub const fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Total number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// True for zero-area images
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Borrow the raw RGB buffer
    #[must_use]
    pub const fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Return `candidate` in `reference`'s frame, resampling only when the
/// dimensions differ.
#[must_use]
pub fn match_dimensions<'a>(reference: &RgbImage, candidate: &'a RgbImage) -> Cow<'a, RgbImage> {
    if reference.dimensions() == candidate.dimensions() {
        return Cow::Borrowed(candidate);
    }
    let (width, height) = reference.dimensions();
    if width == 0 || height == 0 || candidate.width() == 0 || candidate.height() == 0 {
        return Cow::Owned(RgbImage::new(width, height));
    }
    tracing::debug!(
        from_width = candidate.width(),
        from_height = candidate.height(),
        to_width = width,
        to_height = height,
        "resampling clone to original frame"
    );
    Cow::Owned(imageops::resize(candidate, width, height, RESAMPLE_FILTER))
}

/// One logical page with whichever sides were decoded
#[derive(Debug, Clone)]
pub struct ComparisonPair {
    /// Logical page name (file stem)
    pub name: String,
    /// Original capture, absent when no original exists
    pub original: Option<ImageBuffer>,
    /// Clone capture, absent when no clone exists
    pub clone: Option<ImageBuffer>,
}

impl ComparisonPair {
    /// Pair with both sides present
    #[must_use]
    pub fn matched(name: impl Into<String>, original: ImageBuffer, clone: ImageBuffer) -> Self {
        Self {
            name: name.into(),
            original: Some(original),
            clone: Some(clone),
        }
    }

    /// True when either side is absent
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        self.original.is_none() || self.clone.is_none()
    }

    /// Both buffers with the clone already in the original's frame
    #[must_use]
    pub fn normalized(&self) -> Option<(&RgbImage, Cow<'_, RgbImage>)> {
        let original = self.original.as_ref()?.as_rgb();
        let clone = self.clone.as_ref()?.as_rgb();
        Some((original, match_dimensions(original, clone)))
    }
}
