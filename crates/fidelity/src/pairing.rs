//! Pair original and clone screenshots by logical page name.
//!
//! The logical name is the file stem. Matching never opens the files.

use crate::result::{FidelityError, FidelityResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Raster extensions picked up from input directories (case-insensitive)
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Why a pair lacks one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSide {
    /// Only the original exists
    NoClone,
    /// Only the clone exists
    NoOriginal,
}

impl MissingSide {
    /// Human-readable reason
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::NoClone => "no clone",
            Self::NoOriginal => "no original",
        }
    }
}

/// Paths of one logical page; at least one side is present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePair {
    /// Logical page name
    pub name: String,
    /// Original screenshot
    pub original: Option<PathBuf>,
    /// Clone screenshot
    pub clone: Option<PathBuf>,
}

impl PagePair {
    /// Which side is missing, if any
    #[must_use]
    pub const fn missing(&self) -> Option<MissingSide> {
        match (&self.original, &self.clone) {
            (Some(_), None) => Some(MissingSide::NoClone),
            (None, Some(_)) => Some(MissingSide::NoOriginal),
            _ => None,
        }
    }
}

/// Logical page name of `path`
#[must_use]
pub fn page_name(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Whether `path` has one of the accepted raster extensions
#[must_use]
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// List raster files directly inside `dir`, sorted by path
pub fn scan_images(dir: &Path) -> FidelityResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FidelityError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn by_name(paths: &[PathBuf]) -> BTreeMap<String, PathBuf> {
    let mut named = BTreeMap::new();
    for path in paths {
        if let Some(name) = page_name(path) {
            // Same stem with several extensions: keep the first by sorted path.
            named.entry(name).or_insert_with(|| path.clone());
        }
    }
    named
}

/// Pair `originals` with `clones` by file stem.
///
/// Output order: every original-side name alphabetically (matched or
/// missing its clone), then clone-only names alphabetically.
#[must_use]
pub fn match_screenshots(originals: &[PathBuf], clones: &[PathBuf]) -> Vec<PagePair> {
    let originals = by_name(originals);
    let mut clones = by_name(clones);

    let mut pairs: Vec<PagePair> = originals
        .into_iter()
        .map(|(name, original)| {
            let clone = clones.remove(&name);
            PagePair {
                name,
                original: Some(original),
                clone,
            }
        })
        .collect();

    pairs.extend(clones.into_iter().map(|(name, clone)| PagePair {
        name,
        original: None,
        clone: Some(clone),
    }));

    pairs
}

/// Scan both directories and pair their screenshots
pub fn match_directories(original_dir: &Path, clone_dir: &Path) -> FidelityResult<Vec<PagePair>> {
    let originals = scan_images(original_dir)?;
    let clones = scan_images(clone_dir)?;
    Ok(match_screenshots(&originals, &clones))
}
