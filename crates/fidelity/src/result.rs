//! Result and error types for Fidelity.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Fidelity operations
pub type FidelityResult<T> = Result<T, FidelityError>;

/// Errors that can occur in Fidelity
#[derive(Debug, Error)]
pub enum FidelityError {
    /// Image could not be read or decoded
    #[error("Failed to decode {}: {message}", path.display())]
    ImageDecode {
        /// Image path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Image could not be encoded or written
    #[error("Failed to encode {}: {message}", path.display())]
    ImageEncode {
        /// Destination path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Neither input directory contained a screenshot
    #[error("No screenshots found in {} or {}", original_dir.display(), clone_dir.display())]
    NoScreenshots {
        /// Original screenshot directory
        original_dir: PathBuf,
        /// Clone screenshot directory
        clone_dir: PathBuf,
    },

    /// Input directory does not exist
    #[error("Directory not found: {}", path.display())]
    DirectoryNotFound {
        /// Missing directory
        path: PathBuf,
    },

    /// Renderer failed to produce a capture
    #[error("Render of {} at {width}px failed: {message}", document.display())]
    Render {
        /// Document being rendered
        document: PathBuf,
        /// Viewport width
        width: u32,
        /// Error message
        message: String,
    },

    /// Renderer did not finish in time
    #[error("Render of {} at {width}px timed out after {ms}ms", document.display())]
    RenderTimeout {
        /// Document being rendered
        document: PathBuf,
        /// Viewport width
        width: u32,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// No renderer could be started
    #[error("Renderer unavailable: {message}")]
    RendererUnavailable {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FidelityError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a decode error for `path`
    #[must_use]
    pub fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ImageDecode {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an encode error for `path`
    #[must_use]
    pub fn encode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ImageEncode {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
