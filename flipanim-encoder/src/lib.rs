//! flipanim Encoder Library
//!
//! This library turns image sources into device asset packs: it drives the
//! external image filter, loads the thresholded rasters, packs them into
//! `.bm`/`.bmx` bitmaps and writes the animation descriptor.

pub mod filter;
pub mod progress_tracker;
pub mod raster;
pub mod session;
pub mod source;
pub mod tracer;
pub mod writer;

pub use filter::{FilterOptions, ImageFilter, MagickFilter, Threshold};
pub use session::{ConversionSession, SessionConfig, SessionReport};
pub use source::{collect_sources, output_dir_name};
pub use tracer::{PotraceTracer, Tracer};

use std::path::PathBuf;

/// Result type for flipanim-encoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flipanim-encoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("flipanim core error: {0}")]
    Core(#[from] flipanim_core::Error),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error on {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{} is not a 1-bit image (found {found})", path.display())]
    BitDepth { path: PathBuf, found: String },

    #[error("{} is {found_width}x{found_height}, expected {width}x{height}", path.display())]
    Dimensions {
        path: PathBuf,
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("No frames were produced from {}", .0.display())]
    NoFrames(PathBuf),

    #[error("Required tool `{tool}` was not found on PATH ({hint})")]
    Dependency { tool: &'static str, hint: &'static str },

    #[error("`{tool}` failed on {}: {message}", path.display())]
    Tool {
        tool: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the error is a per-frame bit-depth mismatch that a
    /// [`FrameErrorPolicy::Skip`] run may step over
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::BitDepth { .. })
    }
}

/// How source pixels become black/white decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelMode {
    /// Sources must already be 1-bit thresholded rasters
    Strict,
    /// Any decoded raster; a pixel is black iff its red channel is the sentinel
    #[default]
    Direct,
}

/// What to do when a single frame fails the strict bit-depth check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameErrorPolicy {
    /// Log a warning, drop the frame and keep going
    Skip,
    /// Abort the whole batch
    #[default]
    Abort,
}
