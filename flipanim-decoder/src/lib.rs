//! flipanim Decoder Library
//!
//! This library reads packed bitmaps and finished animation folders back into
//! images for inspection and previews.

pub mod bitmap_decoder;
pub mod pack;

pub use bitmap_decoder::{decode_bitmap, read_bitmap_file};
pub use pack::AnimationPack;

use std::path::PathBuf;

/// Result type for flipanim-decoder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flipanim-decoder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("flipanim core error in {}: {source}", path.display())]
    Core {
        path: PathBuf,
        #[source]
        source: flipanim_core::Error,
    },

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

    #[error("Unknown bitmap extension: {}", .0.display())]
    UnknownExtension(PathBuf),

    #[error("Frame not found: {0}")]
    FrameNotFound(u32),
}

impl Error {
    pub(crate) fn core(path: impl Into<PathBuf>, source: flipanim_core::Error) -> Self {
        Self::Core {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
