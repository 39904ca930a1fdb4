//! flipanim Core Library
//!
//! This library provides the data structures and binary/text formats used by
//! the device's asset-pack animation engine: 1-bit packed bitmaps and the
//! `meta.txt` animation descriptor.

pub mod bitmap;
pub mod bubble;
pub mod frame;
pub mod metadata;
pub mod sequence;

pub use bitmap::{BitOrder, FormatVariant, PackedBitmap, Polarity};
pub use bubble::{AlignH, AlignV, BubbleConfig, BubblePlacement, Locale};
pub use frame::DecodedFrame;
pub use metadata::{AnimationMetadata, AnimationSettings};
pub use sequence::FrameSequence;

/// Screen width of the target device in pixels
pub const DEVICE_WIDTH: u32 = 128;

/// Screen height of the target device in pixels
pub const DEVICE_HEIGHT: u32 = 64;

/// Red channel value that marks a pixel as black
pub const BLACK_SENTINEL: u8 = 0;

/// Result type for flipanim-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flipanim-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid frame dimensions {width}x{height}: both axes must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Pixel buffer holds {actual} pixels, expected {expected}")]
    PixelCount { expected: usize, actual: usize },

    #[error("Packed data is {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("Unsupported compression marker: {0:#04x}")]
    UnsupportedCompression(u8),

    #[error("Missing metadata key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for metadata key {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[cfg(feature = "serde")]
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),
}
