//! Packed bitmap decoding

use crate::{Error, Result};
use flipanim_core::{DecodedFrame, FormatVariant, PackedBitmap, DEVICE_HEIGHT, DEVICE_WIDTH};
use image::{GrayImage, Luma};
use std::path::Path;

/// Decodes packed bitmap bytes into a grayscale image (black 0, white 255).
/// `dimensions` is only consulted for animation frames.
pub fn decode_bitmap(variant: FormatVariant, bytes: Vec<u8>, dimensions: (u32, u32)) -> flipanim_core::Result<GrayImage> {
    let packed = PackedBitmap::parse(variant, bytes, dimensions)?;
    Ok(to_gray(&packed.unpack()?))
}

/// Reads a `.bm` or `.bmx` file. Animation frames are assumed to be screen-sized.
pub fn read_bitmap_file(path: &Path) -> Result<PackedBitmap> {
    let variant = match path.extension().and_then(|ext| ext.to_str()) {
        Some("bm") => FormatVariant::Animation,
        Some("bmx") => FormatVariant::Icon,
        _ => return Err(Error::UnknownExtension(path.to_path_buf())),
    };
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    PackedBitmap::parse(variant, bytes, (DEVICE_WIDTH, DEVICE_HEIGHT)).map_err(|e| Error::core(path, e))
}

/// Renders a binary frame as grayscale, black 0 and white 255
pub fn to_gray(frame: &DecodedFrame) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        if frame.is_black(x, y) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_animation_frame() {
        // Row of 8: only pixel 3 is white
        let image = decode_bitmap(FormatVariant::Animation, vec![0x00, 0b0000_1000], (8, 1)).unwrap();
        let pixels: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert_eq!(pixels, vec![0, 0, 0, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_icon() {
        let bytes = vec![3, 0, 0, 0, 1, 0, 0, 0, 0b1010_0000];
        let image = decode_bitmap(FormatVariant::Icon, bytes, (0, 0)).unwrap();
        assert_eq!(image.dimensions(), (3, 1));
        let pixels: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        assert_eq!(pixels, vec![0, 255, 0]);
    }

    #[test]
    fn test_read_bitmap_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let frame = DecodedFrame::from_fn(DEVICE_WIDTH, DEVICE_HEIGHT, |x, y| x == y).unwrap();
        let packed = PackedBitmap::pack(&frame, FormatVariant::Animation).unwrap();
        let path = dir.path().join("frame_0.bm");
        std::fs::write(&path, packed.as_bytes()).unwrap();

        let read = read_bitmap_file(&path).unwrap();
        assert_eq!(read.unpack().unwrap(), frame);

        let err = read_bitmap_file(&dir.path().join("frame_0.png")).unwrap_err();
        assert!(matches!(err, Error::UnknownExtension(_)));
    }

    #[test]
    fn test_truncated_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame_1.bm");
        std::fs::write(&path, [0u8; 10]).unwrap();

        let err = read_bitmap_file(&path).unwrap_err();
        assert!(err.to_string().contains("frame_1.bm"));
    }
}
