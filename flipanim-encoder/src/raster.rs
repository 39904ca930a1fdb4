//! Loading filtered rasters into binary frames

use crate::{Error, PixelMode, Result};
use flipanim_core::DecodedFrame;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageReader};
use std::path::Path;

/// Loads one raster file into a binary frame.
///
/// In [`PixelMode::Strict`] the file must have been stored as 1-bit luma;
/// anything else is rejected with [`Error::BitDepth`]. In
/// [`PixelMode::Direct`] any decodable raster is accepted.
///
/// When `expected` is set the raster must match those dimensions exactly.
pub fn load_frame(path: &Path, mode: PixelMode, expected: Option<(u32, u32)>) -> Result<DecodedFrame> {
    let image_err = |source| Error::Image {
        path: path.to_path_buf(),
        source,
    };

    let decoder = ImageReader::open(path)
        .map_err(|e| Error::io(path, e))?
        .with_guessed_format()
        .map_err(|e| Error::io(path, e))?
        .into_decoder()
        .map_err(image_err)?;

    let original = decoder.original_color_type();
    if mode == PixelMode::Strict && original != ExtendedColorType::L1 {
        return Err(Error::BitDepth {
            path: path.to_path_buf(),
            found: format!("{original:?}"),
        });
    }

    let image = DynamicImage::from_decoder(decoder).map_err(image_err)?;
    check_dimensions(path, &image, expected)?;
    frame_from_image(&image)
}

/// Converts a decoded image, deciding black/white from the red channel
pub fn frame_from_image(image: &DynamicImage) -> Result<DecodedFrame> {
    let rgb = image.to_rgb8();
    Ok(DecodedFrame::from_red_channel(
        rgb.width(),
        rgb.height(),
        rgb.as_raw(),
        3,
    )?)
}

fn check_dimensions(path: &Path, image: &DynamicImage, expected: Option<(u32, u32)>) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::validation(format!(
            "{} has zero-sized dimensions",
            path.display()
        )));
    }
    match expected {
        Some((width, height)) if (image.width(), image.height()) != (width, height) => {
            Err(Error::Dimensions {
                path: path.to_path_buf(),
                width,
                height,
                found_width: image.width(),
                found_height: image.height(),
            })
        }
        _ => Ok(()),
    }
}
