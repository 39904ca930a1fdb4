//! Binary pixel grid handed to the bitmap packer

use crate::{Error, Result, BLACK_SENTINEL};

/// A rectangular grid of black/white pixels, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    width: u32,
    height: u32,
    /// `true` marks a black (foreground) pixel
    black: Vec<bool>,
}

impl DecodedFrame {
    /// Creates an all-white frame
    pub fn blank(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            black: vec![false; width as usize * height as usize],
        })
    }

    /// Creates a frame from a row-major black mask
    pub fn from_mask(width: u32, height: u32, black: Vec<bool>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if black.len() != expected {
            return Err(Error::PixelCount {
                expected,
                actual: black.len(),
            });
        }
        Ok(Self {
            width,
            height,
            black,
        })
    }

    /// Creates a frame by asking `is_black` about every pixel
    pub fn from_fn(width: u32, height: u32, mut is_black: impl FnMut(u32, u32) -> bool) -> Result<Self> {
        check_dimensions(width, height)?;
        let mut black = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                black.push(is_black(x, y));
            }
        }
        Ok(Self {
            width,
            height,
            black,
        })
    }

    /// Creates a frame from interleaved pixel samples, `channels` bytes per
    /// pixel with red first. A pixel is black iff its red sample equals
    /// [`BLACK_SENTINEL`].
    pub fn from_red_channel(width: u32, height: u32, samples: &[u8], channels: usize) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        let channels = channels.max(1);
        if samples.len() != expected * channels {
            return Err(Error::PixelCount {
                expected,
                actual: samples.len() / channels,
            });
        }
        let black = samples
            .chunks_exact(channels)
            .map(|px| px[0] == BLACK_SENTINEL)
            .collect();
        Ok(Self {
            width,
            height,
            black,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns whether the pixel at (x, y) is black. Out-of-range reads are white.
    pub fn is_black(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.black[(y * self.width + x) as usize]
    }

    /// Iterates over rows of the black mask, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.black.chunks_exact(self.width as usize)
    }

    /// Number of black pixels
    pub fn black_count(&self) -> usize {
        self.black.iter().filter(|b| **b).count()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    Ok(())
}
