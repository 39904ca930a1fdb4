//! Packed 1-bit bitmap formats
//!
//! Two on-device consumers read two different layouts:
//!
//! * the animation engine reads `.bm` frames: a single `0x00` marker byte
//!   followed by LSB-first rows where a set bit is a white pixel;
//! * the icon renderer reads `.bmx` icons: little-endian `u32` width and height
//!   followed by MSB-first rows where a set bit is a black pixel.
//!
//! Rows never share a byte; each row is padded to a whole number of bytes.

use crate::{DecodedFrame, Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

/// Marker byte for uncompressed animation frames
const UNCOMPRESSED: u8 = 0x00;

/// Order in which pixels fill a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// First pixel of the byte lands in bit 0
    LsbFirst,
    /// First pixel of the byte lands in bit 7
    MsbFirst,
}

/// Meaning of a set bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Set bit is white, cleared bit is black
    BlackIsZero,
    /// Set bit is black
    BlackIsOne,
}

/// Output format of the bitmap packer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatVariant {
    /// Animation frame (`.bm`): 1-byte header, dimensions implied by the pack
    Animation,
    /// Icon (`.bmx`): 8-byte header carrying width and height
    Icon,
}

impl FormatVariant {
    /// Size of the format header in bytes
    pub fn header_size(self) -> usize {
        match self {
            Self::Animation => 1,
            Self::Icon => 8,
        }
    }

    pub fn bit_order(self) -> BitOrder {
        match self {
            Self::Animation => BitOrder::LsbFirst,
            Self::Icon => BitOrder::MsbFirst,
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Self::Animation => Polarity::BlackIsZero,
            Self::Icon => Polarity::BlackIsOne,
        }
    }

    /// File extension used for this variant
    pub fn extension(self) -> &'static str {
        match self {
            Self::Animation => "bm",
            Self::Icon => "bmx",
        }
    }

    /// Bytes needed for one row of `width` pixels
    pub fn row_bytes(self, width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    /// Total serialized size for a `width` x `height` frame
    pub fn packed_len(self, width: u32, height: u32) -> usize {
        self.header_size() + height as usize * self.row_bytes(width)
    }

    fn bit_for(self, black: bool) -> bool {
        match self.polarity() {
            Polarity::BlackIsZero => !black,
            Polarity::BlackIsOne => black,
        }
    }
}

/// A fully serialized bitmap, header included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    variant: FormatVariant,
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl PackedBitmap {
    /// Packs a frame into the given format
    pub fn pack(frame: &DecodedFrame, variant: FormatVariant) -> Result<Self> {
        let width = frame.width();
        let height = frame.height();
        let mut bytes = Vec::with_capacity(variant.packed_len(width, height));

        match variant {
            FormatVariant::Animation => bytes.write_u8(UNCOMPRESSED)?,
            FormatVariant::Icon => {
                bytes.write_u32::<LittleEndian>(width)?;
                bytes.write_u32::<LittleEndian>(height)?;
            }
        }

        for row in frame.rows() {
            pack_row(row, variant, &mut bytes);
        }

        Ok(Self {
            variant,
            width,
            height,
            bytes,
        })
    }

    /// Parses serialized bytes. Animation frames carry no dimensions, so the
    /// caller supplies them; icons read their own header and `dimensions` is
    /// ignored.
    pub fn parse(variant: FormatVariant, bytes: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let mut reader = Cursor::new(&bytes);
        let (width, height) = match variant {
            FormatVariant::Animation => {
                let marker = reader.read_u8()?;
                if marker != UNCOMPRESSED {
                    return Err(Error::UnsupportedCompression(marker));
                }
                dimensions
            }
            FormatVariant::Icon => {
                let width = reader.read_u32::<LittleEndian>()?;
                let height = reader.read_u32::<LittleEndian>()?;
                (width, height)
            }
        };

        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }

        let expected = variant.packed_len(width, height);
        if bytes.len() != expected {
            return Err(Error::DataLength {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            variant,
            width,
            height,
            bytes,
        })
    }

    /// Reads a whole serialized bitmap from a reader
    pub fn read<R: Read>(mut reader: R, variant: FormatVariant, dimensions: (u32, u32)) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse(variant, bytes, dimensions)
    }

    /// Writes the serialized bitmap to a writer
    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    /// Restores the pixel grid
    pub fn unpack(&self) -> Result<DecodedFrame> {
        let variant = self.variant;
        let row_bytes = variant.row_bytes(self.width);
        let data = self.pixel_data();

        DecodedFrame::from_fn(self.width, self.height, |x, y| {
            let byte = data[y as usize * row_bytes + x as usize / 8];
            let bit = match variant.bit_order() {
                BitOrder::LsbFirst => x % 8,
                BitOrder::MsbFirst => 7 - x % 8,
            };
            let set = byte & (1 << bit) != 0;
            match variant.polarity() {
                Polarity::BlackIsZero => !set,
                Polarity::BlackIsOne => set,
            }
        })
    }

    pub fn variant(&self) -> FormatVariant {
        self.variant
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Complete serialized bytes, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Serialized bytes following the header
    pub fn pixel_data(&self) -> &[u8] {
        &self.bytes[self.variant.header_size()..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Size in bytes, header included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn pack_row(row: &[bool], variant: FormatVariant, out: &mut Vec<u8>) {
    let mut current = 0u8;
    let mut bit_count = 0u32;

    for &black in row {
        let bit = variant.bit_for(black) as u8;
        match variant.bit_order() {
            BitOrder::LsbFirst => current |= bit << bit_count,
            BitOrder::MsbFirst => current = (current << 1) | bit,
        }
        bit_count += 1;
        if bit_count == 8 {
            out.push(current);
            current = 0;
            bit_count = 0;
        }
    }

    if bit_count > 0 {
        if variant.bit_order() == BitOrder::MsbFirst {
            current <<= 8 - bit_count;
        }
        out.push(current);
    }
}
