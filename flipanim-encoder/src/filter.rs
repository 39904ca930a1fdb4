//! External image filter
//!
//! Decoding, frame extraction and all pixel effects are delegated to
//! ImageMagick. The packer only ever sees the filtered rasters it writes.

use crate::{source, Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Binarization threshold in tenths, 0.1 to 0.9
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threshold(u8);

impl Threshold {
    /// Builds a threshold from tenths (1..=9)
    pub fn from_tenths(tenths: u8) -> Result<Self> {
        if !(1..=9).contains(&tenths) {
            return Err(Error::validation(format!(
                "threshold must be between 0.1 and 0.9, got 0.{tenths}"
            )));
        }
        Ok(Self(tenths))
    }

    /// Builds a threshold from a fraction such as `0.4`
    pub fn from_fraction(value: f64) -> Result<Self> {
        let tenths = (value * 10.0).round();
        if (tenths / 10.0 - value).abs() > 1e-6 || !(1.0..=9.0).contains(&tenths) {
            return Err(Error::validation(format!(
                "threshold must be one of 0.1, 0.2, ... 0.9, got {value}"
            )));
        }
        Ok(Self(tenths as u8))
    }

    pub fn percent(self) -> u32 {
        self.0 as u32 * 10
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(5)
    }
}

/// Effects applied by the filter, plus the target raster size
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOptions {
    pub width: u32,
    pub height: u32,
    /// Edge detection radius
    pub edge: Option<u32>,
    pub invert: bool,
    pub monochrome: bool,
    pub grayscale: bool,
    /// Sharpen geometry, e.g. `0x1.0`
    pub sharpen: Option<String>,
    pub dither: bool,
    /// Contrast stretch levels, e.g. `2%x1%`
    pub contrast_stretch: Option<String>,
    pub threshold: Threshold,
}

impl FilterOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            edge: None,
            invert: false,
            monochrome: false,
            grayscale: false,
            sharpen: None,
            dither: false,
            contrast_stretch: None,
            threshold: Threshold::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::validation("target width/height must be non-zero"));
        }
        Ok(())
    }

    /// ImageMagick arguments between the input and output paths
    pub fn magick_args(&self) -> Vec<String> {
        let size = format!("{}x{}", self.width, self.height);
        let mut args: Vec<String> = vec!["-coalesce".into(), "-resize".into(), size.clone()];
        args.extend(["-gravity", "center", "-background", "white", "-extent"].map(String::from));
        args.push(size);

        if self.grayscale {
            args.extend(["-colorspace", "Gray"].map(String::from));
        }
        if let Some(radius) = self.edge {
            args.push("-edge".into());
            args.push(radius.to_string());
        }
        if self.invert {
            args.push("-negate".into());
        }
        if let Some(sharpen) = &self.sharpen {
            args.push("-sharpen".into());
            args.push(sharpen.clone());
        }
        if let Some(stretch) = &self.contrast_stretch {
            args.push("-contrast-stretch".into());
            args.push(stretch.clone());
        }
        if self.dither {
            args.extend(["-dither", "FloydSteinberg", "-colors", "2"].map(String::from));
        } else {
            args.push("+dither".into());
        }
        if self.monochrome {
            args.push("-monochrome".into());
        }
        args.push("-threshold".into());
        args.push(format!("{}%", self.threshold.percent()));
        args.extend(["-type", "bilevel", "-depth", "1", "+adjoin"].map(String::from));
        args
    }
}

/// Capability interface to the image decoding/filtering collaborator
pub trait ImageFilter {
    /// Fails with [`Error::Dependency`] when the collaborator cannot run
    fn ensure_available(&self) -> Result<()>;

    /// Filters `input` (a still or animated image) into one raster per frame
    /// inside `dest_dir`, returning the files in playback order.
    fn apply(&self, input: &Path, dest_dir: &Path, options: &FilterOptions) -> Result<Vec<PathBuf>>;
}

/// [`ImageFilter`] backed by the `magick` binary
#[derive(Debug, Clone)]
pub struct MagickFilter {
    program: PathBuf,
}

impl MagickFilter {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("magick"),
        }
    }

    /// Uses a specific ImageMagick executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command_args(&self, input: &Path, dest_dir: &Path, options: &FilterOptions) -> Vec<OsString> {
        let mut args = vec![input.as_os_str().to_owned()];
        args.extend(options.magick_args().into_iter().map(OsString::from));
        let mut output = OsString::from("PNG:");
        output.push(dest_dir.join("frame-%04d.png"));
        args.push(output);
        args
    }
}

impl Default for MagickFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFilter for MagickFilter {
    fn ensure_available(&self) -> Result<()> {
        let found = Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !found {
            return Err(Error::Dependency {
                tool: "magick",
                hint: "install ImageMagick 7",
            });
        }
        Ok(())
    }

    fn apply(&self, input: &Path, dest_dir: &Path, options: &FilterOptions) -> Result<Vec<PathBuf>> {
        options.validate()?;
        std::fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;

        let args = self.command_args(input, dest_dir, options);
        tracing::debug!(input = %input.display(), ?args, "running magick");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::io(&self.program, e))?;

        if !output.status.success() {
            return Err(Error::Tool {
                tool: "magick",
                path: input.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let frames = source::list_files(dest_dir, |name| name.starts_with("frame-") && name.ends_with(".png"))?;
        if frames.is_empty() {
            return Err(Error::NoFrames(input.to_path_buf()));
        }
        Ok(frames)
    }
}
