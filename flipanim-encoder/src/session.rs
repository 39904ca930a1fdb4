//! One conversion run
//!
//! A [`ConversionSession`] owns everything that accumulates across frames: the
//! next frame index, the playback order and the list of skipped rasters.
//! Outputs are written into a hidden staging folder next to the destination
//! and only moved into place by [`ConversionSession::finish`], so an aborted
//! run never leaves a folder that looks complete.

use crate::filter::{FilterOptions, ImageFilter};
use crate::progress_tracker::ProgressTracker;
use crate::tracer::Tracer;
use crate::writer::{frame_file_name, write_atomic, write_bitmap};
use crate::{raster, Error, FrameErrorPolicy, PixelMode, Result};
use flipanim_core::metadata::META_FILE_NAME;
use flipanim_core::{
    AnimationMetadata, AnimationSettings, BubbleConfig, FormatVariant, FrameSequence, DEVICE_HEIGHT,
    DEVICE_WIDTH,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SVG_DIR: &str = "svg";
const RAW_DIR: &str = "raw";

/// Settings for one conversion run
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub variant: FormatVariant,
    pub pixel_mode: PixelMode,
    pub on_frame_error: FrameErrorPolicy,
    /// Effects and target size handed to the image filter
    pub filter: FilterOptions,
    pub settings: AnimationSettings,
    pub bubble: Option<BubbleConfig>,
    /// End the frame order with a trailing `0`
    pub wraparound: bool,
    /// Also trace every packed frame into an SVG
    pub trace: bool,
}

impl SessionConfig {
    /// Animation frames at the device's screen size
    pub fn animation() -> Self {
        Self {
            variant: FormatVariant::Animation,
            pixel_mode: PixelMode::default(),
            on_frame_error: FrameErrorPolicy::default(),
            filter: FilterOptions::new(DEVICE_WIDTH, DEVICE_HEIGHT),
            settings: AnimationSettings::default(),
            bubble: None,
            wraparound: false,
            trace: false,
        }
    }

    /// Icons at a caller-chosen size
    pub fn icon(width: u32, height: u32) -> Self {
        Self {
            variant: FormatVariant::Icon,
            filter: FilterOptions::new(width, height),
            ..Self::animation()
        }
    }

    pub fn width(&self) -> u32 {
        self.filter.width
    }

    pub fn height(&self) -> u32 {
        self.filter.height
    }

    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.settings.validate()?;
        if self.variant == FormatVariant::Animation
            && (self.width(), self.height()) != (DEVICE_WIDTH, DEVICE_HEIGHT)
        {
            return Err(Error::validation(format!(
                "animation frames must be {DEVICE_WIDTH}x{DEVICE_HEIGHT}, got {}x{}",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub output_dir: PathBuf,
    pub frame_count: u32,
    /// Rasters dropped under [`FrameErrorPolicy::Skip`]
    pub skipped: Vec<PathBuf>,
    /// Descriptor written for animation runs
    pub metadata: Option<AnimationMetadata>,
}

/// Accumulator scoped to a single conversion run
pub struct ConversionSession<'a> {
    config: SessionConfig,
    filter: &'a dyn ImageFilter,
    tracer: Option<&'a dyn Tracer>,
    output_dir: PathBuf,
    staging_dir: PathBuf,
    frames: FrameSequence,
    skipped: Vec<PathBuf>,
    sources_seen: usize,
}

impl<'a> ConversionSession<'a> {
    /// Checks the configuration and external tools, then prepares a clean
    /// staging folder. Nothing is processed if a dependency is missing.
    pub fn begin(
        config: SessionConfig,
        filter: &'a dyn ImageFilter,
        tracer: Option<&'a dyn Tracer>,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        config.validate()?;
        filter.ensure_available()?;
        let tracer = if config.trace {
            let tracer = tracer.ok_or_else(|| Error::validation("tracing requested but no tracer configured"))?;
            tracer.ensure_available()?;
            Some(tracer)
        } else {
            None
        };

        let output_dir = output_dir.into();
        let staging_dir = staging_dir_for(&output_dir);
        if staging_dir.exists() {
            std::fs::remove_dir_all(&staging_dir).map_err(|e| Error::io(&staging_dir, e))?;
        }
        std::fs::create_dir_all(&staging_dir).map_err(|e| Error::io(&staging_dir, e))?;
        if tracer.is_some() {
            let svg_dir = staging_dir.join(SVG_DIR);
            std::fs::create_dir_all(&svg_dir).map_err(|e| Error::io(&svg_dir, e))?;
        }

        let frames = if config.wraparound {
            FrameSequence::with_wraparound()
        } else {
            FrameSequence::new()
        };

        info!(
            output = %output_dir.display(),
            variant = ?config.variant,
            "starting conversion at {}x{}",
            config.width(),
            config.height()
        );

        Ok(Self {
            config,
            filter,
            tracer,
            output_dir,
            staging_dir,
            frames,
            skipped: Vec::new(),
            sources_seen: 0,
        })
    }

    /// Runs the image filter over one source and packs every frame it yields
    pub fn convert_source(&mut self, source: &Path) -> Result<()> {
        let raw_dir = self
            .staging_dir
            .join(RAW_DIR)
            .join(self.sources_seen.to_string());
        self.sources_seen += 1;

        let rasters = self.filter.apply(source, &raw_dir, &self.config.filter)?;
        info!(source = %source.display(), "filter produced {} frame(s)", rasters.len());

        let mut progress = ProgressTracker::new(rasters.len() as u64, "Packing");
        for raster in &rasters {
            self.pack_raster(raster)?;
            progress.increment_and_report(10);
        }
        Ok(())
    }

    /// Packs one filtered raster as the next frame. Returns the assigned index,
    /// or `None` when the raster was skipped.
    pub fn pack_raster(&mut self, raster: &Path) -> Result<Option<u32>> {
        let expected = (self.config.width(), self.config.height());
        let frame = match raster::load_frame(raster, self.config.pixel_mode, Some(expected)) {
            Ok(frame) => frame,
            Err(e) if e.is_skippable() && self.config.on_frame_error == FrameErrorPolicy::Skip => {
                warn!("skipping frame: {e}");
                self.skipped.push(raster.to_path_buf());
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let index = self.frames.next_index();
        let path = self
            .staging_dir
            .join(frame_file_name(index, self.config.variant));
        let packed = write_bitmap(&frame, self.config.variant, &path)?;
        debug!(index, bytes = packed.len(), raster = %raster.display(), "packed frame");

        if let Some(tracer) = self.tracer {
            let svg_path = self.staging_dir.join(SVG_DIR).join(format!("frame_{index}.svg"));
            tracer.trace(&frame, &svg_path)?;
        }
        Ok(Some(index))
    }

    /// Frames packed so far
    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    /// Writes the descriptor (animation runs) and moves all outputs into the
    /// destination folder. On any error the staging folder is discarded.
    pub fn finish(self) -> Result<SessionReport> {
        let metadata = match self.write_outputs() {
            Ok(metadata) => metadata,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!(staging = %self.staging_dir.display(), "failed to clean staging folder: {e}");
        }

        info!(
            output = %self.output_dir.display(),
            frames = self.frames.len(),
            skipped = self.skipped.len(),
            "conversion finished"
        );

        Ok(SessionReport {
            output_dir: self.output_dir,
            frame_count: self.frames.len() as u32,
            skipped: self.skipped,
            metadata,
        })
    }

    fn write_outputs(&self) -> Result<Option<AnimationMetadata>> {
        if self.frames.is_empty() {
            return Err(Error::NoFrames(self.output_dir.clone()));
        }

        let metadata = match self.config.variant {
            FormatVariant::Animation => {
                let metadata = AnimationMetadata::compose(
                    self.config.width(),
                    self.config.height(),
                    &self.frames,
                    self.config.settings,
                    self.config.bubble.as_ref(),
                );
                write_atomic(&self.staging_dir.join(META_FILE_NAME), metadata.render().as_bytes())?;
                Some(metadata)
            }
            FormatVariant::Icon => None,
        };

        self.promote()?;
        Ok(metadata)
    }

    /// Discards everything staged so far
    pub fn abort(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!(staging = %self.staging_dir.display(), "failed to clean staging folder: {e}");
        }
    }

    /// Replaces the outputs of any earlier run in the destination. If a
    /// rename fails, the files already moved are removed again.
    fn promote(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;
        clear_previous_outputs(&self.output_dir)?;

        let mut names: Vec<String> = (0..self.frames.len() as u32)
            .map(|index| frame_file_name(index, self.config.variant))
            .collect();
        if self.config.variant == FormatVariant::Animation {
            names.push(META_FILE_NAME.to_string());
        }
        if self.tracer.is_some() {
            let svg_dir = self.output_dir.join(SVG_DIR);
            std::fs::create_dir_all(&svg_dir).map_err(|e| Error::io(&svg_dir, e))?;
            names.extend((0..self.frames.len()).map(|index| format!("{SVG_DIR}/frame_{index}.svg")));
        }

        let mut promoted: Vec<PathBuf> = Vec::with_capacity(names.len());
        for name in names {
            let from = self.staging_dir.join(&name);
            let to = self.output_dir.join(&name);
            if let Err(e) = std::fs::rename(&from, &to) {
                for path in &promoted {
                    if let Err(e) = std::fs::remove_file(path) {
                        warn!(path = %path.display(), "failed to roll back promoted file: {e}");
                    }
                }
                return Err(Error::io(&to, e));
            }
            promoted.push(to);
        }
        Ok(())
    }
}

/// Removes frame files, the descriptor and the SVG folder left by an earlier
/// run. Anything else in the folder is kept.
fn clear_previous_outputs(output_dir: &Path) -> Result<()> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| Error::io(output_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(output_dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::io(&path, e))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_file() && (name == META_FILE_NAME || is_frame_file(&name)) {
            debug!(path = %path.display(), "removing previous output");
            std::fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
        } else if file_type.is_dir() && name == SVG_DIR {
            debug!(path = %path.display(), "removing previous output");
            std::fs::remove_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }
    }
    Ok(())
}

/// `frame_<digits>.bm` or `frame_<digits>.bmx`
fn is_frame_file(name: &str) -> bool {
    let Some((index, extension)) = name
        .strip_prefix("frame_")
        .and_then(|rest| rest.split_once('.'))
    else {
        return false;
    };
    !index.is_empty()
        && index.bytes().all(|b| b.is_ascii_digit())
        && [FormatVariant::Animation, FormatVariant::Icon]
            .iter()
            .any(|variant| variant.extension() == extension)
}

/// Converts every source in order and finishes the run. On failure the
/// staging folder is removed and the error returned.
pub fn run(
    config: SessionConfig,
    filter: &dyn ImageFilter,
    tracer: Option<&dyn Tracer>,
    sources: &[PathBuf],
    output_dir: &Path,
) -> Result<SessionReport> {
    let mut session = ConversionSession::begin(config, filter, tracer, output_dir)?;
    for source in sources {
        if let Err(e) = session.convert_source(source) {
            session.abort();
            return Err(e);
        }
    }
    session.finish()
}

/// Hidden sibling folder used while a run is in progress
fn staging_dir_for(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.with_file_name(format!(".{name}.partial"))
}
