//! Finished animation folders

use crate::bitmap_decoder::to_gray;
use crate::{Error, Result};
use flipanim_core::metadata::META_FILE_NAME;
use flipanim_core::{AnimationMetadata, FormatVariant, PackedBitmap};
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// An animation folder: `meta.txt` plus the frames it references
pub struct AnimationPack {
    dir: PathBuf,
    metadata: AnimationMetadata,
    frames: HashMap<u32, PackedBitmap>,
}

impl AnimationPack {
    /// Loads the descriptor and every frame named in its frame order
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let meta_path = dir.join(META_FILE_NAME);
        let text = std::fs::read_to_string(&meta_path).map_err(|e| Error::io(&meta_path, e))?;
        let metadata = AnimationMetadata::parse(&text).map_err(|e| Error::core(&meta_path, e))?;

        let mut frames = HashMap::new();
        for &index in &metadata.frame_order {
            if frames.contains_key(&index) {
                continue;
            }
            let path = dir.join(format!("frame_{index}.bm"));
            let bytes = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
            let packed = PackedBitmap::parse(
                FormatVariant::Animation,
                bytes,
                (metadata.width, metadata.height),
            )
            .map_err(|e| Error::core(&path, e))?;
            frames.insert(index, packed);
        }
        tracing::debug!(dir = %dir.display(), frames = frames.len(), "loaded animation pack");

        Ok(Self {
            dir,
            metadata,
            frames,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metadata(&self) -> &AnimationMetadata {
        &self.metadata
    }

    /// Number of distinct frame files
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total size of all frame files in bytes
    pub fn total_bytes(&self) -> usize {
        self.frames.values().map(PackedBitmap::len).sum()
    }

    /// Returns the packed frame with the given file index
    pub fn frame(&self, index: u32) -> Result<&PackedBitmap> {
        self.frames.get(&index).ok_or(Error::FrameNotFound(index))
    }

    /// Whether the bubble is shown at position `step` of the playback order
    pub fn bubble_visible(&self, step: u32) -> bool {
        self.metadata
            .bubble
            .as_ref()
            .is_some_and(|b| step >= b.start_frame && step < b.end_frame)
    }

    /// Renders the frame shown at position `step` of the playback order
    pub fn render_step(&self, step: usize) -> Result<GrayImage> {
        let index = *self
            .metadata
            .frame_order
            .get(step)
            .ok_or(Error::FrameNotFound(step as u32))?;
        let frame = self.frame(index)?;
        let decoded = frame.unpack().map_err(|e| Error::core(&self.dir, e))?;
        Ok(to_gray(&decoded))
    }

    /// Writes one PNG per playback step into `out_dir`, returning the paths
    pub fn export_previews(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir).map_err(|e| Error::io(out_dir, e))?;
        let mut written = Vec::with_capacity(self.metadata.frame_order.len());
        for step in 0..self.metadata.frame_order.len() {
            let image = self.render_step(step)?;
            let path = out_dir.join(format!("step_{step:04}.png"));
            image.save(&path).map_err(|source| Error::Image {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipanim_core::{AnimationSettings, BubbleConfig, DecodedFrame, FrameSequence, Locale};

    fn write_pack(dir: &Path, count: u32, wraparound: bool, bubble: Option<BubbleConfig>) {
        let mut frames = if wraparound {
            FrameSequence::with_wraparound()
        } else {
            FrameSequence::new()
        };
        for _ in 0..count {
            let index = frames.next_index();
            let frame = DecodedFrame::from_fn(128, 64, |x, _| x == index).unwrap();
            let packed = PackedBitmap::pack(&frame, FormatVariant::Animation).unwrap();
            std::fs::write(dir.join(format!("frame_{index}.bm")), packed.as_bytes()).unwrap();
        }
        let meta = AnimationMetadata::compose(128, 64, &frames, AnimationSettings::default(), bubble.as_ref());
        std::fs::write(dir.join(META_FILE_NAME), meta.render()).unwrap();
    }

    #[test]
    fn test_open_and_render() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), 3, true, None);

        let pack = AnimationPack::open(dir.path()).unwrap();
        assert_eq!(pack.frame_count(), 3);
        assert_eq!(pack.metadata().frame_order, vec![0, 1, 2, 0]);
        assert_eq!(pack.total_bytes(), 3 * (1 + 64 * 16));

        let image = pack.render_step(1).unwrap();
        assert_eq!(image.get_pixel(1, 0)[0], 0);
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert!(matches!(pack.render_step(4), Err(Error::FrameNotFound(4))));
    }

    #[test]
    fn test_bubble_visibility() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(
            dir.path(),
            4,
            false,
            Some(BubbleConfig::new(Locale::TopLeft, "Hi").with_frames(1, 3)),
        );

        let pack = AnimationPack::open(dir.path()).unwrap();
        let visible: Vec<bool> = (0..4).map(|step| pack.bubble_visible(step)).collect();
        assert_eq!(visible, vec![false, true, true, false]);
    }

    #[test]
    fn test_export_previews() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), 2, false, None);
        let out = dir.path().join("preview");

        let pack = AnimationPack::open(dir.path()).unwrap();
        let written = pack.export_previews(&out).unwrap();
        assert_eq!(written.len(), 2);
        let reloaded = image::open(&written[1]).unwrap().to_luma8();
        assert_eq!(reloaded.dimensions(), (128, 64));
        assert_eq!(reloaded.get_pixel(1, 10)[0], 0);
    }

    #[test]
    fn test_missing_frame_file() {
        let dir = tempfile::tempdir().unwrap();
        write_pack(dir.path(), 2, false, None);
        std::fs::remove_file(dir.path().join("frame_1.bm")).unwrap();

        let err = AnimationPack::open(dir.path()).err().unwrap();
        assert!(err.to_string().contains("frame_1.bm"));
    }
}
