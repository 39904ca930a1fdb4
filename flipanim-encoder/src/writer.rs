//! Atomic output writing

use crate::{Error, Result};
use flipanim_core::{DecodedFrame, FormatVariant, PackedBitmap};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `bytes` to `path` in one go: the data lands in a `.part` sibling
/// first and is renamed into place only once fully flushed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let partial = partial_path(path);

    let result = (|| {
        let mut file = File::create(&partial)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        std::fs::rename(&partial, path)
    })();

    if let Err(e) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(Error::io(path, e));
    }
    Ok(())
}

/// Packs a frame and writes it atomically to `path`
pub fn write_bitmap(frame: &DecodedFrame, variant: FormatVariant, path: &Path) -> Result<PackedBitmap> {
    let packed = PackedBitmap::pack(frame, variant)?;
    write_atomic(path, packed.as_bytes())?;
    Ok(packed)
}

/// File name of frame `index` for `variant`, e.g. `frame_3.bm`
pub fn frame_file_name(index: u32, variant: FormatVariant) -> String {
    format!("frame_{index}.{}", variant.extension())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(frame_file_name(0, FormatVariant::Animation));
        let frame = DecodedFrame::blank(128, 64).unwrap();

        let packed = write_bitmap(&frame, FormatVariant::Animation, &path).unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), 1 + 64 * 16);
        assert_eq!(on_disk, packed.as_bytes());
        assert!(!dir.path().join("frame_0.bm.part").exists());
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame_0.bm");

        let err = write_atomic(&path, &[0, 1, 2]).unwrap_err();
        assert!(err.to_string().contains("frame_0.bm"));
        assert!(!path.exists());
    }

    #[test]
    fn test_frame_file_names() {
        assert_eq!(frame_file_name(7, FormatVariant::Animation), "frame_7.bm");
        assert_eq!(frame_file_name(0, FormatVariant::Icon), "frame_0.bmx");
    }
}
