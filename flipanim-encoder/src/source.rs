//! Source discovery, frame ordering and output folder naming

use crate::{Error, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// File extensions accepted as still-image sources inside a directory
const IMAGE_EXTENSIONS: &[&str] = &["png", "gif", "bmp", "jpg", "jpeg", "webp", "tif", "tiff"];

/// Resolves the input into image files in playback order.
///
/// A file is returned as-is; a directory yields its image files sorted by
/// name with embedded numbers compared numerically (`2.png` before `10.png`).
pub fn collect_sources(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(Error::validation(format!(
            "source {} does not exist",
            input.display()
        )));
    }

    let sources = list_files(input, |name| {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    })?;
    if sources.is_empty() {
        return Err(Error::NoFrames(input.to_path_buf()));
    }
    Ok(sources)
}

/// Lists regular files in `dir` whose names pass `keep`, in natural order
pub(crate) fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        let keep_it = path.is_file()
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(&keep);
        if keep_it {
            files.push(path);
        }
    }
    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(files)
}

/// Compares strings treating runs of ASCII digits as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_number(&mut a);
                let right = take_number(&mut b);
                let ord = left
                    .trim_start_matches('0')
                    .len()
                    .cmp(&right.trim_start_matches('0').len())
                    .then_with(|| left.trim_start_matches('0').cmp(right.trim_start_matches('0')))
                    .then_with(|| left.len().cmp(&right.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

/// Normalizes the user-chosen output folder: whitespace in the folder name
/// becomes `_` and a `_<W>x<H>` suffix is appended when missing.
pub fn output_dir_name(dir: &Path, width: u32, height: u32) -> PathBuf {
    let suffix = format!("_{width}x{height}");
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if !name.ends_with(&suffix) {
        name.push_str(&suffix);
    }

    match dir.parent() {
        Some(parent) if dir.file_name().is_some() => parent.join(name),
        _ => dir.join(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["frame10.png", "frame2.png", "frame1.png", "frame02.png", "a.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["a.png", "frame1.png", "frame2.png", "frame02.png", "frame10.png"]);
    }

    #[test]
    fn test_output_dir_name() {
        assert_eq!(
            output_dir_name(Path::new("/packs/My Cat"), 128, 64),
            PathBuf::from("/packs/My_Cat_128x64")
        );
        assert_eq!(
            output_dir_name(Path::new("/packs/dance_128x64"), 128, 64),
            PathBuf::from("/packs/dance_128x64")
        );
        assert_eq!(output_dir_name(Path::new("icons"), 10, 10), PathBuf::from("icons_10x10"));
    }

    #[test]
    fn test_collect_directory_sources() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["10.png", "2.png", "1.PNG", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("3.png")).unwrap();

        let sources = collect_sources(dir.path()).unwrap();
        let names: Vec<_> = sources
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["1.PNG", "2.png", "10.png"]);
    }

    #[test]
    fn test_missing_source() {
        let err = collect_sources(Path::new("/nonexistent/anim.gif")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/anim.gif"));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(collect_sources(dir.path()), Err(Error::NoFrames(_))));
    }
}
