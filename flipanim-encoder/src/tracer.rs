//! Optional vector tracing of packed frames via potrace

use crate::{Error, Result};
use flipanim_core::{DecodedFrame, FormatVariant, PackedBitmap};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Capability interface to the vector tracing collaborator
pub trait Tracer {
    /// Fails with [`Error::Dependency`] when the collaborator cannot run
    fn ensure_available(&self) -> Result<()>;

    /// Traces the black pixels of `frame` into an SVG at `svg_path`
    fn trace(&self, frame: &DecodedFrame, svg_path: &Path) -> Result<()>;
}

/// [`Tracer`] backed by the `potrace` binary
#[derive(Debug, Clone)]
pub struct PotraceTracer {
    program: PathBuf,
}

impl PotraceTracer {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("potrace"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for PotraceTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for PotraceTracer {
    fn ensure_available(&self) -> Result<()> {
        let found = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !found {
            return Err(Error::Dependency {
                tool: "potrace",
                hint: "install potrace or drop --trace",
            });
        }
        Ok(())
    }

    fn trace(&self, frame: &DecodedFrame, svg_path: &Path) -> Result<()> {
        let pbm_path = svg_path.with_extension("pbm");
        write_pbm(frame, &pbm_path)?;

        let output = Command::new(&self.program)
            .arg("-s")
            .arg("-o")
            .arg(svg_path)
            .arg(&pbm_path)
            .stdin(Stdio::null())
            .output();
        let _ = std::fs::remove_file(&pbm_path);

        let output = output.map_err(|e| Error::io(&self.program, e))?;
        if !output.status.success() {
            return Err(Error::Tool {
                tool: "potrace",
                path: svg_path.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Writes the frame as a binary (P4) PBM. P4 rows share the icon layout:
/// MSB first, set bit is black, each row padded to whole bytes.
pub fn write_pbm(frame: &DecodedFrame, path: &Path) -> Result<()> {
    let packed = PackedBitmap::pack(frame, FormatVariant::Icon)?;
    let mut bytes = format!("P4\n{} {}\n", frame.width(), frame.height()).into_bytes();
    bytes.extend_from_slice(packed.pixel_data());
    std::fs::write(path, bytes).map_err(|e| Error::io(path, e))
}
