use std::fs;
use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;

use super::{PageRasterizer, RasterizedPage};
use crate::error::RasterError;

const NAME: &str = "pdftoppm";

/// Renders by shelling out to poppler's `pdftoppm`, which rasterizes directly at a given DPI.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    binary: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::with_binary("pdftoppm")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        // `-v` prints the version and exits; only spawnability matters here.
        Command::new(&self.binary).arg("-v").output().is_ok()
    }

    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<RasterizedPage, RasterError> {
        let failed = |reason: String| RasterError::Failed {
            backend: NAME,
            reason,
        };

        let workdir = tempfile::tempdir().map_err(|e| failed(format!("temp dir: {e}")))?;
        let input = workdir.path().join("document.pdf");
        fs::write(&input, pdf).map_err(|e| failed(format!("cannot stage PDF: {e}")))?;
        let output_root = workdir.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .args(["-f", "1", "-l", "1", "-singlefile"])
            .arg(&input)
            .arg(&output_root)
            .output()
            .map_err(|e| RasterError::Unavailable {
                backend: NAME,
                reason: format!("cannot run {}: {e}", self.binary.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let rendered = output_root.with_extension("png");
        let image = image::open(&rendered)
            .map_err(|e| failed(format!("cannot read {}: {e}", rendered.display())))?;

        Ok(RasterizedPage {
            image: DynamicImage::ImageRgb8(image.to_rgb8()),
            dpi: Some((dpi as f32, dpi as f32)),
            backend: NAME,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_reported_unavailable() {
        let rasterizer = PdftoppmRasterizer::with_binary("/nonexistent/pdftoppm-binary");
        assert!(!rasterizer.is_available());
        assert!(matches!(
            rasterizer.rasterize(b"%PDF-1.4", 200),
            Err(RasterError::Unavailable { .. })
        ));
    }
}
