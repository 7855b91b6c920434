use std::cell::OnceCell;
use std::fmt;
use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

use super::{zoom_for_dpi, PageRasterizer, RasterizedPage};
use crate::error::RasterError;

const NAME: &str = "pdfium";

/// Renders through Google PDFium, bound on first use and reused for the whole run.
///
/// Library lookup: `PDFIUM_DYNAMIC_LIB_PATH`, the executable's directory, then the system paths.
#[derive(Default)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
    // Bind outcome, failure reason included, so a missing library is probed once.
    pdfium: OnceCell<Result<Pdfium, String>>,
}

impl fmt::Debug for PdfiumRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfiumRasterizer")
            .field("library", &self.library)
            .field("bound", &self.pdfium.get().map(|r| r.is_ok()))
            .finish()
    }
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use exactly this shared library instead of the lookup order.
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
            pdfium: OnceCell::new(),
        }
    }

    fn pdfium(&self) -> Result<&Pdfium, RasterError> {
        self.pdfium
            .get_or_init(|| bind(self.library.as_ref()))
            .as_ref()
            .map_err(|reason| RasterError::Unavailable {
                backend: NAME,
                reason: reason.clone(),
            })
    }
}

fn bind(library: Option<&PathBuf>) -> Result<Pdfium, String> {
    let explicit = library
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("PDFIUM_DYNAMIC_LIB_PATH").ok());
    if let Some(path) = explicit {
        let bindings =
            Pdfium::bind_to_library(&path).map_err(|e| format!("cannot load {path}: {e}"))?;
        debug!(path, "PDFium bound");
        return Ok(Pdfium::new(bindings));
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));
    if let Some(dir) = exe_dir {
        let dir_str = dir.to_string_lossy().into_owned();
        let lib_path = Pdfium::pdfium_platform_library_name_at_path(&dir_str);
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!(dir = %dir.display(), "loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("PDFium library not found ({e}); set PDFIUM_DYNAMIC_LIB_PATH"))
}

impl PageRasterizer for PdfiumRasterizer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.pdfium().is_ok()
    }

    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<RasterizedPage, RasterError> {
        let failed = |reason: String| RasterError::Failed {
            backend: NAME,
            reason,
        };

        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| failed(format!("cannot open PDF: {e}")))?;
        let page = document
            .pages()
            .get(0)
            .map_err(|e| failed(format!("cannot access page 1: {e}")))?;

        let zoom = zoom_for_dpi(dpi);
        let bitmap = page
            .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(zoom))
            .map_err(|e| failed(format!("render failed: {e}")))?;

        // PDFium hands back BGRA; drop alpha for a plain RGB page.
        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        Ok(RasterizedPage {
            image,
            dpi: Some((dpi as f32, dpi as f32)),
            backend: NAME,
        })
    }
}
