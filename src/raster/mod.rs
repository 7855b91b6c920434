//
// raster/mod.rs
// Ecg-Dicom-Prep
//
// Rasterizes page one of an embedded PDF through an ordered chain of interchangeable backends.
//
// Thales Matheus Mendonça Santos - November 2025

mod pdfium;
mod pdftoppm;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::config::Backend;
use crate::error::{PipelineError, RasterError};

pub use self::pdfium::PdfiumRasterizer;
pub use self::pdftoppm::PdftoppmRasterizer;

/// PDF user space unit: 72 points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// First page of a PDF rendered to pixels.
#[derive(Debug, Clone)]
pub struct RasterizedPage {
    pub image: DynamicImage,
    /// Resolution the page was rendered at, when known.
    pub dpi: Option<(f32, f32)>,
    pub backend: &'static str,
}

impl RasterizedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width(), self.height())
    }
}

/// One way of turning PDF bytes into a page bitmap. Only page one is rendered.
pub trait PageRasterizer {
    fn name(&self) -> &'static str;

    /// Cheap probe for the backend's external dependency.
    fn is_available(&self) -> bool;

    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<RasterizedPage, RasterError>;
}

/// Backends tried in preference order; the first success wins.
pub struct RasterizerChain {
    backends: Vec<Box<dyn PageRasterizer>>,
}

impl RasterizerChain {
    pub fn new(backends: Vec<Box<dyn PageRasterizer>>) -> Self {
        Self { backends }
    }

    pub fn from_config(order: &[Backend]) -> Self {
        let backends = order
            .iter()
            .map(|backend| -> Box<dyn PageRasterizer> {
                match backend {
                    Backend::Pdfium => Box::new(PdfiumRasterizer::new()),
                    Backend::Pdftoppm => Box::new(PdftoppmRasterizer::new()),
                }
            })
            .collect();
        Self::new(backends)
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn PageRasterizer> {
        self.backends.iter().map(|b| b.as_ref())
    }

    pub fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<RasterizedPage, PipelineError> {
        let mut attempts = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            match backend.rasterize(pdf, dpi) {
                Ok(page) => {
                    debug!(backend = backend.name(), resolution = %page.resolution(), "page rasterized");
                    return Ok(page);
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "rasterizer failed, trying next");
                    attempts.push(e.to_string());
                }
            }
        }
        Err(PipelineError::Rasterization { attempts })
    }
}

/// Zoom factor that maps PDF points to pixels at `dpi`.
pub fn zoom_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / POINTS_PER_INCH
}
