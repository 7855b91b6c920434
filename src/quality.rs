use serde::{Deserialize, Serialize};

use crate::raster::RasterizedPage;

/// DPI assumed when the page carries no resolution metadata.
pub const DEFAULT_DPI: f32 = 72.0;

/// Outcome of the resolution gate for one rasterized page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Mean of the horizontal and vertical DPI.
    pub dpi: f32,
    pub resolution: String,
    /// Nominal DPI reached, or the absolute size floor met.
    pub dpi_ok: bool,
    pub size_ok: bool,
}

impl QualityReport {
    pub fn rejected(&self) -> bool {
        !self.dpi_ok && !self.size_ok
    }

    /// Accepted only because the pixel count is large enough.
    pub fn accepted_by_size_only(&self, min_dpi: u32) -> bool {
        self.size_ok && self.dpi < min_dpi as f32
    }
}

pub fn validate(page: &RasterizedPage, min_dpi: u32, min_size: (u32, u32)) -> QualityReport {
    let (dpi_x, dpi_y) = page.dpi.unwrap_or((DEFAULT_DPI, DEFAULT_DPI));
    let dpi = (dpi_x + dpi_y) / 2.0;

    let size_ok = page.width() >= min_size.0 && page.height() >= min_size.1;
    QualityReport {
        dpi,
        resolution: page.resolution(),
        dpi_ok: dpi >= min_dpi as f32 || size_ok,
        size_ok,
    }
}
