//
// output.rs
// Ecg-Dicom-Prep
//
// Lays out the output tree and derives artifact paths from the synthetic record identifier.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;

use crate::config::OutputConfig;
use crate::error::PipelineError;

const METERS_PER_INCH: f64 = 0.0254;

/// Kind of file written for a record; decides folder, suffix and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    AnonymizedDicom,
    OriginalPng,
    AnonymizedPng,
    ForAiPng,
    Array,
}

impl Artifact {
    pub const ALL: [Artifact; 5] = [
        Artifact::AnonymizedDicom,
        Artifact::OriginalPng,
        Artifact::AnonymizedPng,
        Artifact::ForAiPng,
        Artifact::Array,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Artifact::AnonymizedDicom => "",
            Artifact::OriginalPng => "_original",
            Artifact::AnonymizedPng => "_anonimizado",
            Artifact::ForAiPng => "_for_ai",
            Artifact::Array => "_array",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Artifact::AnonymizedDicom => "dcm",
            Artifact::Array => "npy",
            _ => "png",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputTree {
    root: PathBuf,
    anonymized: PathBuf,
    for_ai: PathBuf,
    originals: PathBuf,
}

impl OutputTree {
    pub fn new(root: impl AsRef<Path>, layout: &OutputConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            anonymized: root.join(&layout.anonymized_dir),
            for_ai: root.join(&layout.for_ai_dir),
            originals: root.join(&layout.originals_dir),
            root,
        }
    }

    /// Create the folders for `artifacts` up front so per-file writes cannot fail on a missing directory.
    pub fn create(&self, artifacts: &[Artifact]) -> Result<()> {
        for dir in artifacts.iter().map(|a| self.dir_for(*a)) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory {:?}", dir))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_for(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::AnonymizedDicom | Artifact::AnonymizedPng => &self.anonymized,
            Artifact::ForAiPng | Artifact::Array => &self.for_ai,
            Artifact::OriginalPng => &self.originals,
        }
    }

    pub fn path_for(&self, record_id: &str, artifact: Artifact) -> PathBuf {
        let filename = format!("{}{}.{}", record_id, artifact.suffix(), artifact.extension());
        self.dir_for(artifact).join(filename)
    }
}

/// Write an RGB page as PNG with its resolution recorded in the pHYs chunk.
pub fn save_png(image: &RgbImage, path: &Path, dpi: u32) -> Result<(), PipelineError> {
    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let per_meter = (dpi as f64 / METERS_PER_INCH).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: per_meter,
        yppu: per_meter,
        unit: png::Unit::Meter,
    }));

    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())?;
    writer.finish()?;
    Ok(())
}

/// Resolution stored in a PNG's pHYs chunk, in dots per inch.
pub fn png_dpi(path: &Path) -> Option<f32> {
    let decoder = png::Decoder::new(File::open(path).ok()?);
    let reader = decoder.read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some((dims.xppu as f64 * METERS_PER_INCH) as f32),
        png::Unit::Unspecified => None,
    }
}
