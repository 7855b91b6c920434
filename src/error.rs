//
// error.rs
// Ecg-Dicom-Prep
//
// Error taxonomy for the conversion pipeline: run-level discovery failures and per-file failures.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid configuration, detected before any file is touched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be in (0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f32 },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("no rasterizer backend configured")]
    NoBackends,
    #[error("failed to read config file {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

/// Failure of a single rasterization backend.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("{backend} unavailable: {reason}")]
    Unavailable { backend: &'static str, reason: String },
    #[error("{backend} failed: {reason}")]
    Failed { backend: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no DICOM files found in {0:?}")]
    NoInputFiles(PathBuf),
    #[error("failed to parse DICOM: {0}")]
    Parse(String),
    #[error("DICOM has no embedded PDF document")]
    MissingDocument,
    #[error("PDF rasterization failed ({})", .attempts.join("; "))]
    Rasterization { attempts: Vec<String> },
    #[error("image rejected: {dpi:.0} DPI at {resolution} is below both the DPI and size floors")]
    QualityRejected { dpi: f32, resolution: String },
    #[error("failed to write DICOM: {0}")]
    Dicom(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to encode PNG: {0}")]
    Png(#[from] png::EncodingError),
    #[error("array error: {0}")]
    Array(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification used in the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Parse,
    MissingDocument,
    Rasterization,
    QualityRejected,
    Unexpected,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Parse(_) => FailureKind::Parse,
            PipelineError::MissingDocument => FailureKind::MissingDocument,
            PipelineError::Rasterization { .. } => FailureKind::Rasterization,
            PipelineError::QualityRejected { .. } => FailureKind::QualityRejected,
            _ => FailureKind::Unexpected,
        }
    }
}
