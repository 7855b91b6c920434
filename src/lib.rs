//
// lib.rs
// Ecg-Dicom-Prep
//
// Exposes the pipeline stages as modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: one module per pipeline stage plus shared plumbing.
pub mod anonymize;
pub mod cli;
pub mod config;
pub mod dicom_access;
pub mod discovery;
pub mod document;
pub mod error;
pub mod font;
pub mod inspect;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod quality;
pub mod raster;
pub mod redact;

pub use cli::{run as run_cli, Cli, Commands};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{Mode, Pipeline};
