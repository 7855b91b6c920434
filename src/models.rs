//
// models.rs
// Ecg-Dicom-Prep
//
// Defines serializable data structures for per-file outcomes, the run report and DICOM inspection summaries.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Expected absence (no embedded document); not an error.
    Skipped,
    Failed,
}

/// What happened to one input file. Never carries original identifying values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub subject: Option<String>,
    pub anon_id: String,
    pub timestamp: String,
    pub status: OutcomeStatus,
    pub failure: Option<FailureKind>,
    pub message: Option<String>,
    pub backend: Option<String>,
    pub original_resolution: Option<String>,
    pub redacted_region: Option<String>,
    pub ai_shape: Option<Vec<usize>>,
    pub ai_dtype: Option<String>,
    pub ai_range: Option<(f32, f32)>,
}

impl FileOutcome {
    pub fn new(file: impl Into<String>, subject: Option<String>, anon_id: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            subject,
            anon_id: anon_id.into(),
            timestamp: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
            status: OutcomeStatus::Failed,
            failure: None,
            message: None,
            backend: None,
            original_resolution: None,
            redacted_region: None,
            ai_shape: None,
            ai_dtype: None,
            ai_range: None,
        }
    }
}

/// Ordered per-file outcomes of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn push(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn successes(&self) -> usize {
        self.count(OutcomeStatus::Success)
    }

    /// Skipped files count as failures in the tally, as the conversion produced nothing.
    pub fn failures(&self) -> usize {
        self.total() - self.successes()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write report to {:?}", path))
    }
}

/// Quick look at a DICOM file, as printed by `inspect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectSummary {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub modality: Option<String>,
    pub manufacturer: Option<String>,
    pub sop_class_uid: Option<String>,
    pub transfer_syntax: Option<String>,
    pub has_pixel_data: bool,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub has_waveform: bool,
    pub document_bytes: Option<usize>,
    pub document_mime: Option<String>,
}
