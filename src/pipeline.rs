//
// pipeline.rs
// Ecg-Dicom-Prep
//
// Drives each discovered DICOM through anonymization, PDF rasterization, redaction and AI pre-processing.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::object::open_file;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::anonymize::{self, AnonymizationPolicy, SyntheticIds};
use crate::config::PipelineConfig;
use crate::discovery::DiscoveredFile;
use crate::document;
use crate::error::PipelineError;
use crate::font::{self, FontFace};
use crate::models::{FileOutcome, OutcomeStatus, RunReport};
use crate::output::{self, Artifact, OutputTree};
use crate::preprocess;
use crate::quality;
use crate::raster::RasterizerChain;
use crate::redact;

/// Which artifacts a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Anonymized DICOM, original and redacted PNGs, AI canvas and array, behind the quality gate.
    Full,
    /// Redacted PNG only; no quality gate, no DICOM or AI artifacts.
    RedactOnly,
}

impl Mode {
    pub fn artifacts(self, save_dicom: bool) -> Vec<Artifact> {
        match self {
            Mode::Full if save_dicom => Artifact::ALL.to_vec(),
            Mode::Full => Artifact::ALL
                .into_iter()
                .filter(|a| *a != Artifact::AnonymizedDicom)
                .collect(),
            Mode::RedactOnly => vec![Artifact::AnonymizedPng],
        }
    }
}

/// Per-file progress; any stage may end in a terminal failure instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovered,
    Parsed,
    MetadataAnonymized,
    PdfExtracted,
    Rasterized,
    Validated,
    Redacted,
    Preprocessed,
    Persisted,
}

pub struct Pipeline {
    config: PipelineConfig,
    mode: Mode,
    policy: AnonymizationPolicy,
    rasterizers: RasterizerChain,
    font: FontFace,
    output: OutputTree,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, mode: Mode, output_root: &Path) -> Self {
        let rasterizers = RasterizerChain::from_config(&config.backends);
        Self::with_rasterizers(config, mode, output_root, rasterizers)
    }

    pub fn with_rasterizers(
        config: PipelineConfig,
        mode: Mode,
        output_root: &Path,
        rasterizers: RasterizerChain,
    ) -> Self {
        let strategies = font::default_strategies(config.redaction.font_path.as_deref());
        let font = font::resolve(&strategies);
        let policy = AnonymizationPolicy::with_placeholder(config.anonymization.placeholder.clone());
        let output = OutputTree::new(output_root, &config.output);
        Self {
            config,
            mode,
            policy,
            rasterizers,
            font,
            output,
        }
    }

    /// Replace the resolved label font.
    pub fn with_font(mut self, font: FontFace) -> Self {
        self.font = font;
        self
    }

    pub fn output(&self) -> &OutputTree {
        &self.output
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Create the output folders this mode writes to.
    pub fn prepare(&self) -> anyhow::Result<()> {
        self.output.create(&self.mode.artifacts(self.config.save_dicom))
    }

    /// Process every file in order. Failures are isolated to their file.
    pub fn run(&self, files: &[DiscoveredFile]) -> RunReport {
        let mut report = RunReport::default();
        for (index, file) in files.iter().enumerate() {
            let counter = index as u32 + 1;
            println!("{}", "=".repeat(80));
            println!("[{}/{}] {}", counter, files.len(), file.relative.display());
            println!("{}", "=".repeat(80));

            let outcome = self.process_file(file, counter);
            match outcome.status {
                OutcomeStatus::Success => info!(id = %outcome.anon_id, "file processed"),
                OutcomeStatus::Skipped => warn!(
                    id = %outcome.anon_id,
                    reason = outcome.message.as_deref().unwrap_or_default(),
                    "file skipped"
                ),
                OutcomeStatus::Failed => error!(
                    id = %outcome.anon_id,
                    error = outcome.message.as_deref().unwrap_or_default(),
                    "file failed"
                ),
            }
            report.push(outcome);
        }
        report
    }

    /// Run all stages for one file. Always returns an outcome; errors are recorded in it.
    pub fn process_file(&self, file: &DiscoveredFile, counter: u32) -> FileOutcome {
        let ids = SyntheticIds::new(counter);
        let name = file
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut outcome = FileOutcome::new(name, file.subject.clone(), ids.patient_id.as_str());
        self.advance(&outcome.anon_id, Stage::Discovered);

        match self.run_stages(file, counter, &mut outcome) {
            Ok(()) => outcome.status = OutcomeStatus::Success,
            Err(e) => {
                outcome.status = match e {
                    PipelineError::MissingDocument => OutcomeStatus::Skipped,
                    _ => OutcomeStatus::Failed,
                };
                outcome.failure = Some(e.kind());
                outcome.message = Some(e.to_string());
            }
        }
        outcome
    }

    fn run_stages(
        &self,
        file: &DiscoveredFile,
        counter: u32,
        outcome: &mut FileOutcome,
    ) -> Result<(), PipelineError> {
        let mut obj = open_file(&file.path).map_err(|e| PipelineError::Parse(e.to_string()))?;
        self.advance(&outcome.anon_id, Stage::Parsed);

        let ids = anonymize::anonymize(&mut obj, &self.policy, counter);
        self.advance(&ids.patient_id, Stage::MetadataAnonymized);
        if self.mode == Mode::Full && self.config.save_dicom {
            let path = self.output.path_for(&ids.patient_id, Artifact::AnonymizedDicom);
            anonymize::save_anonymized(&obj, &path)?;
            info!(path = %path.display(), "anonymized DICOM saved");
        }

        let doc = document::extract_pdf(&obj).ok_or(PipelineError::MissingDocument)?;
        info!(bytes = doc.len(), "embedded PDF extracted");
        self.advance(&ids.patient_id, Stage::PdfExtracted);
        // The parsed record is no longer needed once the payload is out.
        drop(obj);

        let page = self
            .rasterizers
            .rasterize(&doc.bytes, self.config.render_dpi)
            .map_err(|e| {
                error!("no rasterizer succeeded; install PDFium (or set PDFIUM_DYNAMIC_LIB_PATH) or poppler's pdftoppm");
                e
            })?;
        let page_dpi = page
            .dpi
            .map(|(x, y)| ((x + y) / 2.0).round() as u32)
            .unwrap_or(self.config.render_dpi);
        outcome.backend = Some(page.backend.to_string());
        outcome.original_resolution = Some(page.resolution());
        info!(backend = page.backend, resolution = %page.resolution(), "PDF rasterized");
        self.advance(&ids.patient_id, Stage::Rasterized);

        if self.mode == Mode::Full {
            let report = quality::validate(&page, self.config.min_dpi, self.config.min_size);
            if report.rejected() {
                return Err(PipelineError::QualityRejected {
                    dpi: report.dpi,
                    resolution: report.resolution,
                });
            }
            if report.accepted_by_size_only(self.config.min_dpi) {
                warn!(
                    dpi = report.dpi,
                    resolution = %report.resolution,
                    "DPI below minimum, accepted on pixel size"
                );
            }
            self.advance(&ids.patient_id, Stage::Validated);

            let path = self.output.path_for(&ids.patient_id, Artifact::OriginalPng);
            output::save_png(&page.image.to_rgb8(), &path, page_dpi)?;
            info!(path = %path.display(), "original rendering saved");
        }

        let (redacted, region) = redact::redact(&page.image, &self.config.redaction, &self.font);
        outcome.redacted_region = Some(format!("{}x{}", region.width, region.height));
        self.advance(&ids.patient_id, Stage::Redacted);

        let path = self.output.path_for(&ids.patient_id, Artifact::AnonymizedPng);
        output::save_png(&redacted, &path, page_dpi)?;
        info!(path = %path.display(), region = ?region, "redacted image saved");

        if self.mode == Mode::Full {
            let artifact = preprocess::preprocess(&DynamicImage::ImageRgb8(redacted), &self.config.ai)?;
            outcome.ai_shape = Some(artifact.array.shape());
            outcome.ai_dtype = Some(artifact.array.dtype().to_string());
            outcome.ai_range = Some(artifact.array.value_range());
            self.advance(&ids.patient_id, Stage::Preprocessed);

            let image_path = self.output.path_for(&ids.patient_id, Artifact::ForAiPng);
            artifact.image.save(&image_path)?;
            let array_path = self.output.path_for(&ids.patient_id, Artifact::Array);
            artifact.array.write_npy(&array_path)?;
            info!(
                shape = ?artifact.array.shape(),
                dtype = artifact.array.dtype(),
                "AI artifacts saved"
            );
        }

        self.advance(&ids.patient_id, Stage::Persisted);
        Ok(())
    }

    fn advance(&self, record: &str, stage: Stage) {
        debug!(record, ?stage, "stage reached");
    }
}
