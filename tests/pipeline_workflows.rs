//
// pipeline_workflows.rs
// Ecg-Dicom-Prep
//
// Integration-style tests driving whole runs over synthetic encapsulated-PDF DICOMs with scripted rasterizers.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, StandardDataDictionary};
use dicom::object::{open_file, FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use ecg_dicom_prep::config::PipelineConfig;
use ecg_dicom_prep::dicom_access::ElementAccess;
use ecg_dicom_prep::discovery;
use ecg_dicom_prep::error::{FailureKind, PipelineError, RasterError};
use ecg_dicom_prep::font::FontFace;
use ecg_dicom_prep::inspect;
use ecg_dicom_prep::models::{OutcomeStatus, RunReport};
use ecg_dicom_prep::output::{png_dpi, Artifact};
use ecg_dicom_prep::raster::{PageRasterizer, RasterizedPage, RasterizerChain};
use ecg_dicom_prep::{Mode, Pipeline};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::ArrayD;
use tempfile::{tempdir, TempDir};

const ENCAPSULATED_PDF_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.104.1";
// Even length keeps the OB value free of padding.
const FAKE_PDF: &[u8] = b"%PDF-1.4\n%%EOF\n\n";

/// Renders a fixed page regardless of input, like a real backend would for a one-page report.
struct ScriptedRasterizer {
    width: u32,
    height: u32,
    dpi: Option<f32>,
}

impl PageRasterizer for ScriptedRasterizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(&self, pdf: &[u8], _dpi: u32) -> Result<RasterizedPage, RasterError> {
        assert!(pdf.starts_with(b"%PDF"), "pipeline must hand over the PDF payload");
        let mut page = RgbImage::from_pixel(self.width, self.height, Rgb([255, 255, 255]));
        // A trace line through the middle of the page.
        let mid = self.height / 2;
        for x in 0..self.width {
            page.put_pixel(x, mid, Rgb([0, 0, 0]));
        }
        Ok(RasterizedPage {
            image: DynamicImage::ImageRgb8(page),
            dpi: self.dpi.map(|d| (d, d)),
            backend: "scripted",
        })
    }
}

struct BrokenRasterizer;

impl PageRasterizer for BrokenRasterizer {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(&self, _pdf: &[u8], _dpi: u32) -> Result<RasterizedPage, RasterError> {
        Err(RasterError::Failed {
            backend: "broken",
            reason: "corrupt xref table".to_string(),
        })
    }
}

fn good_page() -> ScriptedRasterizer {
    ScriptedRasterizer {
        width: 1700,
        height: 1300,
        dpi: Some(200.0),
    }
}

fn small_page() -> ScriptedRasterizer {
    ScriptedRasterizer {
        width: 612,
        height: 792,
        dpi: Some(72.0),
    }
}

fn write_ecg_dicom(path: &Path, patient: &str, with_pdf: bool) {
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from(patient),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_ID,
        VR::LO,
        PrimitiveValue::from("12345678"),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_BIRTH_DATE,
        VR::DA,
        PrimitiveValue::from("19571203"),
    ));
    obj.put(DataElement::new(
        tags::INSTITUTION_NAME,
        VR::LO,
        PrimitiveValue::from("Hospital Central"),
    ));
    obj.put(DataElement::new(
        tags::STUDY_DATE,
        VR::DA,
        PrimitiveValue::from("20240101"),
    ));
    obj.put(DataElement::new(
        tags::MODALITY,
        VR::CS,
        PrimitiveValue::from("ECG"),
    ));
    obj.put(DataElement::new(
        tags::SOP_CLASS_UID,
        VR::UI,
        PrimitiveValue::from(ENCAPSULATED_PDF_STORAGE),
    ));
    obj.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from("1.2.826.0.1.3680043.2.1125.1"),
    ));

    if with_pdf {
        obj.put(DataElement::new(
            Tag(0x0042, 0x0012),
            VR::LO,
            PrimitiveValue::from("application/pdf"),
        ));
        obj.put(DataElement::new(
            Tag(0x0042, 0x0011),
            VR::OB,
            PrimitiveValue::from(FAKE_PDF.to_vec()),
        ));
    }

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(ENCAPSULATED_PDF_STORAGE)
        .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

fn input_dir() -> TempDir {
    tempdir().expect("tempdir")
}

fn run(input: &Path, output: &Path, mode: Mode, rasterizer: Box<dyn PageRasterizer>) -> (Pipeline, RunReport) {
    let chain = RasterizerChain::new(vec![rasterizer]);
    let pipeline = Pipeline::with_rasterizers(PipelineConfig::default(), mode, output, chain)
        .with_font(FontFace::Bitmap);
    pipeline.prepare().expect("prepare output");
    let files = discovery::discover(input, false).expect("discover");
    let report = pipeline.run(&files);
    (pipeline, report)
}

fn artifact(pipeline: &Pipeline, id: &str, artifact: Artifact) -> PathBuf {
    pipeline.output().path_for(id, artifact)
}

#[test]
fn full_run_writes_every_artifact() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (pipeline, report) = run(input.path(), out.path(), Mode::Full, Box::new(good_page()));

    assert_eq!(report.total(), 1);
    assert_eq!(report.successes(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.anon_id, "ANON_0001");
    assert_eq!(outcome.backend.as_deref(), Some("scripted"));
    assert_eq!(outcome.original_resolution.as_deref(), Some("1700x1300"));
    assert_eq!(outcome.redacted_region.as_deref(), Some("340x325"));
    assert_eq!(outcome.ai_shape, Some(vec![224, 224, 3]));
    assert_eq!(outcome.ai_dtype.as_deref(), Some("float32"));

    for kind in Artifact::ALL {
        let path = artifact(&pipeline, "ANON_0001", kind);
        assert!(path.is_file(), "missing {:?}", path);
    }

    let original = image::open(artifact(&pipeline, "ANON_0001", Artifact::OriginalPng)).expect("original");
    assert_eq!((original.width(), original.height()), (1700, 1300));

    let redacted = image::open(artifact(&pipeline, "ANON_0001", Artifact::AnonymizedPng))
        .expect("redacted")
        .to_rgb8();
    assert_eq!(redacted.dimensions(), (1700, 1300));
    // Corner of the region is black; outside it the page is untouched.
    assert_eq!(redacted.get_pixel(339, 324), &Rgb([0, 0, 0]));
    assert_eq!(redacted.get_pixel(1600, 100), &Rgb([255, 255, 255]));

    // Saved pages carry the render resolution.
    for kind in [Artifact::OriginalPng, Artifact::AnonymizedPng] {
        let dpi = png_dpi(&artifact(&pipeline, "ANON_0001", kind)).expect("pHYs chunk");
        assert!((dpi - 200.0).abs() < 0.5, "{:?} saved at {} DPI", kind, dpi);
    }

    let for_ai = image::open(artifact(&pipeline, "ANON_0001", Artifact::ForAiPng)).expect("for ai");
    assert_eq!((for_ai.width(), for_ai.height()), (224, 224));

    let array: ArrayD<f32> =
        ndarray_npy::read_npy(artifact(&pipeline, "ANON_0001", Artifact::Array)).expect("npy");
    assert_eq!(array.shape(), &[224, 224, 3]);
    assert!(array.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn anonymized_dicom_holds_no_original_identity() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (pipeline, _) = run(input.path(), out.path(), Mode::Full, Box::new(good_page()));

    let obj = open_file(artifact(&pipeline, "ANON_0001", Artifact::AnonymizedDicom)).expect("open");
    assert_eq!(obj.element_str(tags::PATIENT_ID).as_deref(), Some("ANON_0001"));
    assert_eq!(obj.element_str(tags::PATIENT_NAME).as_deref(), Some("ANONIMIZADO_0001"));
    assert_eq!(obj.element_str(tags::PATIENT_BIRTH_DATE).as_deref(), Some("20000101"));
    assert_eq!(obj.element_str(tags::STUDY_DATE).as_deref(), Some("20000101"));
    assert_eq!(obj.element_str(tags::INSTITUTION_NAME).as_deref(), Some("ANONYMIZED"));
    // Non-identifying attributes survive.
    assert_eq!(obj.element_str(tags::MODALITY).as_deref(), Some("ECG"));
    assert!(obj.has_element(Tag(0x0042, 0x0011)));

    let raw = fs::read(artifact(&pipeline, "ANON_0001", Artifact::AnonymizedDicom)).expect("read");
    let haystack = String::from_utf8_lossy(&raw);
    assert!(!haystack.contains("Silva"));
    assert!(!haystack.contains("12345678"));
    assert!(!haystack.contains("Hospital Central"));
}

#[test]
fn file_without_document_is_skipped() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("waveform_only.dcm"), "Souza^Joao", false);
    let out = tempdir().expect("out");

    let (pipeline, report) = run(input.path(), out.path(), Mode::Full, Box::new(good_page()));

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, OutcomeStatus::Skipped);
    assert_eq!(outcome.failure, Some(FailureKind::MissingDocument));
    assert_eq!(report.successes(), 0);
    assert_eq!(report.failures(), 1);

    // The anonymized DICOM precedes extraction; nothing image-derived is written.
    assert!(artifact(&pipeline, "ANON_0001", Artifact::AnonymizedDicom).is_file());
    for kind in [
        Artifact::OriginalPng,
        Artifact::AnonymizedPng,
        Artifact::ForAiPng,
        Artifact::Array,
    ] {
        assert!(!artifact(&pipeline, "ANON_0001", kind).exists());
    }
}

#[test]
fn low_quality_page_is_rejected_in_full_mode() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (pipeline, report) = run(input.path(), out.path(), Mode::Full, Box::new(small_page()));

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, OutcomeStatus::Failed);
    assert_eq!(outcome.failure, Some(FailureKind::QualityRejected));
    assert_eq!(outcome.original_resolution.as_deref(), Some("612x792"));
    assert!(!artifact(&pipeline, "ANON_0001", Artifact::OriginalPng).exists());
    assert!(!artifact(&pipeline, "ANON_0001", Artifact::Array).exists());
}

#[test]
fn redact_only_mode_skips_quality_gate_and_ai_outputs() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (pipeline, report) = run(input.path(), out.path(), Mode::RedactOnly, Box::new(small_page()));

    assert_eq!(report.successes(), 1);
    let redacted = artifact(&pipeline, "ANON_0001", Artifact::AnonymizedPng);
    assert!(redacted.is_file());
    let image = image::open(&redacted).expect("redacted").to_rgb8();
    assert_eq!(image.dimensions(), (612, 792));
    assert_eq!(image.get_pixel(0, 0), &Rgb([0, 0, 0]));
    let dpi = png_dpi(&redacted).expect("pHYs chunk");
    assert!((dpi - 72.0).abs() < 0.5);

    assert!(!artifact(&pipeline, "ANON_0001", Artifact::AnonymizedDicom).exists());
    assert!(!pipeline.output().dir_for(Artifact::ForAiPng).exists());
    assert!(!pipeline.output().dir_for(Artifact::OriginalPng).exists());
}

#[test]
fn failures_are_isolated_and_ids_keep_increasing() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("a_first.dcm"), "Silva^Maria", true);
    fs::write(input.path().join("b_corrupt.dcm"), b"definitely not a DICOM file").expect("write");
    write_ecg_dicom(&input.path().join("c_third.dcm"), "Souza^Joao", true);
    let out = tempdir().expect("out");

    let (pipeline, report) = run(input.path(), out.path(), Mode::RedactOnly, Box::new(good_page()));

    let ids: Vec<_> = report.outcomes.iter().map(|o| o.anon_id.as_str()).collect();
    assert_eq!(ids, ["ANON_0001", "ANON_0002", "ANON_0003"]);
    let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        [OutcomeStatus::Success, OutcomeStatus::Failed, OutcomeStatus::Success]
    );
    assert_eq!(report.outcomes[1].failure, Some(FailureKind::Parse));
    assert_eq!(report.successes(), 2);
    assert_eq!(report.failures(), 1);

    assert!(artifact(&pipeline, "ANON_0001", Artifact::AnonymizedPng).is_file());
    assert!(!artifact(&pipeline, "ANON_0002", Artifact::AnonymizedPng).exists());
    assert!(artifact(&pipeline, "ANON_0003", Artifact::AnonymizedPng).is_file());
}

#[test]
fn rasterizer_failure_is_reported_per_file() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (_, report) = run(input.path(), out.path(), Mode::Full, Box::new(BrokenRasterizer));

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.failure, Some(FailureKind::Rasterization));
    assert!(outcome
        .message
        .as_deref()
        .unwrap_or_default()
        .contains("corrupt xref table"));
}

#[test]
fn report_never_carries_original_identity() {
    let input = input_dir();
    write_ecg_dicom(&input.path().join("ecg.dcm"), "Silva^Maria", true);
    let out = tempdir().expect("out");

    let (_, report) = run(input.path(), out.path(), Mode::Full, Box::new(good_page()));
    let report_path = out.path().join("report.json");
    report.write_json(&report_path).expect("write report");

    let text = fs::read_to_string(&report_path).expect("read report");
    assert!(text.contains("ANON_0001"));
    assert!(!text.contains("Silva"));
    assert!(!text.contains("12345678"));
}

#[test]
fn empty_input_is_a_run_level_error() {
    let input = input_dir();
    fs::write(input.path().join("notes.txt"), b"no dicoms here").expect("write");

    match discovery::discover(input.path(), false) {
        Err(PipelineError::NoInputFiles(path)) => assert_eq!(path, input.path()),
        other => panic!("expected NoInputFiles, got {:?}", other.map(|f| f.len())),
    }
}

#[test]
fn recursive_run_tracks_patient_folders() {
    let input = input_dir();
    for subject in ["paciente_001", "paciente_002"] {
        let dir = input.path().join(subject);
        fs::create_dir_all(&dir).expect("mkdir");
        write_ecg_dicom(&dir.join("ecg.dcm"), "Silva^Maria", true);
    }

    let files = discovery::discover(input.path(), true).expect("discover");
    let subjects: Vec<_> = files.iter().map(|f| f.subject.as_deref()).collect();
    assert_eq!(subjects, [Some("paciente_001"), Some("paciente_002")]);
}

#[test]
fn inspect_reports_embedded_document() {
    let input = input_dir();
    let path = input.path().join("ecg.dcm");
    write_ecg_dicom(&path, "Silva^Maria", true);

    let summary = inspect::read_summary(&path).expect("summary");
    assert_eq!(summary.modality.as_deref(), Some("ECG"));
    assert_eq!(summary.sop_class_uid.as_deref(), Some(ENCAPSULATED_PDF_STORAGE));
    assert_eq!(summary.document_bytes, Some(FAKE_PDF.len()));
    assert_eq!(summary.document_mime.as_deref(), Some("application/pdf"));
    assert!(!summary.has_pixel_data);
    assert!(!summary.has_waveform);
}
