//
// inspect.rs
// Ecg-Dicom-Prep
//
// Summarizes what a DICOM file carries (patient basics, pixel data, waveform, embedded report).
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{open_file, DefaultDicomObject};
use dicom_pixeldata::PixelDecoder;

use crate::dicom_access::ElementAccess;
use crate::document;
use crate::models::InspectSummary;

const WAVEFORM_SEQUENCE: Tag = Tag(0x5400, 0x0100);

fn number_for_tag<T: ElementAccess>(obj: &T, tag: Tag) -> Option<u32> {
    obj.element_str(tag).and_then(|s| s.trim().parse().ok())
}

pub fn summarize<T: ElementAccess>(obj: &T) -> InspectSummary {
    let document = document::extract_pdf(obj);
    InspectSummary {
        patient_id: obj.element_str(tags::PATIENT_ID),
        patient_name: obj.element_str(tags::PATIENT_NAME),
        modality: obj.element_str(tags::MODALITY),
        manufacturer: obj.element_str(tags::MANUFACTURER),
        sop_class_uid: obj.element_str(tags::SOP_CLASS_UID),
        transfer_syntax: obj.transfer_syntax(),
        has_pixel_data: obj.has_element(tags::PIXEL_DATA),
        rows: number_for_tag(obj, tags::ROWS),
        columns: number_for_tag(obj, tags::COLUMNS),
        has_waveform: obj.has_element(WAVEFORM_SEQUENCE),
        document_bytes: document.as_ref().map(|d| d.len()),
        document_mime: document.and_then(|d| d.mime_type),
    }
}

pub fn read_summary(path: &Path) -> Result<InspectSummary> {
    let obj: DefaultDicomObject = open_file(path).context("Falha ao abrir arquivo DICOM")?;
    Ok(summarize(&obj))
}

pub fn print_info(path: &Path) -> Result<()> {
    let obj: DefaultDicomObject = open_file(path).context("Falha ao abrir arquivo DICOM")?;
    let summary = summarize(&obj);
    let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

    println!("{}", "=".repeat(80));
    println!("DICOM File Information: {}", path.display());
    println!("{}", "=".repeat(80));

    println!("BASICS");
    println!("  Patient ID:      {}", na(&summary.patient_id));
    println!("  Patient Name:    {}", na(&summary.patient_name));
    println!("  Modality:        {}", na(&summary.modality));
    println!("  Manufacturer:    {}", na(&summary.manufacturer));
    println!("  SOP Class:       {}", na(&summary.sop_class_uid));
    println!("  Transfer Syntax: {}", na(&summary.transfer_syntax));

    println!("\nPIXEL DATA");
    if summary.has_pixel_data {
        println!(
            "  present ({} x {})",
            summary.rows.map_or("?".to_string(), |r| r.to_string()),
            summary.columns.map_or("?".to_string(), |c| c.to_string())
        );
        match obj.decode_pixel_data() {
            Ok(decoded) => println!("  decodable, {} frame(s)", decoded.number_of_frames()),
            Err(e) => println!("  not decodable: {}", e),
        }
    } else {
        println!("  absent");
    }

    println!("\nWAVEFORM");
    println!("  {}", if summary.has_waveform { "present" } else { "absent" });

    println!("\nENCAPSULATED DOCUMENT");
    match summary.document_bytes {
        Some(bytes) => {
            println!("  present ({} bytes)", bytes);
            println!("  MIME type: {}", na(&summary.document_mime));
        }
        None => println!("  absent"),
    }

    println!("\nVERDICT");
    let verdict = if summary.document_bytes.is_some() {
        "embedded report found: ready for `process`"
    } else if summary.has_pixel_data {
        "image DICOM without embedded report: not handled by this tool"
    } else if summary.has_waveform {
        "waveform-only DICOM: the trace would have to be plotted, not rasterized"
    } else {
        "metadata only: nothing to convert"
    };
    println!("  {}", verdict);

    Ok(())
}
