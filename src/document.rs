//
// document.rs
// Ecg-Dicom-Prep
//
// Locates the encapsulated PDF payload inside a parsed DICOM object.
//
// Thales Matheus Mendonça Santos - November 2025

use dicom::core::Tag;
use tracing::warn;

use crate::dicom_access::ElementAccess;

pub const PDF_MIME_TYPE: &str = "application/pdf";

pub const ENCAPSULATED_DOCUMENT: Tag = Tag(0x0042, 0x0011);
pub const MIME_TYPE_OF_ENCAPSULATED_DOCUMENT: Tag = Tag(0x0042, 0x0012);
pub const ENCAPSULATED_DOCUMENT_LENGTH: Tag = Tag(0x0042, 0x0015);

/// Encapsulated document payload pulled out of a DICOM record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedDocument {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl EmbeddedDocument {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn looks_like_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

/// Read the Encapsulated Document (0042,0011) blob, if the record carries one.
///
/// When Encapsulated Document Length (0042,0015) is present the even-length pad is dropped.
pub fn extract_pdf<T: ElementAccess>(obj: &T) -> Option<EmbeddedDocument> {
    let mut bytes = obj.element_bytes(ENCAPSULATED_DOCUMENT)?;

    let declared_len = obj
        .element_str(ENCAPSULATED_DOCUMENT_LENGTH)
        .and_then(|s| s.trim().parse::<usize>().ok());
    if let Some(len) = declared_len {
        if len > 0 && len < bytes.len() {
            bytes.truncate(len);
        }
    }

    let mime_type = obj.element_str(MIME_TYPE_OF_ENCAPSULATED_DOCUMENT);
    if let Some(mime) = mime_type.as_deref() {
        if !mime.eq_ignore_ascii_case(PDF_MIME_TYPE) {
            warn!(mime, "encapsulated document is not declared as PDF");
        }
    }

    let document = EmbeddedDocument { bytes, mime_type };
    if document.is_empty() {
        return None;
    }
    if !document.looks_like_pdf() {
        // Still handed to the rasterizers, which report the real failure.
        warn!(bytes = document.len(), "encapsulated document does not start with a PDF header");
    }
    Some(document)
}
