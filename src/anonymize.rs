//
// anonymize.rs
// Ecg-Dicom-Prep
//
// Replaces identifying attributes with fixed values and issues synthetic per-run identifiers.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::value::PrimitiveValue;
use dicom::core::{DataElement, Tag, VR};
use dicom::dictionary_std::{tags, StandardDataDictionary};
use dicom::object::{DefaultDicomObject, InMemDicomObject};
use tracing::debug;

use crate::error::PipelineError;

pub const FIXED_DATE: &str = "20000101";
pub const FIXED_TIME: &str = "000000";

/// How a present identifying attribute gets overwritten, chosen from its VR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    FixedDate,
    FixedTime,
    Placeholder,
}

impl Rule {
    pub fn for_vr(vr: VR) -> Self {
        match vr {
            VR::DA => Rule::FixedDate,
            VR::TM => Rule::FixedTime,
            _ => Rule::Placeholder,
        }
    }
}

/// Identifying attributes to scrub, plus the text used for non-temporal values.
#[derive(Debug, Clone)]
pub struct AnonymizationPolicy {
    pub fields: Vec<(Tag, &'static str)>,
    pub placeholder: String,
}

impl Default for AnonymizationPolicy {
    fn default() -> Self {
        Self::with_placeholder("ANONYMIZED")
    }
}

impl AnonymizationPolicy {
    pub fn with_placeholder(placeholder: impl Into<String>) -> Self {
        let fields = vec![
            (tags::PATIENT_ID, "PatientID"),
            (tags::PATIENT_NAME, "PatientName"),
            (tags::PATIENT_SEX, "PatientSex"),
            (tags::PATIENT_BIRTH_DATE, "PatientBirthDate"),
            (tags::PATIENT_AGE, "PatientAge"),
            (tags::ETHNIC_GROUP, "EthnicGroup"),
            (tags::REFERRING_PHYSICIAN_NAME, "ReferringPhysicianName"),
            (tags::INSTITUTION_NAME, "InstitutionName"),
            (tags::INSTITUTION_ADDRESS, "InstitutionAddress"),
            (tags::STUDY_DATE, "StudyDate"),
            (tags::SERIES_DATE, "SeriesDate"),
            (tags::ACQUISITION_DATE, "AcquisitionDate"),
            (tags::CONTENT_DATE, "ContentDate"),
            (tags::PATIENT_ADDRESS, "PatientAddress"),
            (tags::PATIENT_TELEPHONE_NUMBERS, "PatientTelephoneNumbers"),
            (tags::ACCESSION_NUMBER, "AccessionNumber"),
            (tags::STUDY_ID, "StudyID"),
        ];
        Self {
            fields,
            placeholder: placeholder.into(),
        }
    }

    fn replacement(&self, rule: Rule) -> &str {
        match rule {
            Rule::FixedDate => FIXED_DATE,
            Rule::FixedTime => FIXED_TIME,
            Rule::Placeholder => &self.placeholder,
        }
    }
}

/// Synthetic identifiers assigned to record `counter` of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticIds {
    pub counter: u32,
    pub patient_id: String,
    pub patient_name: String,
}

impl SyntheticIds {
    pub fn new(counter: u32) -> Self {
        Self {
            counter,
            patient_id: format!("ANON_{:04}", counter),
            patient_name: format!("ANONIMIZADO_{:04}", counter),
        }
    }
}

/// Scrub the policy's attributes in place, then stamp the synthetic ID and name.
///
/// Only attributes already present are touched by the table pass; PatientID and
/// PatientName are always written afterwards and win over the table.
pub fn anonymize(
    obj: &mut InMemDicomObject<StandardDataDictionary>,
    policy: &AnonymizationPolicy,
    counter: u32,
) -> SyntheticIds {
    let mut replaced = 0usize;
    for (tag, keyword) in &policy.fields {
        let Ok(element) = obj.element(*tag) else {
            continue;
        };
        let vr = element.vr();
        let value = policy.replacement(Rule::for_vr(vr)).to_string();
        obj.put(DataElement::new(*tag, vr, PrimitiveValue::from(value)));
        debug!(keyword = *keyword, ?vr, "attribute anonymized");
        replaced += 1;
    }

    let ids = SyntheticIds::new(counter);
    obj.put(DataElement::new(
        tags::PATIENT_ID,
        VR::LO,
        PrimitiveValue::from(ids.patient_id.as_str()),
    ));
    obj.put(DataElement::new(
        tags::PATIENT_NAME,
        VR::PN,
        PrimitiveValue::from(ids.patient_name.as_str()),
    ));

    debug!(replaced, id = %ids.patient_id, "metadata anonymized");
    ids
}

/// Persist the anonymized record as a standalone DICOM file.
pub fn save_anonymized(obj: &DefaultDicomObject, output: &Path) -> Result<(), PipelineError> {
    obj.write_to_file(output)
        .map_err(|e| PipelineError::Dicom(e.to_string()))
}
