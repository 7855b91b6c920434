use dicom_core::{Tag, VR};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::{DefaultDicomObject, InMemDicomObject};

/// Small helper trait to pull values from different DICOM object shapes.
pub trait ElementAccess {
    fn element_str(&self, tag: Tag) -> Option<String>;
    fn element_bytes(&self, tag: Tag) -> Option<Vec<u8>>;
    fn element_vr(&self, tag: Tag) -> Option<VR>;
    fn has_element(&self, tag: Tag) -> bool;
    fn transfer_syntax(&self) -> Option<String>;
}

impl ElementAccess for InMemDicomObject<StandardDataDictionary> {
    fn element_str(&self, tag: Tag) -> Option<String> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_str().ok())
            .map(|s| s.trim_end_matches(&['\0', ' '][..]).to_string())
    }

    fn element_bytes(&self, tag: Tag) -> Option<Vec<u8>> {
        self.element(tag)
            .ok()
            .and_then(|e| e.to_bytes().ok())
            .map(|b| b.into_owned())
    }

    fn element_vr(&self, tag: Tag) -> Option<VR> {
        self.element(tag).ok().map(|e| e.vr())
    }

    fn has_element(&self, tag: Tag) -> bool {
        self.element(tag).is_ok()
    }

    fn transfer_syntax(&self) -> Option<String> {
        None
    }
}

// File objects deref to their dataset; only the transfer syntax comes from the meta group.
impl ElementAccess for DefaultDicomObject {
    fn element_str(&self, tag: Tag) -> Option<String> {
        (**self).element_str(tag)
    }

    fn element_bytes(&self, tag: Tag) -> Option<Vec<u8>> {
        (**self).element_bytes(tag)
    }

    fn element_vr(&self, tag: Tag) -> Option<VR> {
        (**self).element_vr(tag)
    }

    fn has_element(&self, tag: Tag) -> bool {
        (**self).has_element(tag)
    }

    fn transfer_syntax(&self) -> Option<String> {
        Some(
            self.meta()
                .transfer_syntax()
                .trim_end_matches('\0')
                .to_string(),
        )
    }
}
