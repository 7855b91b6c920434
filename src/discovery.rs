use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::PipelineError;

/// A candidate DICOM file found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Path relative to the input root, for progress output.
    pub relative: PathBuf,
    /// Name of the immediate parent directory (recursive scans only).
    pub subject: Option<String>,
}

pub fn is_dicom_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("dcm"))
}

/// Collect `.dcm` files under `root`, sorted by relative path.
///
/// Fails with [`PipelineError::NoInputFiles`] when the root is missing or holds no candidates.
pub fn discover(root: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::NoInputFiles(root.to_path_buf()));
    }

    let mut files = if recursive {
        walk_tree(root)
    } else {
        scan_flat(root)?
    };
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    debug!(root = %root.display(), count = files.len(), recursive, "discovery finished");
    if files.is_empty() {
        return Err(PipelineError::NoInputFiles(root.to_path_buf()));
    }
    Ok(files)
}

fn scan_flat(root: &Path) -> Result<Vec<DiscoveredFile>, PipelineError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_file() && is_dicom_path(&path) {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            files.push(DiscoveredFile {
                path,
                relative,
                subject: None,
            });
        }
    }
    Ok(files)
}

fn walk_tree(root: &Path) -> Vec<DiscoveredFile> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_dicom_path(e.path()))
        .map(|e| {
            let path = e.into_path();
            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            let subject = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned());
            DiscoveredFile {
                path,
                relative,
                subject,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(is_dicom_path(Path::new("a/ecg.dcm")));
        assert!(is_dicom_path(Path::new("a/ECG.DCM")));
        assert!(is_dicom_path(Path::new("a/ecg.Dcm")));
        assert!(!is_dicom_path(Path::new("a/ecg.pdf")));
        assert!(!is_dicom_path(Path::new("a/dcm")));
    }

    #[test]
    fn flat_scan_ignores_nested_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("b.DCM"), b"x").expect("write");
        fs::write(dir.path().join("a.dcm"), b"x").expect("write");
        fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        fs::create_dir(dir.path().join("patient_001")).expect("mkdir");
        fs::write(dir.path().join("patient_001/ecg.dcm"), b"x").expect("write");

        let files = discover(dir.path(), false).expect("discover");
        let names: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a.dcm"), PathBuf::from("b.DCM")]);
        assert!(files.iter().all(|f| f.subject.is_none()));
    }

    #[test]
    fn recursive_scan_records_subject_folder() {
        let dir = tempdir().expect("tempdir");
        for subject in ["patient_002", "patient_001"] {
            fs::create_dir(dir.path().join(subject)).expect("mkdir");
            fs::write(dir.path().join(subject).join("ecg.dcm"), b"x").expect("write");
        }

        let files = discover(dir.path(), true).expect("discover");
        let subjects: Vec<_> = files.iter().filter_map(|f| f.subject.clone()).collect();
        assert_eq!(subjects, vec!["patient_001", "patient_002"]);
    }

    #[test]
    fn empty_or_missing_root_is_reported() {
        let dir = tempdir().expect("tempdir");
        assert!(matches!(
            discover(dir.path(), true),
            Err(PipelineError::NoInputFiles(_))
        ));
        assert!(matches!(
            discover(&dir.path().join("missing"), false),
            Err(PipelineError::NoInputFiles(_))
        ));
    }
}
