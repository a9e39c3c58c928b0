use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use fragment_catalog::Batch;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadManifestError {
    #[error("duplicate batch label {0}")]
    DuplicateLabel(String),
    #[error("invalid manifest")]
    Json(#[from] serde_json::Error),
    #[error("io error")]
    IoError(#[from] std::io::Error),
}

/// Read a batch manifest of the form `[{"label": "2020-01", "files": ["a.txt", ...]}, ...]`.
///
/// Relative file paths are resolved against the directory of the manifest.
pub fn read_manifest<P>(path: P) -> Result<Vec<Batch>, ReadManifestError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_manifest(BufReader::new(file), base)
}

/// Parse a manifest, resolving relative file paths against `base`.
pub fn parse_manifest<R: Read>(reader: R, base: &Path) -> Result<Vec<Batch>, ReadManifestError> {
    let mut batches: Vec<Batch> = serde_json::from_reader(reader)?;

    let mut labels = HashSet::new();
    for batch in &mut batches {
        if !labels.insert(batch.label.clone()) {
            return Err(ReadManifestError::DuplicateLabel(batch.label.clone()));
        }
        for file in &mut batch.files {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
    }
    Ok(batches)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn relative_paths_are_resolved() {
        let manifest = r#"[
            {"label": "2020-01", "files": ["a.txt", "/abs/b.txt"]},
            {"label": "2020-02", "files": []}
        ]"#;
        let batches = parse_manifest(manifest.as_bytes(), Path::new("/data")).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].files, [PathBuf::from("/data/a.txt"), PathBuf::from("/abs/b.txt")]);
        assert_eq!(batches[1], Batch::new("2020-02", Vec::<PathBuf>::new()));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let manifest = r#"[{"label": "2020-01", "files": []}, {"label": "2020-01", "files": []}]"#;
        let err = parse_manifest(manifest.as_bytes(), Path::new("")).unwrap_err();
        assert!(matches!(err, ReadManifestError::DuplicateLabel(label) if label == "2020-01"));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let err = parse_manifest(r#"{"label": "2020-01"}"#.as_bytes(), Path::new("")).unwrap_err();
        assert!(matches!(err, ReadManifestError::Json(_)));
    }
}
