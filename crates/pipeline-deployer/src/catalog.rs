//! Discovery of locally compiled pipeline definitions.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CatalogError;

/// File suffixes recognised as compiled pipeline definitions.
pub const PIPELINE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// A compiled pipeline definition found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineArtifact {
    /// Pipeline name, derived from the file name.
    pub name: String,
    pub path: PathBuf,
}

impl PipelineArtifact {
    /// Build an artifact from a path, or `None` if the extension is not recognised.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = pipeline_name_from_path(&path)?;
        Some(PipelineArtifact { name, path })
    }
}

/// Strip one recognised extension from the file name.
///
/// `hello_pipeline.yaml` → `hello_pipeline`; `notes.txt` → `None`.
pub fn pipeline_name_from_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !PIPELINE_EXTENSIONS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// List the compiled pipeline definitions directly inside `dir`.
///
/// Fails with `CatalogError::NotFound` when `dir` is missing. An existing
/// directory without definitions yields an empty list. Results are sorted by
/// file name.
pub fn scan_catalog(dir: &Path) -> Result<Vec<PipelineArtifact>, CatalogError> {
    if !dir.is_dir() {
        return Err(CatalogError::NotFound(dir.to_path_buf()));
    }

    let mut artifacts = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(artifact) = PipelineArtifact::from_path(path) {
            artifacts.push(artifact);
        }
    }
    artifacts.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

    if artifacts.is_empty() {
        warn!(dir = %dir.display(), "No YAML pipeline files found");
    } else {
        debug!(dir = %dir.display(), count = artifacts.len(), "Found pipeline files");
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"pipelineSpec: {}\n").unwrap();
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("compiled_pipelines");

        let err = scan_catalog(&missing).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_file_instead_of_directory_is_not_found() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "a.yaml");

        let err = scan_catalog(&dir.path().join("a.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn test_empty_directory_is_empty_list() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "README.md");

        assert!(scan_catalog(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_both_extensions_sorted_by_name() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "b.yml");
        touch(dir.path(), "c.json");
        touch(dir.path(), "a.yaml");
        std::fs::create_dir(dir.path().join("nested.yaml")).unwrap();

        let names: Vec<String> = scan_catalog(dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_pipeline_name_strips_only_the_suffix() {
        assert_eq!(
            pipeline_name_from_path(Path::new("out/hello_pipeline.yaml")),
            Some("hello_pipeline".to_string())
        );
        assert_eq!(
            pipeline_name_from_path(Path::new("train.v2.yml")),
            Some("train.v2".to_string())
        );
        assert_eq!(pipeline_name_from_path(Path::new("notes.txt")), None);
        assert_eq!(pipeline_name_from_path(Path::new("noext")), None);
    }
}
