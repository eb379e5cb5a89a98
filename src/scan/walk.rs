// src/scan/walk.rs
// =============================================================================
// Lists the documents under a directory.
//
// `walkdir` does the recursion. The order it visits entries in depends on
// the filesystem, so the result is sorted before anyone sees it: two runs
// over the same tree always process files in the same order.
// =============================================================================

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::IgnoreRules;
use crate::error::ScanError;

// Fails unless `path` exists and is a directory
pub fn ensure_directory(path: &Path) -> Result<(), ScanError> {
    let metadata = std::fs::metadata(path).map_err(|_| ScanError::Missing(path.to_path_buf()))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

// Is this file a Markdown document?
pub fn is_document(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("md")
}

// Every document under `root` not matched by `ignore`, sorted
pub fn list_documents(root: &Path, ignore: &IgnoreRules) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_document(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        if ignore.matches(&path.to_string_lossy()) {
            tracing::debug!("ignoring file {}", path.display());
            continue;
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}
