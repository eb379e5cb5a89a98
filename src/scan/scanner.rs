// src/scan/scanner.rs
// =============================================================================
// The scanner: documentation tree in, LinkRecords out.
//
// Files are processed one at a time in sorted order. A file that can't be
// read aborts the whole scan, there are no partial results.
// =============================================================================

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use super::walk::{ensure_directory, list_documents};
use super::IgnoreRules;
use crate::error::ScanError;
use crate::link::LinkRecord;
use crate::render::{hrefs, Renderer};

pub struct Scanner {
    renderer: Arc<dyn Renderer>,
    ignore_files: IgnoreRules,
    ignore_links: IgnoreRules,
}

impl Scanner {
    pub fn new(renderer: Arc<dyn Renderer>, ignore_files: IgnoreRules, ignore_links: IgnoreRules) -> Self {
        Self {
            renderer,
            ignore_files,
            ignore_links,
        }
    }

    // Scans every document under `root`
    //
    // Returns: records grouped by file (files in sorted order), one record
    // per unique link in each file
    pub fn process(&self, root: &Path) -> Result<Vec<LinkRecord>, ScanError> {
        ensure_directory(root)?;

        let files = list_documents(root, &self.ignore_files)?;
        tracing::info!("found {} document(s) under {}", files.len(), root.display());

        let mut records = Vec::new();
        for file in &files {
            let found = self.process_file(file)?;
            tracing::debug!("{} link(s) found in {}", found.len(), file.display());
            records.extend(found);
        }

        Ok(records)
    }

    fn process_file(&self, path: &Path) -> Result<Vec<LinkRecord>, ScanError> {
        let payload = std::fs::read(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let html = self.renderer.render(&payload);
        let links = self.extract_links(&html);

        Ok(links
            .into_iter()
            .map(|link| LinkRecord::new(path, link))
            .collect())
    }

    // Every href not matching an ignore rule, duplicates removed.
    // The first occurrence of each link decides its position.
    fn extract_links(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        hrefs(html)
            .into_iter()
            .filter(|href| !self.ignore_links.matches(href))
            .filter(|href| seen.insert(href.clone()))
            .collect()
    }
}
