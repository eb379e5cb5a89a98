// src/validator/file.rs
// =============================================================================
// This validator checks links pointing at the local filesystem.
//
// It claims every link, so it must be the last validator in the list:
// anything the web, GitHub and mail validators didn't want ends up here.
//
// How a link is resolved, for a link found in docs/guide.md:
//   "#install"             -> docs/guide.md, heading "install"
//   "setup.md"             -> docs/setup.md
//   "../README.md#usage"   -> README.md, heading "usage"
//   "/CONTRIBUTING.md"     -> <documentation root>/CONTRIBUTING.md
//   "images/"              -> docs/images (directories are always valid)
//
// A fragment is only checked when the target is a Markdown document: we
// render it with the same renderer the scanner uses and look for a heading
// whose id or visible text matches the fragment, ignoring case.
// =============================================================================

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::Validator;
use crate::error::CheckError;
use crate::link::{FailureDetail, Verdict};
use crate::render::{headings, Renderer};
use crate::scan::is_document;

pub struct FileValidator {
    root: PathBuf,
    renderer: Arc<dyn Renderer>,
    // Relative links are parsed against this to catch malformed ones
    base: Url,
}

// A link split into the parts we care about
#[derive(Debug, PartialEq, Eq)]
struct Reference {
    path: Option<String>,
    fragment: Option<String>,
}

impl FileValidator {
    pub fn new(root: impl Into<PathBuf>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            root: root.into(),
            renderer,
            // A constant, known to be a valid URL
            base: Url::parse("file:///").expect("valid base url"),
        }
    }

    fn parse(&self, target: &str) -> Result<Reference, CheckError> {
        self.base.join(target).map_err(|source| CheckError::Uri {
            target: target.to_string(),
            source,
        })?;

        let (reference, fragment) = match target.split_once('#') {
            Some((reference, fragment)) => (reference, Some(decode(fragment))),
            None => (target, None),
        };
        let path = reference.split('?').next().unwrap_or_default();

        Ok(Reference {
            path: (!path.is_empty()).then(|| decode(path)),
            fragment: fragment.filter(|fragment| !fragment.is_empty()),
        })
    }

    // Where a path written inside `source` points to on disk
    fn resolve(&self, source: &Path, path: &str) -> PathBuf {
        match path.strip_prefix('/') {
            Some(from_root) => self.root.join(from_root),
            None => source.parent().unwrap_or_else(|| Path::new(".")).join(path),
        }
    }

    // Returns Ok(true) when the link resolves inside a Markdown document.
    // Ok(false) sends the caller to the plain existence check.
    async fn check_document(&self, source: &Path, target: &str) -> Result<bool, CheckError> {
        let reference = self.parse(target)?;

        // "#section" on its own points back at the document itself
        let path = match &reference.path {
            Some(path) => self.resolve(source, path),
            None => source.to_path_buf(),
        };

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(false),
        };
        if metadata.is_dir() {
            return Ok(true);
        }

        let fragment = match &reference.fragment {
            Some(fragment) if is_document(&path) => fragment,
            _ => return Ok(true),
        };

        let payload = tokio::fs::read(&path).await.map_err(|source| CheckError::Read {
            path: path.clone(),
            source,
        })?;
        let html = self.renderer.render(&payload);
        Ok(self.has_heading(&html, fragment))
    }

    // A fragment may name a generated heading id or the heading's text
    fn has_heading(&self, html: &str, fragment: &str) -> bool {
        let wanted = fragment.to_lowercase();
        let slug = self.renderer.slugify(fragment);

        headings(html).iter().any(|heading| {
            let by_id = heading.id.as_deref().is_some_and(|id| {
                let id = id.to_lowercase();
                id == wanted || (!slug.is_empty() && id == slug)
            });
            by_id || heading.text.to_lowercase() == wanted
        })
    }
}

#[async_trait]
impl Validator for FileValidator {
    fn name(&self) -> &'static str {
        "file"
    }

    fn claims(&self, _target: &str) -> bool {
        true
    }

    async fn check(&self, _ctx: &CancellationToken, source: &Path, target: &str) -> Result<Verdict, CheckError> {
        if is_document(source) && self.check_document(source, target).await? {
            return Ok(Verdict::valid());
        }

        // Fallback: the link taken literally, relative to the document
        let path = self.resolve(source, target);
        match tokio::fs::try_exists(&path).await {
            Ok(exists) => Ok(Verdict::from_bool(exists)),
            Err(e) => {
                tracing::debug!("fail to access {}: {}", path.display(), e);
                Ok(Verdict::invalid_because(FailureDetail::new(format!(
                    "fail to access '{}': {}",
                    path.display(),
                    e
                ))))
            }
        }
    }
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
