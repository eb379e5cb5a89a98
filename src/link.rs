// src/link.rs
// =============================================================================
// The data that flows through the pipeline.
//
// - LinkRecord: one link found in one document, plus its outcome
// - Verdict: what a validator decided about a link
// - FailureDetail: extra context attached to a negative verdict
//
// A record is created by the scanner with `valid: None`, annotated exactly
// once by the dispatcher, and only read afterwards by the reporter.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// One link inside one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Path of the document containing the link
    pub source: PathBuf,
    /// The href exactly as it appears in the rendered document
    pub target: String,
    /// None until a validator has looked at it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Why the link failed, when the validator could tell us
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
}

impl LinkRecord {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            valid: None,
            failure: None,
        }
    }

    // Applies a validator's decision. Records are only ever annotated once,
    // so an existing failure detail is never replaced.
    pub fn annotate(mut self, verdict: Verdict) -> Self {
        self.valid = Some(verdict.valid);
        if self.failure.is_none() {
            self.failure = verdict.detail;
        }
        self
    }

    pub fn is_invalid(&self) -> bool {
        self.valid == Some(false)
    }
}

// The outcome of Validator::check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub detail: Option<FailureDetail>,
}

impl Verdict {
    pub fn valid() -> Self {
        Self { valid: true, detail: None }
    }

    pub fn from_bool(valid: bool) -> Self {
        Self { valid, detail: None }
    }

    pub fn invalid_because(detail: FailureDetail) -> Self {
        Self {
            valid: false,
            detail: Some(detail),
        }
    }
}

// Structured explanation attached to a failed link.
//
// Everything is optional because each validator knows different things:
// the web validator has headers and a body, the GitHub validator only knows
// which lookup failed and its status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub request_headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub response_headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FailureDetail {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  reason: {}", self.reason)?;
        if let Some(status) = self.status {
            write!(f, "\n  status: {}", status)?;
        }
        if !self.request_headers.is_empty() {
            write!(f, "\n  request headers:")?;
            for (name, value) in &self.request_headers {
                write!(f, "\n    {}: {}", name, value)?;
            }
        }
        if !self.response_headers.is_empty() {
            write!(f, "\n  response headers:")?;
            for (name, value) in &self.response_headers {
                write!(f, "\n    {}: {}", name, value)?;
            }
        }
        if let Some(body) = &self.body {
            write!(f, "\n  body: {}", body)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unknown() {
        let record = LinkRecord::new("docs/a.md", "#intro");
        assert_eq!(record.valid, None);
        assert!(!record.is_invalid());
    }

    #[test]
    fn test_annotate_keeps_first_failure_detail() {
        let record = LinkRecord::new("docs/a.md", "https://example.com")
            .annotate(Verdict::invalid_because(FailureDetail::new("first")))
            .annotate(Verdict::invalid_because(FailureDetail::new("second")));

        assert!(record.is_invalid());
        assert_eq!(record.failure.unwrap().reason, "first");
    }

    #[test]
    fn test_detail_display_includes_status() {
        let detail = FailureDetail::new("unexpected status").with_status(404);
        let text = detail.to_string();
        assert!(text.contains("reason: unexpected status"));
        assert!(text.contains("status: 404"));
    }
}
