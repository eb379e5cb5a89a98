// src/error.rs
// =============================================================================
// Typed errors for the scan -> dispatch -> validate pipeline.
//
// The application layer (main.rs, app.rs, config.rs) keeps using anyhow like
// it always did. The pipeline itself needs errors the caller can inspect:
// the dispatcher has to tell "this validator could not decide" apart from
// "this link is broken", and the scanner has to say which file went wrong.
// =============================================================================

use std::path::PathBuf;
use thiserror::Error;

// Errors raised while walking the documentation tree.
// Any of these aborts the whole scan; there is no partial-results mode.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path '{}' does not exist", .0.display())]
    Missing(PathBuf),

    #[error("'{}' expected to be a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("fail to compile the ignore pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("fail to walk the directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("fail to process the file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// Errors raised by Validator::check when the validator cannot form a decision.
//
// A broken link is NOT an error, it is a Verdict with `valid: false`. These
// are reserved for things like malformed input, DNS failures or the browser
// falling over, and the dispatcher collects them instead of reporting a result.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("fail to parse the uri '{target}': {source}")]
    Uri {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("fail to read the file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fail to create the HTTP request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("fail to consult {what} at GitHub: {source}")]
    Lookup {
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("fail to decode the GitHub response: {0}")]
    Decode(String),

    #[error("fail to parse the {what} value '{value}'")]
    MalformedId { what: &'static str, value: String },

    #[error("fail to check the MX DNS entries: {0}")]
    Dns(String),

    #[error("fail to verify the anchor with a browser: {0}")]
    Browser(#[from] BrowserError),

    #[error("operation cancelled")]
    Cancelled,
}

// Every stage of talking to the headless browser gets its own variant so the
// final message says where it broke.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch the browser: {0}")]
    Launch(String),

    #[error("failed to navigate to '{url}': {message}")]
    Navigate { url: String, message: String },

    #[error("failed to read the rendered page: {0}")]
    Evaluate(String),

    #[error("failed to close the browser tab: {0}")]
    ClosePage(String),

    #[error("failed to close the browser: {0}")]
    Close(String),
}

// One collected failure: which record, and what went wrong.
#[derive(Debug)]
pub struct DispatchFailure {
    pub source: PathBuf,
    pub target: String,
    pub error: CheckError,
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' at '{}': {}", self.target, self.source.display(), self.error)
    }
}

// The dispatcher's composite error. Holds every failure seen during a batch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("missing 'validators'")]
    NoValidators,

    #[error("{}", describe(.0))]
    Failures(Vec<DispatchFailure>),
}

fn describe(failures: &[DispatchFailure]) -> String {
    if let [single] = failures {
        return single.to_string();
    }

    let messages: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!("multiple errors detected ('{}')", messages.join("', '"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(value: &str) -> DispatchFailure {
        DispatchFailure {
            source: PathBuf::from("docs/a.md"),
            target: value.to_string(),
            error: CheckError::MalformedId {
                what: "issue",
                value: value.to_string(),
            },
        }
    }

    #[test]
    fn test_single_failure_names_link_and_file() {
        let err = DispatchError::Failures(vec![failure("x")]);
        assert_eq!(err.to_string(), "'x' at 'docs/a.md': fail to parse the issue value 'x'");
    }

    #[test]
    fn test_multiple_failures_are_enumerated() {
        let err = DispatchError::Failures(vec![failure("x"), failure("y")]);
        assert_eq!(
            err.to_string(),
            "multiple errors detected (''x' at 'docs/a.md': fail to parse the issue value 'x'', \
             ''y' at 'docs/a.md': fail to parse the issue value 'y'')"
        );
    }
}
