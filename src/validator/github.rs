// src/validator/github.rs
// =============================================================================
// This validator checks links into GitHub for one configured owner.
//
// It claims links under:
//   https://github.com/<owner>...
//   https://raw.githubusercontent.com/<owner>...
// (the owner is matched case-insensitively)
//
// A claimed link is classified into the first shape whose pattern matches,
// trying them in this order:
//   1. owner root      github.com/<owner>
//   2. commit          github.com/<owner>/<repo>/commit/<sha>
//   3. issue           github.com/<owner>/<repo>/issues/<id>[#issuecomment-<id>]
//   4. pull request    github.com/<owner>/<repo>/pull/<id>[/commits/<sha>]
//   5. repository      github.com/<owner>/<repo>
//
// The owner root is trusted: it's the owner from our own config. Every other
// shape asks the GitHub API; 200 means the thing exists, anything else means
// the link is broken. A claimed link matching no shape (a blob path, a raw
// file, a wiki page...) is reported as broken.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::StatusCode;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::github_api::GitHubApi;
use super::{cancellable, Validator};
use crate::error::CheckError;
use crate::link::{FailureDetail, Verdict};

// The recognised URL structures, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Owner,
    Commit,
    Issue,
    PullRequest,
    Repository,
}

// A classified link with its captured parts
#[derive(Debug, Clone, PartialEq, Eq)]
enum Shape {
    Owner,
    Commit { repo: String, sha: String },
    Issue { repo: String, issue: u64, comment: Option<u64> },
    PullRequest { repo: String, pull: u64, commit: Option<String> },
    Repository { repo: String },
}

pub struct GitHubValidator {
    owner: String,
    api: Arc<dyn GitHubApi>,
    authority: Vec<Regex>,
    shapes: Vec<(ShapeKind, Regex)>,
}

impl GitHubValidator {
    pub fn new(owner: &str, api: Arc<dyn GitHubApi>) -> Result<Self> {
        let owner_expr = format!("(?i:{})", regex::escape(owner));
        let web = format!(r"^(?:http|https)://github\.com/{}", owner_expr);
        let raw = format!(r"^(?:http|https)://raw\.githubusercontent\.com/{}", owner_expr);
        let repo = r"(?P<repo>[^/#?]+)";

        let compile = |expr: String| {
            Regex::new(&expr).with_context(|| format!("fail to compile the expression '{}'", expr))
        };

        let authority = vec![
            compile(format!(r"{}(?:[/#?]|$)", raw))?,
            compile(format!(r"{}(?:[/#?]|$)", web))?,
        ];

        let shapes = vec![
            (ShapeKind::Owner, compile(format!(r"{}/?$", web))?),
            (
                ShapeKind::Commit,
                compile(format!(r"{}/{}/commit/(?P<sha>[^/#?]+)/?$", web, repo))?,
            ),
            (
                ShapeKind::Issue,
                compile(format!(
                    r"{}/{}/issues/(?P<issue>[0-9]*)(?:#issuecomment-(?P<comment>[0-9]*))?$",
                    web, repo
                ))?,
            ),
            (
                ShapeKind::PullRequest,
                compile(format!(
                    r"{}/{}/pull/(?P<pull>[0-9]*)(?:/commits/(?P<commit>[^/#?]+))?$",
                    web, repo
                ))?,
            ),
            (ShapeKind::Repository, compile(format!(r"{}/{}/?$", web, repo))?),
        ];

        Ok(Self {
            owner: owner.to_string(),
            api,
            authority,
            shapes,
        })
    }

    // First shape whose pattern matches, or None
    fn classify(&self, target: &str) -> Result<Option<Shape>, CheckError> {
        for (kind, regex) in &self.shapes {
            if let Some(captures) = regex.captures(target) {
                return shape(*kind, &captures).map(Some);
            }
        }
        Ok(None)
    }
}

fn shape(kind: ShapeKind, captures: &Captures) -> Result<Shape, CheckError> {
    let text = |name: &str| captures.name(name).map(|m| m.as_str().to_string()).unwrap_or_default();

    Ok(match kind {
        ShapeKind::Owner => Shape::Owner,
        ShapeKind::Commit => Shape::Commit {
            repo: text("repo"),
            sha: text("sha"),
        },
        ShapeKind::Issue => Shape::Issue {
            repo: text("repo"),
            issue: number("issue", &text("issue"))?,
            comment: captures
                .name("comment")
                .map(|m| number("comment", m.as_str()))
                .transpose()?,
        },
        ShapeKind::PullRequest => Shape::PullRequest {
            repo: text("repo"),
            pull: number("pull request ID", &text("pull"))?,
            commit: captures.name("commit").map(|m| m.as_str().to_string()),
        },
        // "tools.git" is how clone URLs end; the repository is "tools"
        ShapeKind::Repository => Shape::Repository {
            repo: text("repo").trim_end_matches(".git").to_string(),
        },
    })
}

fn number(what: &'static str, value: &str) -> Result<u64, CheckError> {
    value.parse().map_err(|_| CheckError::MalformedId {
        what,
        value: value.to_string(),
    })
}

fn missing(what: &str, status: StatusCode) -> Verdict {
    Verdict::invalid_because(FailureDetail::new(format!("{} not found at GitHub", what)).with_status(status.as_u16()))
}

#[async_trait]
impl Validator for GitHubValidator {
    fn name(&self) -> &'static str {
        "github"
    }

    fn claims(&self, target: &str) -> bool {
        self.authority.iter().any(|regex| regex.is_match(target))
    }

    async fn check(&self, ctx: &CancellationToken, _source: &Path, target: &str) -> Result<Verdict, CheckError> {
        let shape = match self.classify(target)? {
            Some(shape) => shape,
            None => {
                tracing::debug!("{} matches no known GitHub link shape for {}", target, self.owner);
                return Ok(Verdict::invalid_because(FailureDetail::new("unsupported GitHub link")));
            }
        };

        match shape {
            // Asserted by the configuration, there's no API call for it
            Shape::Owner => Ok(Verdict::valid()),

            Shape::Commit { repo, sha } => {
                let status = cancellable(ctx, self.api.commit(&repo, &sha)).await?;
                if status != StatusCode::OK {
                    return Ok(missing("commit", status));
                }
                Ok(Verdict::valid())
            }

            Shape::Issue { repo, issue, comment } => {
                let status = cancellable(ctx, self.api.issue(&repo, issue)).await?;
                if status != StatusCode::OK {
                    return Ok(missing("issue", status));
                }

                let Some(comment) = comment else {
                    return Ok(Verdict::valid());
                };
                let status = cancellable(ctx, self.api.issue_comment(&repo, comment)).await?;
                if status != StatusCode::OK {
                    return Ok(missing("issue comment", status));
                }
                Ok(Verdict::valid())
            }

            Shape::PullRequest { repo, pull, commit } => {
                let status = cancellable(ctx, self.api.pull_request(&repo, pull)).await?;
                if status != StatusCode::OK {
                    return Ok(missing("pull request", status));
                }

                let Some(commit) = commit else {
                    return Ok(Verdict::valid());
                };
                let related = cancellable(ctx, self.api.related_pull_requests(&repo, &commit)).await?;
                match related {
                    Some(pulls) if pulls.contains(&pull) => Ok(Verdict::valid()),
                    Some(_) => Ok(Verdict::invalid_because(FailureDetail::new(format!(
                        "commit {} is not part of pull request {}",
                        commit, pull
                    )))),
                    None => Ok(Verdict::invalid_because(FailureDetail::new(format!(
                        "no pull requests found for commit {}",
                        commit
                    )))),
                }
            }

            Shape::Repository { repo } => {
                let status = cancellable(ctx, self.api.repository(&repo)).await?;
                if status != StatusCode::OK {
                    return Ok(missing("repository", status));
                }
                Ok(Verdict::valid())
            }
        }
    }
}
