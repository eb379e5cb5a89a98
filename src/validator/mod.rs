// src/validator/mod.rs
// =============================================================================
// This module contains everything that decides whether a link is valid.
//
// Submodules:
// - file: local files and heading anchors (catch-all, always last)
// - web: http(s) endpoints, with a headless browser fallback for anchors
// - browser: the headless browser used by the web validator
// - headers: base headers plus per-endpoint overrides for the web validator
// - github: GitHub owner/repository/commit/issue/pull-request links
// - github_api: the GitHub REST calls the github validator relies on
// - mail: mailto: links, checked through MX records
//
// Every validator answers two questions:
// 1. claims(target): is this link mine to check?
// 2. check(ctx, source, target): is it valid?
//
// The dispatcher asks them in order and the first one that claims a link
// is the only one that checks it.
// =============================================================================

mod browser;
mod file;
mod github;
mod github_api;
mod headers;
mod mail;
mod web;

pub use browser::ChromeRenderer;
pub use file::FileValidator;
pub use github::GitHubValidator;
pub use github_api::{RestApi, DEFAULT_API};
pub use headers::{HeaderRules, HeaderTable};
pub use mail::{DnsResolver, MailValidator, MxResolver};
pub use web::WebValidator;

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::CheckError;
use crate::link::Verdict;

#[async_trait]
pub trait Validator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Does this validator take responsibility for `target`?
    fn claims(&self, target: &str) -> bool;

    /// Decide whether `target`, found in the document at `source`, is valid.
    ///
    /// A broken link is `Ok(Verdict { valid: false, .. })`. `Err` means the
    /// validator couldn't reach a decision at all.
    async fn check(&self, ctx: &CancellationToken, source: &Path, target: &str) -> Result<Verdict, CheckError>;

    /// Release anything held for the duration of the run
    async fn close(&self) -> Result<(), CheckError> {
        Ok(())
    }
}

// Runs `work` unless `ctx` is cancelled first.
//
// Every network or browser call goes through here, so Ctrl-C aborts the
// call in flight instead of waiting for it to time out.
pub(crate) async fn cancellable<T, E, F>(ctx: &CancellationToken, work: F) -> Result<T, CheckError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<CheckError>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(CheckError::Cancelled),
        result = work => result.map_err(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let ctx = CancellationToken::new();
        let result = cancellable(&ctx, async { Ok::<_, CheckError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_work() {
        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = cancellable(&ctx, async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, CheckError>(())
        })
        .await;

        assert!(matches!(result, Err(CheckError::Cancelled)));
    }
}
