// src/validator/github_api.rs
// =============================================================================
// The GitHub REST calls the GitHub validator needs.
//
// Endpoints used (all relative to the API base, https://api.github.com):
//   GET /repos/{owner}/{repo}
//   GET /repos/{owner}/{repo}/commits/{sha}
//   GET /repos/{owner}/{repo}/commits/{sha}/pulls
//   GET /repos/{owner}/{repo}/issues/{number}
//   GET /repos/{owner}/{repo}/issues/comments/{id}
//   GET /repos/{owner}/{repo}/pulls/{number}
//
// Only the status code matters for most of them. The validator treats
// 200 as "exists" and anything else as "doesn't", so these functions hand
// back the status and leave the decision to the caller. A request that
// never gets a response is an error.
//
// The trait exists so the validator can be tested without GitHub.
// =============================================================================

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::error::CheckError;

pub const DEFAULT_API: &str = "https://api.github.com";

#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn repository(&self, repo: &str) -> Result<StatusCode, CheckError>;

    async fn commit(&self, repo: &str, sha: &str) -> Result<StatusCode, CheckError>;

    async fn issue(&self, repo: &str, number: u64) -> Result<StatusCode, CheckError>;

    async fn issue_comment(&self, repo: &str, id: u64) -> Result<StatusCode, CheckError>;

    async fn pull_request(&self, repo: &str, number: u64) -> Result<StatusCode, CheckError>;

    /// Numbers of the pull requests containing `sha`, or None when GitHub
    /// didn't answer 200
    async fn related_pull_requests(&self, repo: &str, sha: &str) -> Result<Option<Vec<u64>>, CheckError>;
}

// Only the field we need out of each pull request
#[derive(Debug, Deserialize)]
struct PullRequestRef {
    number: u64,
}

pub struct RestApi {
    client: Client,
    base: String,
    owner: String,
    token: String,
}

impl RestApi {
    pub fn new(client: Client, base: &str, owner: &str, token: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            owner: owner.to_string(),
            token: token.to_string(),
        }
    }

    async fn get(&self, what: &'static str, path: String, accept: &str) -> Result<Response, CheckError> {
        let url = format!("{}/repos/{}/{}", self.base, self.owner, path);
        tracing::debug!("GET {}", url);

        self.client
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, accept)
            .header(USER_AGENT, "markdown-link-check")
            .send()
            .await
            .map_err(|source| CheckError::Lookup { what, source })
    }

    async fn status(&self, what: &'static str, path: String) -> Result<StatusCode, CheckError> {
        Ok(self.get(what, path, "application/vnd.github+json").await?.status())
    }
}

#[async_trait]
impl GitHubApi for RestApi {
    async fn repository(&self, repo: &str) -> Result<StatusCode, CheckError> {
        self.status("the repository", repo.to_string()).await
    }

    async fn commit(&self, repo: &str, sha: &str) -> Result<StatusCode, CheckError> {
        // The sha media type returns just the hash instead of the whole diff
        let response = self
            .get("the commit", format!("{}/commits/{}", repo, sha), "application/vnd.github.sha")
            .await?;
        Ok(response.status())
    }

    async fn issue(&self, repo: &str, number: u64) -> Result<StatusCode, CheckError> {
        self.status("the issue", format!("{}/issues/{}", repo, number)).await
    }

    async fn issue_comment(&self, repo: &str, id: u64) -> Result<StatusCode, CheckError> {
        self.status("the issue comment", format!("{}/issues/comments/{}", repo, id))
            .await
    }

    async fn pull_request(&self, repo: &str, number: u64) -> Result<StatusCode, CheckError> {
        self.status("the pull request", format!("{}/pulls/{}", repo, number)).await
    }

    async fn related_pull_requests(&self, repo: &str, sha: &str) -> Result<Option<Vec<u64>>, CheckError> {
        let response = self
            .get(
                "the pull requests associated with the commit",
                format!("{}/commits/{}/pulls", repo, sha),
                "application/vnd.github+json",
            )
            .await?;
        if response.status() != StatusCode::OK {
            return Ok(None);
        }

        let pulls: Vec<PullRequestRef> = response
            .json()
            .await
            .map_err(|e| CheckError::Decode(e.to_string()))?;
        Ok(Some(pulls.into_iter().map(|pull| pull.number).collect()))
    }
}
