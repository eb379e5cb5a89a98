// src/validator/web.rs
// =============================================================================
// This validator checks http:// and https:// links.
//
// Key functionality:
// - Makes an HTTP GET with the configured headers
// - Follows permanent redirects (301, 308) only; any other redirect means
//   the link isn't canonical yet, so it's reported as broken
// - 2xx is valid, anything else is broken
// - Links with a fragment (#section) also need a matching <a href="#section">
//   on the page: first in the HTML we downloaded, then, if it wasn't there,
//   in the DOM a headless browser renders after running the page's scripts
//
// What is NOT an error here:
// - 404, 500, a rejected redirect, a host that doesn't answer: those are
//   broken links, reported as Verdict::invalid with a FailureDetail
//
// What IS an error:
// - a link we can't even parse, a request we can't build, the browser
//   failing, or the run being cancelled
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::browser::PageRenderer;
use super::headers::{header_pairs, HeaderRules};
use super::{cancellable, Validator};
use crate::error::CheckError;
use crate::link::{FailureDetail, Verdict};
use crate::render::has_anchor;

// Even permanent redirects can loop
const MAX_REDIRECTS: usize = 10;

// How much of an error page we keep for the report
const BODY_PREVIEW: usize = 512;

pub struct WebValidator {
    client: Client,
    headers: HeaderRules,
    renderer: Arc<dyn PageRenderer>,
}

impl WebValidator {
    pub fn new(headers: HeaderRules, timeout: Duration, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::custom(|attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    return attempt.error("too many redirects");
                }
                match attempt.status() {
                    StatusCode::MOVED_PERMANENTLY | StatusCode::PERMANENT_REDIRECT => attempt.follow(),
                    status => attempt.error(format!("redirect not allowed ({})", status)),
                }
            }))
            .build()
            .context("fail to create the HTTP client")?;

        Ok(Self {
            client,
            headers,
            renderer,
        })
    }
}

// Only http(s) links belong to us.
// mailto:, ftp:, relative paths etc. go to other validators.
fn is_http_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW).collect()
}

// Reads just enough of the body for the preview. A char is at most 4 bytes.
async fn body_preview(mut response: Response) -> String {
    let mut bytes = Vec::new();
    while bytes.len() < BODY_PREVIEW * 4 {
        match response.chunk().await {
            Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!("error body cut short: {}", e);
                break;
            }
        }
    }
    preview(&String::from_utf8_lossy(&bytes))
}

// The hrefs a page may use for `fragment`. Url::fragment() percent-encodes
// spaces and non-ASCII characters, pages usually write them as is.
fn anchors(fragment: &str) -> Vec<String> {
    let decoded = percent_decode_str(fragment).decode_utf8_lossy();
    let mut anchors = vec![format!("#{}", decoded)];
    if decoded != fragment {
        anchors.push(format!("#{}", fragment));
    }
    anchors
}

fn contains_anchor(html: &str, anchors: &[String]) -> bool {
    anchors.iter().any(|anchor| has_anchor(html, anchor))
}

#[async_trait]
impl Validator for WebValidator {
    fn name(&self) -> &'static str {
        "web"
    }

    fn claims(&self, target: &str) -> bool {
        is_http_link(target)
    }

    async fn check(&self, ctx: &CancellationToken, _source: &Path, target: &str) -> Result<Verdict, CheckError> {
        let url = Url::parse(target).map_err(|source| CheckError::Uri {
            target: target.to_string(),
            source,
        })?;

        let headers = self.headers.for_target(target);
        let request = self
            .client
            .get(url.clone())
            .headers(headers.clone())
            .build()
            .map_err(CheckError::Request)?;
        let request_headers = header_pairs(request.headers());

        // A failed round trip means "unreachable", not "we couldn't decide"
        let sent = cancellable(ctx, async { Ok::<_, CheckError>(self.client.execute(request).await) }).await?;
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("request to {} failed: {}", target, e);
                return Ok(Verdict::invalid_because(FailureDetail {
                    reason: e.to_string(),
                    request_headers,
                    ..FailureDetail::default()
                }));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let response_headers = header_pairs(response.headers());
            let body = cancellable(ctx, async { Ok::<_, CheckError>(body_preview(response).await) }).await?;
            return Ok(Verdict::invalid_because(FailureDetail {
                reason: "unexpected status code".to_string(),
                status: Some(status.as_u16()),
                request_headers,
                response_headers,
                body: Some(body),
            }));
        }

        let fragment = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => fragment,
            _ => return Ok(Verdict::valid()),
        };
        let anchors = anchors(fragment);
        let anchor = &anchors[0];

        let body = match cancellable(ctx, async { Ok::<_, CheckError>(response.text().await) }).await? {
            Ok(body) => body,
            Err(e) => {
                return Ok(Verdict::invalid_because(
                    FailureDetail::new(format!("fail to read the response: {}", e)).with_status(status.as_u16()),
                ));
            }
        };
        if contains_anchor(&body, &anchors) {
            return Ok(Verdict::valid());
        }

        // Second tier: let the page's scripts run, then look again
        tracing::debug!("anchor {} not in static page {}, trying the browser", anchor, target);
        let rendered = cancellable(ctx, self.renderer.rendered_html(target, &headers)).await?;
        if contains_anchor(&rendered, &anchors) {
            return Ok(Verdict::valid());
        }

        Ok(Verdict::invalid_because(
            FailureDetail::new(format!("anchor '{}' not found", anchor)).with_status(status.as_u16()),
        ))
    }

    async fn close(&self) -> Result<(), CheckError> {
        self.renderer.close().await.map_err(CheckError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrowserError;
    use crate::validator::headers::HeaderTable;
    use httpmock::prelude::*;
    use reqwest::header::HeaderMap;
    use std::sync::Mutex;

    // Stands in for headless Chrome: returns canned HTML and remembers calls
    #[derive(Default)]
    struct FakeRenderer {
        html: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRenderer {
        fn returning(html: &str) -> Arc<Self> {
            Arc::new(Self {
                html: Some(html.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn rendered_html(&self, url: &str, _headers: &HeaderMap) -> Result<String, BrowserError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.html
                .clone()
                .ok_or_else(|| BrowserError::Evaluate("boom".to_string()))
        }
    }

    fn validator(renderer: Arc<FakeRenderer>) -> WebValidator {
        WebValidator::new(HeaderRules::default(), Duration::from_secs(5), renderer).unwrap()
    }

    async fn check(validator: &WebValidator, target: &str) -> Result<Verdict, CheckError> {
        validator
            .check(&CancellationToken::new(), Path::new("docs/a.md"), target)
            .await
    }

    #[test]
    fn test_claims_http_only() {
        let v = validator(FakeRenderer::failing());
        assert!(v.claims("http://example.com"));
        assert!(v.claims("https://example.com/page#x"));
        assert!(!v.claims("mailto:user@example.com"));
        assert!(!v.claims("ftp://example.com"));
        assert!(!v.claims("docs/http://x"));
    }

    #[tokio::test]
    async fn test_success_status_is_valid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200).body("hello");
            })
            .await;

        let verdict = check(&validator(FakeRenderer::failing()), &server.url("/ok")).await.unwrap();
        assert!(verdict.valid);
    }

    #[tokio::test]
    async fn test_not_found_is_invalid_with_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/gone");
                then.status(404).body("nothing here");
            })
            .await;

        let verdict = check(&validator(FakeRenderer::failing()), &server.url("/gone")).await.unwrap();
        assert!(!verdict.valid);
        let detail = verdict.detail.unwrap();
        assert_eq!(detail.status, Some(404));
        assert_eq!(detail.body.as_deref(), Some("nothing here"));
    }

    #[tokio::test]
    async fn test_error_body_preview_is_capped() {
        let server = MockServer::start_async().await;
        let page = "é".repeat(BODY_PREVIEW * 10);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/huge");
                then.status(500).body(page.as_str());
            })
            .await;

        let verdict = check(&validator(FakeRenderer::failing()), &server.url("/huge")).await.unwrap();
        let body = verdict.detail.unwrap().body.unwrap();
        assert_eq!(body.chars().count(), BODY_PREVIEW);
        assert!(body.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn test_permanent_redirects_are_followed() {
        let server = MockServer::start_async().await;
        let final_url = server.url("/final");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/moved");
                then.status(301).header("location", final_url.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/permanent");
                then.status(308).header("location", final_url.as_str());
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/final");
                then.status(200);
            })
            .await;

        let v = validator(FakeRenderer::failing());
        assert!(check(&v, &server.url("/moved")).await.unwrap().valid);
        assert!(check(&v, &server.url("/permanent")).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_temporary_redirects_are_rejected() {
        let server = MockServer::start_async().await;
        let final_url = server.url("/final");
        for (path, status) in [("/temporary", 307), ("/found", 302)] {
            server
                .mock_async(|when, then| {
                    when.method(GET).path(path);
                    then.status(status).header("location", final_url.as_str());
                })
                .await;
        }
        server
            .mock_async(|when, then| {
                when.method(GET).path("/final");
                then.status(200);
            })
            .await;

        let v = validator(FakeRenderer::failing());
        let verdict = check(&v, &server.url("/temporary")).await.unwrap();
        assert!(!verdict.valid);
        assert!(verdict.detail.is_some());
        assert!(!check(&v, &server.url("/found")).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_invalid_not_error() {
        let verdict = check(&validator(FakeRenderer::failing()), "http://127.0.0.1:1/").await.unwrap();
        assert!(!verdict.valid);
    }

    #[tokio::test]
    async fn test_fragment_found_in_static_page() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/page");
                then.status(200).body(r##"<html><body><a href="#title">Title</a></body></html>"##);
            })
            .await;

        let renderer = FakeRenderer::failing();
        let v = validator(renderer.clone());
        let verdict = check(&v, &format!("{}#title", server.url("/page"))).await.unwrap();
        assert!(verdict.valid);
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_ascii_and_spaced_fragments_match_as_written() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/about");
                then.status(200)
                    .body(r##"<a href="#über-uns">Über uns</a><a href="#a b">spaced</a>"##);
            })
            .await;

        let renderer = FakeRenderer::failing();
        let v = validator(renderer.clone());
        let umlaut = check(&v, &format!("{}#über-uns", server.url("/about"))).await.unwrap();
        assert!(umlaut.valid, "{:?}", umlaut.detail);
        let spaced = check(&v, &format!("{}#a b", server.url("/about"))).await.unwrap();
        assert!(spaced.valid, "{:?}", spaced.detail);
        assert!(renderer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_encoded_fragment_matches_encoded_href() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/about");
                then.status(200).body(r##"<a href="#%C3%BCber">x</a>"##);
            })
            .await;

        let v = validator(FakeRenderer::failing());
        assert!(check(&v, &format!("{}#%C3%BCber", server.url("/about"))).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_fragment_found_after_rendering() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/app");
                then.status(200).body("<html><body><div id='root'></div></body></html>");
            })
            .await;

        let renderer = FakeRenderer::returning(r##"<body><a href="#title">Title</a></body>"##);
        let v = validator(renderer.clone());
        let target = format!("{}#title", server.url("/app"));
        let verdict = check(&v, &target).await.unwrap();
        assert!(verdict.valid);
        assert_eq!(renderer.calls(), vec![target]);
    }

    #[tokio::test]
    async fn test_fragment_missing_everywhere() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/app");
                then.status(200).body("<a href='#other'>x</a>");
            })
            .await;

        let v = validator(FakeRenderer::returning("<a href='#other'>x</a>"));
        let verdict = check(&v, &format!("{}#title", server.url("/app"))).await.unwrap();
        assert!(!verdict.valid);
        assert!(verdict.detail.unwrap().reason.contains("#title"));
    }

    #[tokio::test]
    async fn test_browser_failure_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/app");
                then.status(200).body("<p>empty</p>");
            })
            .await;

        let v = validator(FakeRenderer::failing());
        let err = check(&v, &format!("{}#title", server.url("/app"))).await.unwrap_err();
        assert!(matches!(err, CheckError::Browser(_)));
    }

    #[tokio::test]
    async fn test_header_override_is_sent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/private").header("authorization", "Bearer x");
                then.status(200);
            })
            .await;

        let mut header = HeaderTable::new();
        header.insert("Authorization".to_string(), vec!["Bearer x".to_string()]);
        let rules = HeaderRules::new(&HeaderTable::new(), &[("/private$".to_string(), header)]).unwrap();
        let v = WebValidator::new(rules, Duration::from_secs(5), FakeRenderer::failing()).unwrap();

        assert!(check(&v, &server.url("/private")).await.unwrap().valid);
        // Without the override nothing matches and httpmock answers 404
        assert!(!check(&validator(FakeRenderer::failing()), &server.url("/private")).await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_malformed_url_is_an_error() {
        let err = check(&validator(FakeRenderer::failing()), "http://[::1").await.unwrap_err();
        assert!(matches!(err, CheckError::Uri { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_context_is_an_error() {
        let ctx = CancellationToken::new();
        ctx.cancel();
        let v = validator(FakeRenderer::failing());
        let err = v
            .check(&ctx, Path::new("docs/a.md"), "http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
    }
}
