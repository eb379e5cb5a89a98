// src/validator/browser.rs
// =============================================================================
// The headless browser behind the web validator's second anchor check.
//
// Some pages only create their anchors after JavaScript runs, so a plain
// GET never sees them. For those we open the page in headless Chrome, wait
// for it to load, and read back the rendered DOM.
//
// Chrome is not safe to drive from several tasks at once, so every browser
// interaction (launch, open tab, navigate, evaluate, close) happens while
// holding one Mutex. The Mutex lives inside ChromeRenderer, which the web
// validator owns: no global state, and tests can swap in a fake renderer.
//
// The browser is launched the first time it's needed, so a run where every
// anchor is found statically never starts Chrome at all.
// =============================================================================

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::Page;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::headers::header_pairs;
use crate::error::BrowserError;

// Something that can load a URL and hand back the rendered HTML
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn rendered_html(&self, url: &str, headers: &HeaderMap) -> Result<String, BrowserError>;

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

// A running browser plus the task pumping its event stream
struct Session {
    browser: Browser,
    handler: JoinHandle<()>,
}

pub struct ChromeRenderer {
    session: Mutex<Option<Session>>,
    // Bound on loading one page, navigation included
    timeout: Duration,
}

impl ChromeRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            session: Mutex::new(None),
            timeout,
        }
    }
}

// Runs a navigation step, giving up on `url` after `timeout`
async fn within<T>(
    url: &str,
    timeout: Duration,
    step: impl Future<Output = Result<T, BrowserError>>,
) -> Result<T, BrowserError> {
    match tokio::time::timeout(timeout, step).await {
        Ok(result) => result,
        Err(_) => Err(BrowserError::Navigate {
            url: url.to_string(),
            message: format!("timed out after {:?}", timeout),
        }),
    }
}

async fn launch() -> Result<Session, BrowserError> {
    let config = BrowserConfig::builder().build().map_err(BrowserError::Launch)?;
    let (browser, mut events) = Browser::launch(config)
        .await
        .map_err(|e| BrowserError::Launch(e.to_string()))?;

    // chromiumoxide only makes progress while its handler is polled
    let handler = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    tracing::debug!("headless browser launched");
    Ok(Session { browser, handler })
}

// Navigate and read the DOM. Split out so the tab is closed whatever happens.
async fn load(page: &Page, url: &str, headers: &HeaderMap, timeout: Duration) -> Result<String, BrowserError> {
    let navigate = |e: chromiumoxide::error::CdpError| BrowserError::Navigate {
        url: url.to_string(),
        message: e.to_string(),
    };

    if !headers.is_empty() {
        let extra: serde_json::Map<String, serde_json::Value> = header_pairs(headers)
            .into_iter()
            .map(|(name, value)| (name, serde_json::Value::String(value)))
            .collect();
        page.execute(SetExtraHttpHeadersParams::new(Headers::new(serde_json::Value::Object(extra))))
            .await
            .map_err(navigate)?;
    }

    within(url, timeout, async {
        page.goto(url).await.map_err(navigate)?;
        page.wait_for_navigation().await.map_err(navigate)?;
        Ok(())
    })
    .await?;

    page.evaluate("document.documentElement.innerHTML")
        .await
        .map_err(|e| BrowserError::Evaluate(e.to_string()))?
        .into_value::<String>()
        .map_err(|e| BrowserError::Evaluate(e.to_string()))
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn rendered_html(&self, url: &str, headers: &HeaderMap) -> Result<String, BrowserError> {
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            *guard = Some(launch().await?);
        }
        let session = match guard.as_ref() {
            Some(session) => session,
            None => return Err(BrowserError::Launch("browser session missing".to_string())),
        };

        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Navigate {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let html = load(&page, url, headers, self.timeout).await;
        let closed = page.close().await.map_err(|e| BrowserError::ClosePage(e.to_string()));

        // A failed load is the more useful error to report
        let html = html?;
        closed?;
        Ok(html)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut guard = self.session.lock().await;
        let Some(mut session) = guard.take() else {
            return Ok(());
        };

        let closed = session.browser.close().await;
        // Wait for the process to exit, then stop the event pump
        if let Err(e) = session.browser.wait().await {
            tracing::debug!("fail to wait for the browser to exit: {}", e);
        }
        session.handler.abort();

        closed.map(|_| ()).map_err(|e| BrowserError::Close(e.to_string()))
    }
}
