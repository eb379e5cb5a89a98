// src/app.rs
// =============================================================================
// Wires everything together for one run of `check`.
//
// 1. Build the validators from the config (bad patterns fail here, before
//    any file is read)
// 2. Scan the documentation tree into LinkRecords
// 3. Dispatch every record to its validator
// 4. Close the validators (shuts the browser down if it was started)
// 5. Print the report
//
// Validator order matters because the first one claiming a link wins:
//
//   mail -> github (one per config entry, sorted by name) -> web -> file
//
// The file validator claims everything, so it has to come last.
// =============================================================================

use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::render::{Markdown, Renderer};
use crate::report::Reporter;
use crate::scan::{IgnoreRules, Scanner};
use crate::validator::{
    ChromeRenderer, DnsResolver, FileValidator, GitHubValidator, HeaderRules, MailValidator, MxResolver, RestApi,
    Validator, WebValidator, DEFAULT_API,
};

// Runs a full check of `root`.
//
// Returns: Ok(true) when at least one link is invalid
pub async fn run(ctx: &CancellationToken, root: &Path, config: &Config, json: bool) -> Result<bool> {
    let resolver = DnsResolver::from_system_conf()?;
    run_with(ctx, root, config, Arc::new(resolver), json).await
}

// Same as `run`, with the MX resolver supplied by the caller
pub async fn run_with(
    ctx: &CancellationToken,
    root: &Path,
    config: &Config,
    resolver: Arc<dyn MxResolver>,
    json: bool,
) -> Result<bool> {
    let root = absolute(root);
    let renderer: Arc<dyn Renderer> = Arc::new(Markdown::new());

    let scanner = Scanner::new(
        renderer.clone(),
        IgnoreRules::compile(&config.ignore.file)?,
        IgnoreRules::compile(&config.ignore.link)?,
    );
    let dispatcher = Dispatcher::new(validators(config, &root, renderer, resolver)?);

    let records = scanner.process(&root)?;
    tracing::info!("{} link(s) to check", records.len());

    let outcome = dispatcher.process(ctx, records).await;
    for (name, error) in dispatcher.close().await {
        tracing::warn!("fail to close the {} validator: {}", name, error);
    }

    let records = outcome.context("fail to verify the links")?;
    Reporter::new(&root).print(&records, json)
}

// The validators in the order they get to claim links
pub fn validators(
    config: &Config,
    root: &Path,
    renderer: Arc<dyn Renderer>,
    resolver: Arc<dyn MxResolver>,
) -> Result<Vec<Box<dyn Validator>>> {
    let mut validators: Vec<Box<dyn Validator>> = Vec::new();

    validators.push(Box::new(MailValidator::new(resolver)?));

    let client = Client::builder()
        .timeout(config.provider.web.timeout())
        .build()
        .context("fail to create the GitHub HTTP client")?;
    for (name, entry) in &config.provider.github {
        let base = entry.api.as_deref().unwrap_or(DEFAULT_API);
        let api = RestApi::new(client.clone(), base, &entry.owner, &entry.token);
        let validator = GitHubValidator::new(&entry.owner, Arc::new(api))
            .with_context(|| format!("fail to set up the GitHub provider '{}'", name))?;
        validators.push(Box::new(validator));
    }

    let web = &config.provider.web;
    let headers = HeaderRules::new(&web.header, &web.overrides()).context("invalid web provider headers")?;
    validators.push(Box::new(WebValidator::new(
        headers,
        web.timeout(),
        Arc::new(ChromeRenderer::new(web.timeout())),
    )?));

    validators.push(Box::new(FileValidator::new(root, renderer)));

    Ok(validators)
}

// Paths are reported relative to the root, so it has to look like the
// paths the walker produces
fn absolute(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}
