// src/render/mod.rs
// =============================================================================
// This module turns documents into HTML and answers questions about HTML.
//
// Submodules:
// - markdown: renders Markdown into sanitized HTML with heading ids
// - query: finds anchors and headings inside an HTML document
//
// The scanner and the file validator both render through the same Renderer,
// so the heading ids a link points at are the ids the validator looks for.
// =============================================================================

mod markdown;
mod query;

pub use markdown::Markdown;
pub use query::{has_anchor, headings, hrefs};

// Anything that can turn a raw document into HTML.
//
// `Send + Sync` because validators share one renderer across awaits.
pub trait Renderer: Send + Sync {
    /// Render raw document bytes into sanitized HTML
    fn render(&self, payload: &[u8]) -> String;

    /// The identifier this renderer would give a heading with this text
    fn slugify(&self, text: &str) -> String;
}
