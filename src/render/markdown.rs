// src/render/markdown.rs
// =============================================================================
// This module renders Markdown documents into sanitized HTML.
//
// We use the `pulldown-cmark` crate which:
// - Parses Markdown into events (heading, paragraph, link, etc.)
// - Follows the CommonMark specification
// - Can write those events back out as HTML
//
// On top of the plain rendering we do two things:
// 1. Give every heading an `id` generated from its text ("My Title" becomes
//    "my-title"), so `#my-title` links have something to point at
// 2. Run the HTML through `ammonia`, which removes scripts, event handlers
//    and any attribute that isn't safe, while keeping anchors and heading ids
//
// Rust concepts:
// - Iterators: The parser is an iterator of events we can rewrite
// - Pattern matching: To find heading start/end events
// - Lifetimes: Events borrow from the input text ('a)
// =============================================================================

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag};
use std::collections::HashMap;

use super::Renderer;

// The Markdown renderer.
//
// Holds the sanitizer configuration so it's built once per run, not once
// per document.
pub struct Markdown {
    sanitizer: ammonia::Builder<'static>,
}

impl Markdown {
    pub fn new() -> Self {
        let mut sanitizer = ammonia::Builder::default();
        sanitizer
            .add_generic_attributes(&["id"])
            .link_rel(Some("nofollow"));
        Self { sanitizer }
    }
}

impl Default for Markdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for Markdown {
    fn render(&self, payload: &[u8]) -> String {
        // Documents are expected to be UTF-8, but a stray invalid byte
        // shouldn't stop us from checking every other link in the file
        let text = String::from_utf8_lossy(payload);

        let parser = Parser::new_ext(&text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
        let events = with_heading_ids(parser);

        let mut unsafe_html = String::new();
        html::push_html(&mut unsafe_html, events.into_iter());

        self.sanitizer.clean(&unsafe_html).to_string()
    }

    fn slugify(&self, text: &str) -> String {
        slugify(text)
    }
}

// Creates the identifier for a heading.
//
// Letters and numbers are kept (lowercased). Any run of other characters
// becomes a single '-', and leading/trailing dashes are dropped.
//
// Examples:
//   "Hello World"        -> "hello-world"
//   "  What's new? (v2)" -> "what-s-new-v2"
//   "Überblick"          -> "überblick"
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

// Rewrites every heading so it carries an `id`.
//
// pulldown-cmark emits a heading as:
//   Start(Heading) -> Text / Code / Link events... -> End(Heading)
//
// We collect the visible text between start and end, build the slug, and
// replace the start/end events with raw HTML tags carrying the id. The
// events in between are left alone, so links inside headings still render.
fn with_heading_ids<'a>(parser: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut events: Vec<Event<'a>> = parser.collect();
    let mut seen: HashMap<String, usize> = HashMap::new();

    let mut index = 0;
    while index < events.len() {
        let level = match &events[index] {
            Event::Start(Tag::Heading(level, _, _)) => *level,
            _ => {
                index += 1;
                continue;
            }
        };

        let end = events[index..]
            .iter()
            .position(|event| matches!(event, Event::End(Tag::Heading(..))))
            .map(|offset| index + offset)
            .unwrap_or(events.len());

        let text: String = events[index + 1..end]
            .iter()
            .filter_map(|event| match event {
                Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
                _ => None,
            })
            .collect();

        let tag = heading_tag(level);
        let slug = slugify(&text);
        let open = if slug.is_empty() {
            format!("<{}>", tag)
        } else {
            format!("<{} id=\"{}\">", tag, unique_id(slug, &mut seen))
        };

        events[index] = Event::Html(CowStr::from(open));
        if end < events.len() {
            events[end] = Event::Html(CowStr::from(format!("</{}>\n", tag)));
        }

        index = end + 1;
    }

    events
}

// Two headings with the same text get "title", "title-1", "title-2", ...
fn unique_id(slug: String, seen: &mut HashMap<String, usize>) -> String {
    let count = seen.entry(slug.clone()).or_insert(0);
    let id = if *count == 0 {
        slug
    } else {
        format!("{}-{}", slug, count)
    };
    *count += 1;
    id
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why rewrite events instead of post-processing the HTML?
//    - The parser already knows exactly where every heading starts and ends
//    - Searching the HTML afterwards would mean parsing it a second time
//
// 2. What is CowStr?
//    - pulldown-cmark's "maybe borrowed, maybe owned" string
//    - Text from the input is borrowed; our generated tags are owned Strings
//    - CowStr::from(String) wraps an owned String so both fit in one Vec
//
// 3. Why sanitize at all?
//    - Markdown allows raw HTML, including <script> tags
//    - Anything we don't explicitly allow is removed before we query the HTML
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        Markdown::new().render(markdown.as_bytes())
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  What's new? (v2)"), "what-s-new-v2");
        assert_eq!(slugify("Überblick"), "überblick");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_heading_gets_id() {
        let html = render("# Getting Started\n\nSome text.");
        assert!(html.contains(r#"<h1 id="getting-started">Getting Started</h1>"#));
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let html = render("## Usage\n\n## Usage\n\n## Usage\n");
        assert!(html.contains(r#"id="usage""#));
        assert!(html.contains(r#"id="usage-1""#));
        assert!(html.contains(r#"id="usage-2""#));
    }

    #[test]
    fn test_link_inside_heading_still_renders() {
        let html = render("# [anchor](http://endpoint)");
        assert!(html.contains(r#"id="anchor""#));
        assert!(html.contains(r#"href="http://endpoint""#));
    }

    #[test]
    fn test_scripts_are_removed() {
        let html = render("Hello\n\n<script>alert('x')</script>\n\n[ok](ok.md)");
        assert!(!html.contains("<script"));
        assert!(html.contains(r#"href="ok.md""#));
    }

    #[test]
    fn test_raw_html_anchor_is_kept() {
        let html = render(r#"<a href="raw.md" onclick="evil()">raw</a>"#);
        assert!(html.contains(r#"href="raw.md""#));
        assert!(!html.contains("onclick"));
    }
}
