// src/render/query.rs
// =============================================================================
// This module answers questions about HTML documents.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Used by:
// - the scanner, to pull every href out of a rendered document
// - the file validator, to look for a heading matching a fragment
// - the web validator, to look for an anchor matching a fragment
// =============================================================================

use scraper::{Html, Selector};

// A heading found in a document (h1 to h6)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// The generated (or hand written) id, if any
    pub id: Option<String>,
    /// The visible text, including text of links inside the heading
    pub text: String,
}

// Finds every element `tag` carrying attribute `attr` and returns the values.
//
// Example:
//   html = "<a href='/docs'>Docs</a><a>no href</a>"
//   find_attribute(html, "a", "href") = ["/docs"]
pub fn find_attribute(html: &str, tag: &str, attr: &str) -> Vec<String> {
    let selector = match Selector::parse(&format!("{}[{}]", tag, attr)) {
        Ok(selector) => selector,
        Err(e) => {
            tracing::warn!("invalid selector {}[{}]: {:?}", tag, attr, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::to_string)
        .collect()
}

// Every href of every <a> in the document, in document order
pub fn hrefs(html: &str) -> Vec<String> {
    find_attribute(html, "a", "href")
}

// Is there an <a href="..."> with exactly this value?
pub fn has_anchor(html: &str, href: &str) -> bool {
    hrefs(html).iter().any(|candidate| candidate == href)
}

// All headings h1..h6 in document order
pub fn headings(html: &str) -> Vec<Heading> {
    // The selector is a constant and known to be valid
    let selector = Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid heading selector");

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .map(|element| Heading {
            id: element.value().attr("id").map(str::to_string),
            text: element.text().collect::<String>().trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hrefs_in_order() {
        let html = r#"
            <a href="https://rust-lang.org">Rust</a>
            <a name="no-href">skip</a>
            <a href="/docs">Docs</a>
        "#;
        assert_eq!(hrefs(html), vec!["https://rust-lang.org", "/docs"]);
    }

    #[test]
    fn test_has_anchor() {
        let html = r##"<a href="#title">Title</a>"##;
        assert!(has_anchor(html, "#title"));
        assert!(!has_anchor(html, "#other"));
    }

    #[test]
    fn test_find_attribute_other_tags() {
        let html = r#"<img src="logo.png"><img alt="x">"#;
        assert_eq!(find_attribute(html, "img", "src"), vec!["logo.png"]);
    }

    #[test]
    fn test_headings_with_nested_link() {
        let html = r#"<h2 id="intro"><a href="x">Intro</a> text</h2><h5>Plain</h5>"#;
        let found = headings(html);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id.as_deref(), Some("intro"));
        assert_eq!(found[0].text, "Intro text");
        assert_eq!(found[1].id, None);
        assert_eq!(found[1].text, "Plain");
    }
}
