//! Small helpers over `scraper` shared by the extractors and templates.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid tag-gap regex"));

/// Parse a CSS selector, logging and skipping invalid ones.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(css, error = %e, "Invalid CSS selector");
            None
        }
    }
}

/// First element in the document matching `css`.
pub fn first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    document.select(&sel).next()
}

/// First descendant of `element` matching `css`.
pub fn first_in<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    element.select(&sel).next()
}

/// All elements in the document matching `css`.
pub fn all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    selector(css)
        .map(|sel| document.select(&sel).collect())
        .unwrap_or_default()
}

/// All descendants of `element` matching `css`.
pub fn all_in<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    selector(css)
        .map(|sel| element.select(&sel).collect())
        .unwrap_or_default()
}

/// Text content with whitespace runs collapsed and ends trimmed.
pub fn text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    collapse_whitespace(&raw)
}

/// Text content with line breaks kept and ends trimmed.
pub fn raw_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed, non-empty attribute value.
pub fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Remove every element matching any of `selectors` from the document.
pub fn remove_all(document: &mut Html, selectors: &[&str]) {
    for css in selectors {
        let Some(sel) = selector(css) else { continue };
        let ids: Vec<_> = document.select(&sel).map(|el| el.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

/// Remove paragraphs that have no text and no images.
pub fn remove_empty_paragraphs(document: &mut Html) {
    let Some(p) = selector("p") else { return };
    let ids: Vec<_> = document
        .select(&p)
        .filter(|el| el.text().all(|t| t.trim().is_empty()) && first_in(*el, "img").is_none())
        .map(|el| el.id())
        .collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Serialise an element and squeeze the whitespace out of its markup.
pub fn compact_html(element: ElementRef<'_>) -> String {
    let html = element.html();
    let html = WHITESPACE.replace_all(&html, " ");
    BETWEEN_TAGS.replace_all(&html, "><").trim().to_string()
}

/// Escape text for inclusion in HTML bodies and attribute values.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
