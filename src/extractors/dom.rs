//! Small query helpers over `scraper` documents.
//!
//! Selectors are literal strings; an invalid selector selects nothing, the
//! same way a missing element does, so extraction chains can simply move on
//! to the next rule.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::warn;

use super::text::collapse_whitespace;

pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(css, error = %e, "dom: invalid selector");
            None
        }
    }
}

/// All elements matching `css`, in document order.
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(s) => doc.select(&s).collect(),
        None => Vec::new(),
    }
}

pub fn select_in<'a>(el: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(s) => el.select(&s).collect(),
        None => Vec::new(),
    }
}

/// Direct text children of `el`, trimmed and skipped when blank.
pub fn own_texts(el: ElementRef<'_>) -> Vec<String> {
    el.children()
        .filter_map(|child| match child.value() {
            Node::Text(t) => {
                let s = t.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            _ => None,
        })
        .collect()
}

/// Every descendant text node joined and whitespace-collapsed.
pub fn full_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// First non-blank direct text of any element matching `css`.
pub fn first_own_text(doc: &Html, css: &str) -> Option<String> {
    select(doc, css)
        .into_iter()
        .flat_map(own_texts)
        .next()
}

/// Direct texts of every element matching `css`.
pub fn all_own_texts(doc: &Html, css: &str) -> Vec<String> {
    select(doc, css).into_iter().flat_map(own_texts).collect()
}

pub fn first_attr(doc: &Html, css: &str, attr: &str) -> Option<String> {
    select(doc, css)
        .into_iter()
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn all_attrs(doc: &Html, css: &str, attr: &str) -> Vec<String> {
    select(doc, css)
        .into_iter()
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Outer HTML of the first element matching `css`.
pub fn first_html(doc: &Html, css: &str) -> Option<String> {
    select(doc, css).into_iter().next().map(|el| el.html())
}

/// Tries each selector in turn and returns the first outer HTML found
/// together with the selector that produced it.
pub fn first_html_of<'s>(doc: &Html, selectors: &[&'s str]) -> Option<(&'s str, String)> {
    selectors
        .iter()
        .find_map(|css| first_html(doc, css).map(|html| (*css, html)))
}

/// Value of a "label: value" pair laid out as sibling spans, e.g.
/// `<span>Số hiệu:</span><span>12/2024/TT-BTC</span>` inside `container`.
pub fn labeled_value(doc: &Html, container: &str, label: &str) -> Option<String> {
    let spans = select(doc, &format!("{} span", container));
    for span in spans {
        if !full_text(span).contains(label) {
            continue;
        }
        let next = span
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|sib| sib.value().name() == "span");
        if let Some(value) = next.map(full_text).filter(|v| !v.is_empty()) {
            return Some(value);
        }
    }
    None
}
