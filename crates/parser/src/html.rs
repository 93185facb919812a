//! Selector definitions and low-level extraction helpers.
//!
//! Selectors are parsed once behind `Lazy` rather than per call — `scraper`'s
//! `Selector::parse` does real work (building a matcher), and every page we
//! parse reuses the same handful of selectors.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name='description' i]").unwrap());
static META_OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:title']").unwrap());
static META_OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:description']").unwrap());
static META_OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:image']").unwrap());
static META_TWITTER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name='twitter:image']").unwrap());
static LINK_ICON: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel='icon' i], link[rel='shortcut icon' i], link[rel='apple-touch-icon' i]")
        .unwrap()
});
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Tags whose subtree is never meaningful page text.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "canvas", "header", "footer", "nav", "aside",
];

pub(crate) fn first_non_empty_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

pub(crate) fn first_non_empty_attr(doc: &Html, sel: &Selector, attr: &str) -> Option<String> {
    doc.select(sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|s| s.trim().to_string())
        .find(|t| !t.is_empty())
}

pub(crate) fn title_selector() -> &'static Selector {
    &TITLE
}
pub(crate) fn h1_selector() -> &'static Selector {
    &H1
}
pub(crate) fn meta_description_selector() -> &'static Selector {
    &META_DESCRIPTION
}
pub(crate) fn meta_og_title_selector() -> &'static Selector {
    &META_OG_TITLE
}
pub(crate) fn meta_og_description_selector() -> &'static Selector {
    &META_OG_DESCRIPTION
}
pub(crate) fn meta_og_image_selector() -> &'static Selector {
    &META_OG_IMAGE
}
pub(crate) fn meta_twitter_image_selector() -> &'static Selector {
    &META_TWITTER_IMAGE
}
pub(crate) fn link_icon_selector() -> &'static Selector {
    &LINK_ICON
}
pub(crate) fn anchor_selector() -> &'static Selector {
    &ANCHOR
}

/// Strip non-content subtrees and collapse whitespace. The resulting text
/// is what a reader would see, minus chrome and script noise.
pub fn extract_text(html_str: &str) -> String {
    let document = Html::parse_document(html_str);
    let mut skip_selectors = Vec::with_capacity(STRIPPED_TAGS.len());
    for tag in STRIPPED_TAGS {
        if let Ok(sel) = Selector::parse(tag) {
            skip_selectors.push(sel);
        }
    }

    // Collect the byte ranges owned by stripped elements, then walk all
    // text nodes and skip the ones inside those ranges.
    let skipped: std::collections::HashSet<_> = skip_selectors
        .iter()
        .flat_map(|sel| document.select(sel))
        .flat_map(|el| el.descendants().map(|d| d.id()))
        .collect();

    let mut text = String::new();
    for node in document.tree.root().descendants() {
        if skipped.contains(&node.id()) {
            continue;
        }
        if let Some(t) = node.value().as_text() {
            text.push_str(t);
            text.push(' ');
        }
    }

    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(10_000).collect()
}
