//! HTML metadata and link extraction.
//!
//! `parse` never fails: a malformed or unexpected document just yields a
//! `ParsedPage` with more `None`s and fewer links. Parse anomalies are
//! tolerated by construction, not caught — `scraper` itself doesn't
//! produce parse errors for arbitrary input.

mod html;

pub use html::extract_text;

use std::collections::HashSet;

use scraper::Html;
use url::Url;

use voidcrawler_core::ParsedPage;
use voidcrawler_normalizer::{is_valid_url, resolve_url};

const MAX_TITLE_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Extract title/description/favicon/og-image/links from a page body.
/// `base_url` is the (possibly redirected) URL the body was fetched from,
/// used to resolve every relative reference to an absolute one.
pub fn parse(body: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(body);

    let title = extract_title(&document).map(|t| truncate(&t, MAX_TITLE_LEN));
    let description = extract_description(&document).map(|d| truncate(&d, MAX_DESCRIPTION_LEN));
    let favicon = extract_favicon(&document, base_url);
    let og_image = extract_og_image(&document, base_url);
    let links = extract_links(&document, base_url);

    ParsedPage {
        title,
        description,
        favicon,
        og_image,
        links,
    }
}

fn extract_title(doc: &Html) -> Option<String> {
    html::first_non_empty_text(doc, html::title_selector())
        .or_else(|| html::first_non_empty_attr(doc, html::meta_og_title_selector(), "content"))
        .or_else(|| html::first_non_empty_text(doc, html::h1_selector()))
}

fn extract_description(doc: &Html) -> Option<String> {
    html::first_non_empty_attr(doc, html::meta_description_selector(), "content")
        .or_else(|| html::first_non_empty_attr(doc, html::meta_og_description_selector(), "content"))
}

/// Resolved against `base` unless the href is a `data:` URI, which is
/// already self-contained and must not be joined with the page URL.
fn extract_favicon(doc: &Html, base: &Url) -> Option<String> {
    let href = html::first_non_empty_attr(doc, html::link_icon_selector(), "href");
    match href {
        Some(h) if h.starts_with("data:") => Some(h),
        Some(h) => resolve_url(base.as_str(), &h),
        None => Some(base.join("/favicon.ico").map(|u| u.to_string()).unwrap_or_else(|_| "/favicon.ico".to_string())),
    }
}

fn extract_og_image(doc: &Html, base: &Url) -> Option<String> {
    let raw = html::first_non_empty_attr(doc, html::meta_og_image_selector(), "content")
        .or_else(|| html::first_non_empty_attr(doc, html::meta_twitter_image_selector(), "content"))?;
    if raw.starts_with("data:") {
        Some(raw)
    } else {
        resolve_url(base.as_str(), &raw)
    }
}

/// Every `<a href>` resolved to absolute form, filtered by `is_valid_url`,
/// and deduplicated within the page (document order preserved, which is
/// what lets the orchestrator insert edges in document order too).
fn extract_links(doc: &Html, base: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(html::anchor_selector()) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() {
            continue;
        }
        let Some(resolved) = resolve_url(base.as_str(), href) else {
            continue;
        };
        if !is_valid_url(&resolved) {
            continue;
        }
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }

    links
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn title_prefers_title_tag() {
        let html = "<html><head><title>  Hello World  </title></head><body></body></html>";
        let page = parse(html, &base());
        assert_eq!(page.title.as_deref(), Some("Hello World"));
    }

    #[test]
    fn title_falls_back_to_og_title_then_h1() {
        let html = r#"<html><head><meta property="og:title" content="OG Title"></head><body></body></html>"#;
        assert_eq!(parse(html, &base()).title.as_deref(), Some("OG Title"));

        let html2 = "<html><body><h1>Heading One</h1></body></html>";
        assert_eq!(parse(html2, &base()).title.as_deref(), Some("Heading One"));
    }

    #[test]
    fn title_truncated_to_500_chars() {
        let long = "x".repeat(600);
        let html = format!("<html><head><title>{long}</title></head></html>");
        let page = parse(&html, &base());
        assert_eq!(page.title.unwrap().chars().count(), 500);
    }

    #[test]
    fn description_prefers_meta_description_over_og() {
        let html = r#"<html><head>
            <meta name="description" content="Meta desc">
            <meta property="og:description" content="OG desc">
        </head></html>"#;
        assert_eq!(parse(html, &base()).description.as_deref(), Some("Meta desc"));
    }

    #[test]
    fn favicon_defaults_to_favicon_ico() {
        let page = parse("<html><body></body></html>", &base());
        assert_eq!(page.favicon.as_deref(), Some("https://example.com/favicon.ico"));
    }

    #[test]
    fn favicon_resolved_against_base_unless_data_uri() {
        let html = r#"<html><head><link rel="icon" href="/static/icon.png"></head></html>"#;
        let page = parse(html, &base());
        assert_eq!(page.favicon.as_deref(), Some("https://example.com/static/icon.png"));

        let html2 = r#"<html><head><link rel="shortcut icon" href="data:image/png;base64,AAA"></head></html>"#;
        let page2 = parse(html2, &base());
        assert_eq!(page2.favicon.as_deref(), Some("data:image/png;base64,AAA"));
    }

    #[test]
    fn links_resolved_filtered_and_deduped() {
        let html = r#"<html><body>
            <a href="/a">a</a>
            <a href="/a">a again</a>
            <a href="/b.png">image</a>
            <a href="javascript:void(0)">js</a>
            <a href="https://other.com/c">external</a>
        </body></html>"#;
        let page = parse(html, &base());
        assert_eq!(
            page.links,
            vec!["https://example.com/a", "https://other.com/c"]
        );
    }

    #[test]
    fn extract_text_strips_chrome_and_collapses_whitespace() {
        let html = r#"<html><body>
            <nav>Nav link</nav>
            <script>var x = 1;</script>
            <p>Real   content   here</p>
            <footer>Footer</footer>
        </body></html>"#;
        let text = extract_text(html);
        assert!(text.contains("Real content here"));
        assert!(!text.contains("Nav link"));
        assert!(!text.contains("Footer"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn extract_text_truncates_to_10000_chars() {
        let long = "word ".repeat(5000);
        let html = format!("<html><body>{long}</body></html>");
        assert!(extract_text(&html).chars().count() <= 10_000);
    }
}
