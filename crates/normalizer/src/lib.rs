//! URL canonicalization and crawlability checks.
//!
//! `normalize` is the sole dedup key for the frontier and the storage
//! layer, so it must be idempotent: `normalize(normalize(x)) == normalize(x)`.

use url::Url;

/// File extensions that are never worth crawling as HTML pages.
const BLOCKED_EXTENSIONS: &[&str] = &[
    // images
    ".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp", ".svg", ".ico", ".tiff",
    // fonts
    ".woff", ".woff2", ".ttf", ".eot", ".otf",
    // archives
    ".zip", ".rar", ".7z", ".tar", ".gz", ".bz2",
    // office docs
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    // media
    ".mp3", ".mp4", ".avi", ".mov", ".wav", ".ogg", ".webm", ".flac",
    // data/code, not pages
    ".css", ".js", ".json", ".xml", ".rss",
];

const UNCRAWLABLE_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "#"];

/// Canonicalize a URL for dedup. Falls back to the input unchanged on
/// parse failure — normalization must never fail the caller.
pub fn normalize(input: &str) -> String {
    let with_scheme = ensure_scheme(input);
    let Ok(url) = Url::parse(&with_scheme) else {
        tracing::debug!(input, "normalize: parse failed, falling back to input");
        return input.to_string();
    };

    let host = match url.host_str() {
        Some(h) => strip_www(h).to_lowercase(),
        None => return input.to_string(),
    };

    let path = url.path();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let mut out = host;
    // `Url::port()` is `None` whenever the port is absent or is the
    // scheme's default, so this only ever appends a *non-default* port --
    // exactly the case the normalized key needs to keep distinct.
    if let Some(port) = url.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(path);

    if url.query().is_some() {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !pairs.is_empty() {
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('?');
            for (i, (k, v)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push('&');
                }
                out.push_str(k);
                out.push('=');
                out.push_str(v);
            }
        }
    }

    out
}

/// Lowercased hostname with a leading `www.` stripped. Falls back to
/// the input on parse failure.
pub fn extract_domain(input: &str) -> String {
    let with_scheme = ensure_scheme(input);
    match Url::parse(&with_scheme) {
        Ok(url) => match url.host_str() {
            Some(h) => strip_www(h).to_lowercase(),
            None => input.to_string(),
        },
        Err(_) => input.to_string(),
    }
}

/// Resolve `relative` against `base` per RFC 3986. Protocol-relative
/// references (`//host/path`) inherit `base`'s scheme because that is
/// how `Url::join` already treats a scheme-less authority reference.
pub fn resolve_url(base: &str, relative: &str) -> Option<String> {
    let base_url = Url::parse(&ensure_scheme(base)).ok()?;
    base_url.join(relative).ok().map(|u| u.to_string())
}

/// True iff `url` is crawlable: http(s) scheme, not one of the
/// unreachable pseudo-schemes, and not pointing at a non-HTML asset by
/// extension.
pub fn is_valid_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if UNCRAWLABLE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return false;
    }

    let with_scheme = ensure_scheme(url);
    let Ok(parsed) = Url::parse(&with_scheme) else {
        return false;
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    let path = parsed.path().to_lowercase();
    if BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }

    true
}

/// Domain equality after extraction.
pub fn is_same_domain(a: &str, b: &str) -> bool {
    extract_domain(a) == extract_domain(b)
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn ensure_scheme(input: &str) -> String {
    if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    }
}
