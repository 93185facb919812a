use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A crawled (or attempted) web page, as it will be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub url: String,
    pub normalized_url: String,
    pub domain: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub thumbnail: Option<Vec<u8>>,
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub status_code: Option<u16>,
    pub is_alive: bool,
    pub depth: u32,
    pub crawled_at: chrono::DateTime<chrono::Utc>,
    pub last_visited: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A hyperlink discovered on a source page, pointing at `target_url`.
///
/// `target_url` is stored normalized so it shares a key space with
/// `Node::normalized_url` — this is what makes back-fill (see
/// `Storage::update_edge_targets`) line up against differently-surfaced
/// links to the same logical page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: i64,
    pub source_id: String,
    pub target_url: String,
    pub target_id: Option<String>,
}

/// A unit of work in the frontier: a URL to fetch, at a given depth,
/// discovered from (optionally) a source node.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
    pub source_id: Option<String>,
}

/// HTML metadata and links extracted from a page body, independent of
/// any HTTP concerns (status code, transport errors).
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub og_image: Option<String>,
    pub links: Vec<String>,
}

/// The fetcher's output for one URL: either a classified HTTP response
/// (successful or not) or a transport failure (`status_code == 0`).
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    pub url: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub og_image: Option<String>,
    pub links: Vec<String>,
    pub error: Option<String>,
}

impl CrawlResult {
    /// A transport failure never reached the server: DNS, connect,
    /// TLS, or read timeout. Distinguished from an HTTP error by
    /// `status_code == 0`.
    pub fn is_transport_failure(&self) -> bool {
        self.status_code == 0 && self.error.is_some()
    }
}

/// Running counters for a single `crawl()` invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub nodes_found: u64,
    pub nodes_crawled: u64,
    pub edges_found: u64,
    pub errors: u64,
    pub domains: HashSet<String>,
}

impl CrawlStats {
    /// Pretty-printed JSON, for callers that want machine-readable
    /// output instead of (or alongside) the `onProgress`/`onComplete`
    /// event stream.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_round_trip_through_json() {
        let mut stats = CrawlStats::default();
        stats.nodes_crawled = 3;
        stats.domains.insert("example.com".to_string());

        let json = stats.to_json().unwrap();
        let back: CrawlStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes_crawled, 3);
        assert!(back.domains.contains("example.com"));
    }
}
