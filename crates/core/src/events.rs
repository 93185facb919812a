use crate::types::CrawlStats;

/// Host-supplied callbacks fired at well-defined points of a crawl.
///
/// All methods are optional (default no-ops) so a caller only
/// implements the ones it cares about — the same shape as the
/// `NetworkDriver` trait's defaulted methods in the teacher's core
/// crate.
pub trait CrawlEvents: Send + Sync {
    fn on_start(&self) {}
    fn on_node(&self, _url: &str, _title: Option<&str>, _depth: u32) {}
    fn on_error(&self, _url: &str, _error: &str) {}
    fn on_progress(&self, _stats: &CrawlStats) {}
    fn on_complete(&self, _stats: &CrawlStats) {}
}

/// The default event sink: logs via `tracing` instead of doing nothing,
/// so a crawl run always has an observable trail even if the caller
/// doesn't supply its own sink.
pub struct TracingEvents;

impl CrawlEvents for TracingEvents {
    fn on_start(&self) {
        tracing::info!("crawl started");
    }

    fn on_node(&self, url: &str, title: Option<&str>, depth: u32) {
        tracing::info!(url, title, depth, "node crawled");
    }

    fn on_error(&self, url: &str, error: &str) {
        tracing::warn!(url, error, "crawl error");
    }

    fn on_progress(&self, stats: &CrawlStats) {
        tracing::debug!(
            nodes_crawled = stats.nodes_crawled,
            edges_found = stats.edges_found,
            errors = stats.errors,
            "progress"
        );
    }

    fn on_complete(&self, stats: &CrawlStats) {
        tracing::info!(
            nodes_crawled = stats.nodes_crawled,
            edges_found = stats.edges_found,
            errors = stats.errors,
            "crawl complete"
        );
    }
}
