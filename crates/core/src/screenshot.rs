//! The screenshot/thumbnail capture hook.
//!
//! Rendering and capturing a page is an external collaborator (a
//! headless browser, typically); the orchestrator only needs an
//! optional async callback that returns bytes or nothing. A failure
//! here is never fatal to the crawl — a node is still created with
//! `thumbnail = None`.

use async_trait::async_trait;

#[async_trait]
pub trait ScreenshotHook: Send + Sync {
    async fn capture(&self, url: &str) -> Option<Vec<u8>>;
}

/// The default hook, used when `CrawlerOptions::take_screenshots` is
/// false: never captures anything.
pub struct NoScreenshots;

#[async_trait]
impl ScreenshotHook for NoScreenshots {
    async fn capture(&self, _url: &str) -> Option<Vec<u8>> {
        None
    }
}
