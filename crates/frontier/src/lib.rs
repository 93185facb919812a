//! FIFO work queue with a dedup set and an in-progress set.
//!
//! Dequeue order is strict FIFO, which is what turns the orchestrator's
//! batch loop into a breadth-first traversal: everything discovered at
//! depth `d` is enqueued before anything at depth `d+1` is dequeued.
//!
//! `seen` only grows — once a normalized URL lands in it, it never
//! leaves, even after the item finishes processing. `in_progress` is
//! the subset of `seen` whose item has been handed out by `next_batch`
//! but not yet passed to `complete`; `is_empty` treats a non-empty
//! `in_progress` as "not done" so the orchestrator doesn't terminate
//! while a worker is still mid-fetch and may enqueue more links.

use std::collections::VecDeque;

use dashmap::DashSet;
use tokio::sync::Mutex;

use voidcrawler_core::CrawlTask;
use voidcrawler_normalizer::normalize;

pub struct Frontier {
    queue: Mutex<VecDeque<CrawlTask>>,
    seen: DashSet<String>,
    in_progress: DashSet<String>,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            seen: DashSet::new(),
            in_progress: DashSet::new(),
        }
    }

    /// Enqueue `url` at `depth`, discovered from `source_id`. Returns
    /// `false` (without touching the queue) if the normalized URL is
    /// already queued, in progress, or done.
    pub async fn add(&self, url: &str, depth: u32, source_id: Option<String>) -> bool {
        let key = normalize(url);
        if self.seen.contains(&key) || self.in_progress.contains(&key) {
            return false;
        }
        self.seen.insert(key);
        self.queue.lock().await.push_back(CrawlTask {
            url: url.to_string(),
            depth,
            source_id,
        });
        tracing::debug!(url, depth, "enqueued");
        true
    }

    /// Remove up to `n` items from the front of the queue, marking
    /// each one's normalized URL as in-progress. Preserves enqueue
    /// order.
    pub async fn next_batch(&self, n: usize) -> Vec<CrawlTask> {
        let mut queue = self.queue.lock().await;
        let mut batch = Vec::with_capacity(n.min(queue.len()));
        while batch.len() < n {
            let Some(task) = queue.pop_front() else {
                break;
            };
            self.in_progress.insert(normalize(&task.url));
            batch.push(task);
        }
        batch
    }

    /// Mark `url` as done: its normalized form leaves `in_progress` but
    /// stays in `seen` forever.
    pub async fn complete(&self, url: &str) {
        self.in_progress.remove(&normalize(url));
    }

    /// True iff there is nothing queued and nothing in flight.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty() && self.in_progress.is_empty()
    }

    pub async fn queued_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub fn in_progress_len(&self) -> usize {
        self.in_progress.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_dedups_by_normalized_url() {
        let f = Frontier::new();
        assert!(f.add("https://example.com/foo/", 0, None).await);
        assert!(!f.add("https://example.com/foo", 0, None).await);
        assert!(!f.add("https://example.com/foo#x", 0, None).await);
        assert_eq!(f.queued_len().await, 1);
    }

    #[tokio::test]
    async fn next_batch_preserves_fifo_order() {
        let f = Frontier::new();
        f.add("https://example.com/a", 0, None).await;
        f.add("https://example.com/b", 0, None).await;
        f.add("https://example.com/c", 0, None).await;

        let batch = f.next_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].url, "https://example.com/a");
        assert_eq!(batch[1].url, "https://example.com/b");

        let rest = f.next_batch(10).await;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].url, "https://example.com/c");
    }

    #[tokio::test]
    async fn in_progress_blocks_requeue_until_complete() {
        let f = Frontier::new();
        f.add("https://example.com/a", 0, None).await;
        let batch = f.next_batch(1).await;
        assert_eq!(batch.len(), 1);

        assert!(!f.add("https://example.com/a", 1, None).await);
        assert!(!f.is_empty().await);

        f.complete("https://example.com/a").await;
        assert!(f.is_empty().await);
        // still in `seen` forever, so re-adding after completion also fails
        assert!(!f.add("https://example.com/a", 1, None).await);
    }

    #[tokio::test]
    async fn empty_frontier_reports_empty() {
        let f = Frontier::new();
        assert!(f.is_empty().await);
    }

    #[tokio::test]
    async fn partial_batch_when_fewer_items_than_requested() {
        let f = Frontier::new();
        f.add("https://example.com/a", 0, None).await;
        let batch = f.next_batch(5).await;
        assert_eq!(batch.len(), 1);
        assert!(f.next_batch(5).await.is_empty());
    }
}
