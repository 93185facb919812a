//! The crawl orchestrator: binds the frontier, rate limiter, fetcher and
//! storage into a bounded-concurrency BFS pipeline.
//!
//! `Crawler` is a value type built fresh per `crawl()` caller -- there is
//! no module-level singleton here, unlike the teacher's overlay-network
//! drivers which are long-lived process state. Every collaborator is an
//! explicit `Arc` field, threaded into spawned tasks rather than reached
//! for through statics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use voidcrawler_core::{CrawlError, CrawlEvents, CrawlStats, CrawlerOptions, RobotsPolicy, ScreenshotHook};
use voidcrawler_fetcher::Fetcher;
use voidcrawler_frontier::Frontier;
use voidcrawler_normalizer::{extract_domain, is_same_domain, normalize};
use voidcrawler_ratelimiter::RateLimiter;
use voidcrawler_storage::{NewNode, Storage};

/// How long the orchestrator loop sleeps when the frontier has nothing
/// ready to dequeue but work may still be in flight. This is the sole
/// coupling between producer (in-flight tasks, which may enqueue more)
/// and consumer (this loop) -- it avoids a busy wait.
const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct Crawler {
    storage: Arc<Storage>,
    frontier: Arc<Frontier>,
    rate_limiter: Arc<RateLimiter>,
    fetcher: Arc<Fetcher>,
    options: CrawlerOptions,
    events: Arc<dyn CrawlEvents>,
    robots: Arc<dyn RobotsPolicy>,
    screenshot: Arc<dyn ScreenshotHook>,
    stats: Arc<Mutex<CrawlStats>>,
    running: Arc<AtomicBool>,
}

impl Crawler {
    pub fn new(
        storage: Arc<Storage>,
        options: CrawlerOptions,
        events: Arc<dyn CrawlEvents>,
        robots: Arc<dyn RobotsPolicy>,
        screenshot: Arc<dyn ScreenshotHook>,
    ) -> anyhow::Result<Self> {
        let fetcher = Fetcher::new(&options.user_agent, Duration::from_millis(options.timeout_ms))?;
        Ok(Self {
            storage,
            frontier: Arc::new(Frontier::new()),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_millis(options.rate_limit_ms))),
            fetcher: Arc::new(fetcher),
            options,
            events,
            robots,
            screenshot,
            stats: Arc::new(Mutex::new(CrawlStats::default())),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Signal the orchestrator loop to stop after its current batch.
    /// In-flight `processUrl` tasks run to completion; they are not
    /// interrupted mid-request.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn stats(&self) -> CrawlStats {
        self.stats.lock().await.clone()
    }

    /// Drive a crawl to completion starting from `seed_url`. Terminates
    /// when the frontier is empty (queue and in-flight both drained),
    /// `max_nodes` is reached, or `stop()` was called.
    pub async fn crawl(&self, seed_url: &str) -> anyhow::Result<CrawlStats> {
        *self.stats.lock().await = CrawlStats::default();
        self.running.store(true, Ordering::SeqCst);

        let seed_domain = extract_domain(seed_url);
        info!(seed_url, seed_domain, "crawl starting");
        self.frontier.add(seed_url, 0, None).await;
        self.events.on_start();

        loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("crawl stopped externally");
                break;
            }
            if self.frontier.is_empty().await {
                info!("frontier drained, crawl complete");
                break;
            }

            let nodes_crawled = self.stats.lock().await.nodes_crawled;
            if nodes_crawled >= self.options.max_nodes {
                info!(max_nodes = self.options.max_nodes, "max nodes reached");
                break;
            }

            // Every dequeued task can produce at most one node, so capping
            // the batch at the remaining budget (not just `concurrency`)
            // keeps `nodes_crawled` from ever overshooting `max_nodes` --
            // a full-size batch taken near the cap would otherwise push
            // past it before the top-of-loop check runs again.
            let remaining = (self.options.max_nodes - nodes_crawled).min(usize::MAX as u64) as usize;
            let batch_size = self.options.concurrency.min(remaining);

            let batch = self.frontier.next_batch(batch_size).await;
            if batch.is_empty() {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }

            let mut handles = Vec::with_capacity(batch.len());
            for task in batch {
                let this = self.clone_handles();
                handles.push(tokio::spawn(async move {
                    this.process_url(&task.url, task.depth).await
                }));
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "crawl task panicked");
                }
            }

            let stats = self.stats.lock().await.clone();
            self.events.on_progress(&stats);
        }

        let stats = self.stats.lock().await.clone();
        self.events.on_complete(&stats);
        Ok(stats)
    }

    /// A lightweight clone carrying only what a spawned task needs --
    /// cheap `Arc` clones, not a deep copy of crawl state.
    fn clone_handles(&self) -> TaskHandles {
        TaskHandles {
            storage: self.storage.clone(),
            frontier: self.frontier.clone(),
            rate_limiter: self.rate_limiter.clone(),
            fetcher: self.fetcher.clone(),
            options: self.options.clone(),
            events: self.events.clone(),
            robots: self.robots.clone(),
            screenshot: self.screenshot.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// The subset of `Crawler` state a single `process_url` invocation needs,
/// cloned once per spawned task.
#[derive(Clone)]
struct TaskHandles {
    storage: Arc<Storage>,
    frontier: Arc<Frontier>,
    rate_limiter: Arc<RateLimiter>,
    fetcher: Arc<Fetcher>,
    options: CrawlerOptions,
    events: Arc<dyn CrawlEvents>,
    robots: Arc<dyn RobotsPolicy>,
    screenshot: Arc<dyn ScreenshotHook>,
    stats: Arc<Mutex<CrawlStats>>,
}

impl TaskHandles {
    async fn process_url(&self, url: &str, depth: u32) {
        let result = self.process_url_inner(url, depth).await;
        self.frontier.complete(url).await;
        if let Err(e) = result {
            warn!(url, error = %e, "error processing url");
        }
    }

    /// The edge from this URL's source page was already recorded when the
    /// parent extracted its links (see the loop at the bottom of this
    /// function, run for the parent); this function only needs to resolve
    /// it via back-fill, not re-insert it -- otherwise a URL reached by
    /// several distinct anchors on its parent would be double-counted.
    async fn process_url_inner(&self, url: &str, depth: u32) -> anyhow::Result<()> {
        let domain = extract_domain(url);

        if self.options.respect_robots_txt {
            let decision = self.robots.check(url, &self.options.user_agent);
            if !decision.allowed {
                debug!(url, "robots.txt disallows fetch");
                return Ok(());
            }
        }

        self.rate_limiter.wait(&domain).await;

        let result = self.fetcher.fetch(url).await;

        if result.is_transport_failure() {
            let error = result.error.unwrap_or_else(|| "unknown transport error".to_string());
            self.stats.lock().await.errors += 1;
            self.events.on_error(url, &error);
            return Ok(());
        }

        let normalized = normalize(url);
        let is_alive = (200..400).contains(&result.status_code);

        let thumbnail = if self.options.take_screenshots {
            self.screenshot.capture(url).await
        } else {
            None
        };

        let mut rng = rand::thread_rng();
        let new_node = NewNode {
            url: url.to_string(),
            normalized_url: normalized.clone(),
            domain: domain.clone(),
            title: result.title.clone(),
            description: result.description.clone(),
            favicon: result.favicon.clone(),
            thumbnail,
            position_x: rng.gen_range(-10.0..=10.0),
            position_y: rng.gen_range(-10.0..=10.0),
            position_z: rng.gen_range(-10.0..=10.0),
            status_code: Some(result.status_code),
            is_alive,
            depth,
        };

        let node_id = self
            .storage
            .insert_node(new_node)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;

        {
            let mut stats = self.stats.lock().await;
            stats.nodes_found += 1;
            stats.nodes_crawled += 1;
            stats.domains.insert(domain.clone());
        }
        self.events.on_node(url, result.title.as_deref(), depth);

        // Back-fill: resolve every prior forward-reference to this URL.
        self.storage
            .update_edge_targets(&normalized, &node_id)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;

        if depth < self.options.max_depth {
            for link in &result.links {
                if self.options.stay_on_domain && !is_same_domain(link, url) {
                    continue;
                }

                let link_normalized = normalize(link);

                // Eager lookup: if the target is already known, insert the
                // edge with its id populated immediately -- otherwise a
                // back-fill keyed on this target_url would never fire.
                if let Some(existing) = self
                    .storage
                    .get_node_by_normalized_url(&link_normalized)
                    .await
                    .map_err(|e| CrawlError::Storage(e.to_string()))?
                {
                    self.storage
                        .insert_edge(&node_id, &link_normalized, Some(&existing.id))
                        .await
                        .map_err(|e| CrawlError::Storage(e.to_string()))?;
                    self.stats.lock().await.edges_found += 1;
                    continue;
                }

                // An edge is recorded for every extracted link regardless of
                // whether the frontier already has this normalized URL
                // queued -- the page graph reflects every hyperlink found,
                // while the frontier only dedups *crawl work*.
                self.frontier.add(link, depth + 1, Some(node_id.clone())).await;
                self.storage
                    .insert_edge(&node_id, &link_normalized, None)
                    .await
                    .map_err(|e| CrawlError::Storage(e.to_string()))?;
                self.stats.lock().await.edges_found += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voidcrawler_core::{AllowAllRobots, NoScreenshots, TracingEvents};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A seed page linking to far more pages than `max_nodes` allows, so a
    /// full-size batch taken near the cap would overshoot it if the batch
    /// weren't clamped to the remaining budget.
    async fn seed_with_many_links(server: &MockServer, count: usize) {
        let links: String = (0..count)
            .map(|i| format!("<a href=\"/page{i}\">{i}</a>"))
            .collect();
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html><body>{links}</body></html>"))
                    .insert_header("content-type", "text/html"),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn max_nodes_cap_holds_with_concurrency_greater_than_remaining() {
        let server = MockServer::start().await;
        seed_with_many_links(&server, 10).await;

        let storage = Arc::new(Storage::in_memory().await.unwrap());
        let options = CrawlerOptions {
            max_depth: 2,
            max_nodes: 3,
            concurrency: 5,
            rate_limit_ms: 0,
            respect_robots_txt: false,
            ..CrawlerOptions::default()
        };
        let crawler = Crawler::new(
            storage.clone(),
            options,
            Arc::new(TracingEvents),
            Arc::new(AllowAllRobots),
            Arc::new(NoScreenshots),
        )
        .unwrap();

        let stats = crawler.crawl(&server.uri()).await.unwrap();

        assert!(
            stats.nodes_crawled <= 3,
            "nodes_crawled ({}) must never exceed max_nodes (3)",
            stats.nodes_crawled
        );
        assert_eq!(storage.node_count().await.unwrap() as u64, stats.nodes_crawled);
    }
}
