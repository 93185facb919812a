//! Per-domain request spacing.
//!
//! `wait` records "now" as the domain's last-request time only *after*
//! sleeping, and holds the domain's lock for the whole wait — that's
//! what keeps two concurrent callers for the same domain from both
//! computing their delay off the same stale timestamp.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

pub struct RateLimiter {
    delay: Duration,
    last_request: DashMap<String, Arc<Mutex<Instant>>>,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request: DashMap::new(),
        }
    }

    fn domain_slot(&self, domain: &str) -> Arc<Mutex<Instant>> {
        self.last_request
            .entry(domain.to_string())
            .or_insert_with(|| {
                // Back-date so the first request for a never-seen domain
                // never waits.
                Arc::new(Mutex::new(Instant::now() - self.delay))
            })
            .clone()
    }

    /// Block the caller until at least `delay` has elapsed since the
    /// last request to `domain`, then record this moment as the new
    /// last-request time.
    pub async fn wait(&self, domain: &str) {
        let slot = self.domain_slot(domain);
        let mut last = slot.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.delay {
            tracing::debug!(domain, wait_ms = (self.delay - elapsed).as_millis() as u64, "rate limit wait");
            tokio::time::sleep(self.delay - elapsed).await;
        }
        *last = Instant::now();
    }

    /// Non-blocking: true iff a request to `domain` could proceed
    /// immediately without waiting.
    pub fn can_request(&self, domain: &str) -> bool {
        match self.last_request.get(domain) {
            None => true,
            Some(slot) => match slot.try_lock() {
                Ok(last) => last.elapsed() >= self.delay,
                // Another caller is mid-wait for this domain.
                Err(_) => false,
            },
        }
    }

    /// Milliseconds until `can_request` would return true.
    pub fn get_wait_time(&self, domain: &str) -> u64 {
        match self.last_request.get(domain) {
            None => 0,
            Some(slot) => match slot.try_lock() {
                Ok(last) => {
                    let elapsed = last.elapsed();
                    if elapsed >= self.delay {
                        0
                    } else {
                        (self.delay - elapsed).as_millis() as u64
                    }
                }
                Err(_) => self.delay.as_millis() as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    #[tokio::test]
    async fn first_request_never_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait("example.com").await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn second_request_waits_out_the_delay() {
        let limiter = RateLimiter::new(Duration::from_millis(80));
        limiter.wait("example.com").await;
        let start = Instant::now();
        limiter.wait("example.com").await;
        assert!(start.elapsed() >= Duration::from_millis(70)); // allow scheduler slop
    }

    #[tokio::test]
    async fn concurrent_callers_serialize_and_space_out() {
        let limiter = StdArc::new(RateLimiter::new(Duration::from_millis(100)));
        let mut handles = Vec::new();
        let completions = StdArc::new(Mutex::new(Vec::<Instant>::new()));
        for _ in 0..3 {
            let limiter = limiter.clone();
            let completions = completions.clone();
            handles.push(tokio::spawn(async move {
                limiter.wait("same.com").await;
                completions.lock().await.push(Instant::now());
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let times = completions.lock().await;
        let mut sorted = times.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(90));
        }
    }

    #[tokio::test]
    async fn independent_domains_do_not_block_each_other() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.wait("a.com").await;
        let start = Instant::now();
        limiter.wait("b.com").await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn can_request_true_for_unseen_domain() {
        let limiter = RateLimiter::new(Duration::from_millis(1000));
        assert!(limiter.can_request("never-seen.com"));
        assert_eq!(limiter.get_wait_time("never-seen.com"), 0);
    }
}
