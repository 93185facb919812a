//! The robots.txt policy interface.
//!
//! `robots.txt` parsing itself (user-agent sections, `Disallow`/`Allow`
//! precedence, `Crawl-delay`) is out of scope for this core: the
//! orchestrator only needs something it can ask "am I allowed to fetch
//! this URL", so the policy is a trait the host supplies, the same way
//! event callbacks are a trait rather than a concrete type.

/// The outcome of consulting a robots policy for one URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RobotsDecision {
    pub allowed: bool,
    pub crawl_delay: Option<u64>,
}

impl RobotsDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            crawl_delay: None,
        }
    }
}

/// Consulted by the orchestrator before `fetch` when
/// `CrawlerOptions::respect_robots_txt` is set.
pub trait RobotsPolicy: Send + Sync {
    fn check(&self, url: &str, user_agent: &str) -> RobotsDecision;
}

/// The default policy: allow everything. A real parser is a pluggable
/// collaborator, not part of this crawl engine.
pub struct AllowAllRobots;

impl RobotsPolicy for AllowAllRobots {
    fn check(&self, _url: &str, _user_agent: &str) -> RobotsDecision {
        RobotsDecision::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_always_allows() {
        let policy = AllowAllRobots;
        let decision = policy.check("https://example.com/anything", "VoidBrowser/1.0");
        assert!(decision.allowed);
        assert!(decision.crawl_delay.is_none());
    }
}
