use serde::Deserialize;

/// The root config document, mirroring the teacher's `AppConfig`: one
/// section per concern, each independently defaulted so a caller's TOML
/// file only has to mention the fields it wants to override.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub crawler: CrawlerOptions,
    pub database: DatabaseConfig,
}

/// Crawl options. Every field has a default (see `Default` below); a
/// caller supplies a partial TOML document or CLI overrides and the
/// rest is merged in, the same two-layer pattern the teacher uses for
/// its `AppConfig`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrawlerOptions {
    pub max_depth: u32,
    pub max_nodes: u64,
    pub concurrency: usize,
    pub rate_limit_ms: u64,
    pub stay_on_domain: bool,
    pub take_screenshots: bool,
    pub respect_robots_txt: bool,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 1000,
            concurrency: 5,
            rate_limit_ms: 1000,
            stay_on_domain: false,
            take_screenshots: false,
            respect_robots_txt: true,
            user_agent: "VoidBrowser/1.0 (Web Crawler)".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub sqlite_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "voidcrawler.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let opts = CrawlerOptions::default();
        assert_eq!(opts.max_depth, 3);
        assert_eq!(opts.max_nodes, 1000);
        assert_eq!(opts.concurrency, 5);
        assert_eq!(opts.rate_limit_ms, 1000);
        assert!(!opts.stay_on_domain);
        assert!(opts.respect_robots_txt);
        assert_eq!(opts.user_agent, "VoidBrowser/1.0 (Web Crawler)");
        assert_eq!(opts.timeout_ms, 10_000);
    }

    #[test]
    fn partial_toml_merges_over_defaults() {
        let opts: CrawlerOptions = toml::from_str("max_depth = 5\nstay_on_domain = true").unwrap();
        assert_eq!(opts.max_depth, 5);
        assert!(opts.stay_on_domain);
        assert_eq!(opts.concurrency, 5); // untouched field keeps its default
    }

    #[test]
    fn app_config_defaults_when_sections_absent() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.database.sqlite_path, "voidcrawler.db");
    }

    #[test]
    fn app_config_merges_nested_sections() {
        let config: AppConfig = toml::from_str(
            "[crawler]\nmax_depth = 5\n\n[database]\nsqlite_path = \"graph.db\"\n",
        )
        .unwrap();
        assert_eq!(config.crawler.max_depth, 5);
        assert_eq!(config.crawler.concurrency, 5); // untouched field keeps its default
        assert_eq!(config.database.sqlite_path, "graph.db");
    }
}
