use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "voidcrawler", about = "Graph-oriented web crawler")]
pub struct Cli {
    /// Path to a TOML config file; overlaid on `AppConfig::default()`.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Path to the SQLite database file. Overrides `database.sqlite_path`
    /// from the config file when given.
    #[arg(long)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Crawl starting from a single seed URL.
    Crawl {
        /// The URL to start crawling from.
        seed: String,

        /// Maximum link depth from the seed.
        #[arg(long)]
        max_depth: Option<u32>,

        /// Stop once this many nodes have been crawled.
        #[arg(long)]
        max_nodes: Option<u64>,

        /// Number of URLs fetched concurrently per batch.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Minimum milliseconds between requests to the same domain.
        #[arg(long)]
        rate_limit_ms: Option<u64>,

        /// Only follow links that stay on the seed's domain.
        #[arg(long)]
        stay_on_domain: bool,

        /// Ignore robots.txt (robots.txt is honored by default).
        #[arg(long)]
        ignore_robots: bool,

        /// Print final stats as JSON instead of a summary line.
        #[arg(long)]
        json: bool,
    },
    /// Show node/edge counts from the database.
    Status {
        /// Print counts as JSON instead of the boxed summary.
        #[arg(long)]
        json: bool,
    },
}
