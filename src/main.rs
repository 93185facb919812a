mod cli;
mod commands;
mod crawl;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

// mimalloc keeps memory flat under the high-concurrency, many-short-lived-
// allocation workload a crawl generates; glibc malloc tends to bloat here.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use voidcrawler_core::{AllowAllRobots, AppConfig, NoScreenshots, TracingEvents};
use voidcrawler_storage::Storage;

use crate::cli::{Cli, Commands};
use crate::crawl::Crawler;

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_stack_size(8 * 1024 * 1024)
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let config: AppConfig = toml::from_str(&config_str)?;
    let mut options = config.crawler;
    let db_path = cli.db.unwrap_or(config.database.sqlite_path);

    match cli.command {
        Commands::Crawl {
            seed,
            max_depth,
            max_nodes,
            concurrency,
            rate_limit_ms,
            stay_on_domain,
            ignore_robots,
            json,
        } => {
            if let Some(v) = max_depth {
                options.max_depth = v;
            }
            if let Some(v) = max_nodes {
                options.max_nodes = v;
            }
            if let Some(v) = concurrency {
                options.concurrency = v;
            }
            if let Some(v) = rate_limit_ms {
                options.rate_limit_ms = v;
            }
            if stay_on_domain {
                options.stay_on_domain = true;
            }
            if ignore_robots {
                options.respect_robots_txt = false;
            }

            let storage = Arc::new(Storage::open(&db_path).await?);
            let crawler = Crawler::new(
                storage,
                options,
                Arc::new(TracingEvents),
                Arc::new(AllowAllRobots),
                Arc::new(NoScreenshots),
            )?;

            let stats = crawler.crawl(&seed).await?;
            if json {
                println!("{}", stats.to_json()?);
            } else {
                println!(
                    "crawl complete: {} nodes crawled, {} edges found, {} errors",
                    stats.nodes_crawled, stats.edges_found, stats.errors
                );
            }
        }
        Commands::Status { json } => {
            commands::status::run(&db_path, json).await?;
        }
    }

    Ok(())
}
