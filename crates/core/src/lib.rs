pub mod config;
pub mod error;
pub mod events;
pub mod robots;
pub mod screenshot;
pub mod types;

pub use config::{AppConfig, CrawlerOptions, DatabaseConfig};
pub use error::CrawlError;
pub use events::{CrawlEvents, TracingEvents};
pub use robots::{AllowAllRobots, RobotsDecision, RobotsPolicy};
pub use screenshot::{NoScreenshots, ScreenshotHook};
pub use types::*;
