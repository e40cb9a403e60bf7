//! Crawl orchestration: BFS queue, limits, visited set, session recovery.

pub mod orchestrator;
pub mod types;

pub use orchestrator::{CrawlParams, crawl_site};
pub use types::{CrawlFailure, CrawlOutcome, DiscoveredPage, PageEdge, QueueItem};
