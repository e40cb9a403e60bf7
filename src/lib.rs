pub mod browser_setup;
pub mod config;
pub mod crawl;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod links;
pub mod login;
pub mod probe;
pub mod progress;
pub mod session;
pub mod sitemap;
pub mod store;
pub mod urlnorm;

pub use browser_setup::{ensure_browser, find_browser, launch_browser};
pub use config::{DiscoveryConfig, DiscoveryConfigBuilder};
pub use crawl::{CrawlFailure, CrawlOutcome, DiscoveredPage, PageEdge};
pub use engine::{
    BrowserCrawlRunner, CrawlRunner, DiscoveryEngine, DiscoveryReport, InMemoryRecipeStore,
    RecipeStore,
};
pub use error::{DiscoveryError, DiscoveryResult, UnreachableKind};
pub use fetcher::{PageKind, PageSummary};
pub use links::{LinkLocation, PageLink, RevealedBy};
pub use login::{Credentials, LoginRecipe, LoginStep, ManualSelectors, RecipeMode, StepKind};
pub use progress::{
    DiscoveryPhase, DiscoveryStatus, Progress, ProgressBroadcaster, ProgressEvent, TransportPhase,
};
pub use session::{AuthSession, StorageState};
pub use sitemap::{SitemapIngester, SitemapResult};
pub use store::{EdgeRecord, GraphStore, GraphView, PageRecord, PersistStats};
