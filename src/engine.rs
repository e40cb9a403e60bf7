//! Discovery engine facade.
//!
//! Wires the pipeline together: connectivity probe, sitemap ingestion,
//! optional login, the crawl loop, persistence and progress broadcasting.
//! `start_discovery` runs synchronously to completion; every phase
//! transition is published, and terminal states (complete or error) always
//! land in the progress snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use log::{info, warn};

use crate::config::DiscoveryConfig;
use crate::crawl::{self, CrawlOutcome, CrawlParams};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::login::LoginRecipe;
use crate::probe;
use crate::progress::{DiscoveryPhase, DiscoveryStatus, Progress, ProgressBroadcaster};
use crate::sitemap::SitemapIngester;
use crate::store::{GraphStore, GraphView, PageRecord, PersistStats};

/// External credential store: resolves a recipe identifier to a recipe.
/// Opaque to the engine; the in-memory implementation below serves tests
/// and the CLI.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn recipe(&self, id: &str) -> anyhow::Result<Option<LoginRecipe>>;
}

/// Recipe store backed by a map handed over at construction.
#[derive(Default)]
pub struct InMemoryRecipeStore {
    recipes: HashMap<String, LoginRecipe>,
}

impl InMemoryRecipeStore {
    #[must_use]
    pub fn new(recipes: HashMap<String, LoginRecipe>) -> Self {
        Self { recipes }
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    async fn recipe(&self, id: &str) -> anyhow::Result<Option<LoginRecipe>> {
        Ok(self.recipes.get(id).cloned())
    }
}

/// Executes the crawl portion of the pipeline. The default implementation
/// launches a browser; tests swap in stubs so the surrounding pipeline
/// (probe, persistence, progress) is exercisable without one.
#[async_trait]
pub trait CrawlRunner: Send + Sync {
    async fn run(&self, params: CrawlParams<'_>) -> Result<CrawlOutcome, DiscoveryError>;
}

/// Default runner: full browser-backed crawl.
pub struct BrowserCrawlRunner;

#[async_trait]
impl CrawlRunner for BrowserCrawlRunner {
    async fn run(&self, params: CrawlParams<'_>) -> Result<CrawlOutcome, DiscoveryError> {
        crawl::crawl_site(params).await
    }
}

/// Summary returned by a completed discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryReport {
    pub project_id: String,
    pub pages_discovered: usize,
    pub edges_recorded: usize,
    pub failures: usize,
    pub sitemap_urls: usize,
    pub persist: PersistStats,
    pub elapsed: std::time::Duration,
}

pub struct DiscoveryEngine {
    store: GraphStore,
    broadcaster: Arc<ProgressBroadcaster>,
    recipes: Arc<dyn RecipeStore>,
    runner: Arc<dyn CrawlRunner>,
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new(store: GraphStore, recipes: Arc<dyn RecipeStore>) -> Self {
        Self::with_runner(store, recipes, Arc::new(BrowserCrawlRunner))
    }

    /// Build an engine with a custom crawl runner.
    #[must_use]
    pub fn with_runner(
        store: GraphStore,
        recipes: Arc<dyn RecipeStore>,
        runner: Arc<dyn CrawlRunner>,
    ) -> Self {
        Self {
            store,
            broadcaster: Arc::new(ProgressBroadcaster::default()),
            recipes,
            runner,
        }
    }

    /// Shared broadcaster, for subscribing transports.
    #[must_use]
    pub fn broadcaster(&self) -> Arc<ProgressBroadcaster> {
        Arc::clone(&self.broadcaster)
    }

    /// Run one discovery to completion.
    pub async fn start_discovery(&self, config: DiscoveryConfig) -> DiscoveryResult<DiscoveryReport> {
        let started = Instant::now();
        let project_id = config.project_id().to_string();

        match self.run_pipeline(&config).await {
            Ok(report) => {
                info!(
                    target: "sitescout::engine",
                    "discovery for {project_id} complete: {} pages in {:.1}s",
                    report.pages_discovered,
                    started.elapsed().as_secs_f64()
                );
                Ok(report)
            }
            Err(error) => {
                // Terminal error state must be readable by polling clients.
                self.emit(
                    &project_id,
                    DiscoveryStatus::Failed,
                    DiscoveryPhase::Error,
                    0,
                    Vec::new(),
                    error.to_string(),
                );
                Err(error)
            }
        }
    }

    async fn run_pipeline(&self, config: &DiscoveryConfig) -> DiscoveryResult<DiscoveryReport> {
        let started = Instant::now();
        let project_id = config.project_id().to_string();

        self.emit(
            &project_id,
            DiscoveryStatus::Pending,
            DiscoveryPhase::Initialization,
            0,
            Vec::new(),
            format!("Preparing discovery of {}", config.root_url()),
        );

        // Resolve the recipe before spending time on anything else: a bad
        // identifier is a client error, not a crawl result.
        let recipe = match config.login_recipe_id() {
            Some(id) => {
                let recipe = self
                    .recipes
                    .recipe(id)
                    .await
                    .map_err(DiscoveryError::Other)?
                    .ok_or_else(|| DiscoveryError::RecipeNotFound(id.to_string()))?;
                Some(recipe)
            }
            None => None,
        };

        self.emit(
            &project_id,
            DiscoveryStatus::Discovering,
            DiscoveryPhase::Connectivity,
            0,
            Vec::new(),
            format!("Checking reachability of {}", config.root_url()),
        );
        probe::check_reachable(config.root_url()).await?;

        let sitemap_urls = if config.use_sitemap() {
            self.emit(
                &project_id,
                DiscoveryStatus::Discovering,
                DiscoveryPhase::Sitemap,
                0,
                Vec::new(),
                "Looking for a sitemap".to_string(),
            );
            let ingester = SitemapIngester::new().map_err(DiscoveryError::Other)?;
            match ingester.fetch(config.root_url()).await {
                Some(result) => result.urls,
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let outcome = self
            .runner
            .run(CrawlParams {
                config,
                broadcaster: &self.broadcaster,
                recipe: recipe.as_ref(),
                sitemap_urls: &sitemap_urls,
            })
            .await?;

        let urls: Vec<String> = outcome.pages.iter().map(|p| p.url.clone()).collect();

        self.emit(
            &project_id,
            DiscoveryStatus::Discovering,
            DiscoveryPhase::Processing,
            outcome.pages.len(),
            urls.clone(),
            format!("Organizing {} pages", outcome.pages.len()),
        );

        if !outcome.failures.is_empty() {
            warn!(
                target: "sitescout::engine",
                "{} pages failed during crawl of {project_id}",
                outcome.failures.len()
            );
        }

        self.emit(
            &project_id,
            DiscoveryStatus::Discovering,
            DiscoveryPhase::Saving,
            outcome.pages.len(),
            urls.clone(),
            "Saving the discovered site map".to_string(),
        );

        let persist = self
            .store
            .persist_crawl(&project_id, &outcome.pages, &outcome.edges)
            .await
            .map_err(DiscoveryError::Other)?;

        self.emit(
            &project_id,
            DiscoveryStatus::Complete,
            DiscoveryPhase::Complete,
            outcome.pages.len(),
            urls,
            format!("Discovered {} pages", outcome.pages.len()),
        );

        Ok(DiscoveryReport {
            project_id,
            pages_discovered: outcome.pages.len(),
            edges_recorded: outcome.edges.len(),
            failures: outcome.failures.len(),
            sitemap_urls: sitemap_urls.len(),
            persist,
            elapsed: started.elapsed(),
        })
    }

    /// Last-known progress snapshot for a project.
    #[must_use]
    pub fn get_progress(&self, project_id: &str) -> Option<Progress> {
        self.broadcaster.snapshot(project_id)
    }

    /// Read-only graph view of everything discovered for a project.
    pub async fn get_graph(&self, project_id: &str) -> DiscoveryResult<GraphView> {
        self.store
            .graph(project_id)
            .await
            .map_err(DiscoveryError::Other)
    }

    /// Mark pages for downstream analysis and return the affected rows.
    pub async fn select_pages_for_analysis(
        &self,
        project_id: &str,
        page_ids: &[String],
    ) -> DiscoveryResult<Vec<PageRecord>> {
        self.store
            .select_pages(project_id, page_ids)
            .await
            .map_err(DiscoveryError::Other)
    }

    fn emit(
        &self,
        project_id: &str,
        status: DiscoveryStatus,
        phase: DiscoveryPhase,
        discovered: usize,
        urls: Vec<String>,
        message: String,
    ) {
        let total = urls.len().max(discovered);
        self.broadcaster.emit(Progress {
            project_id: project_id.to_string(),
            status,
            phase,
            discovered_count: discovered,
            total_count: total,
            message,
            urls,
            current_url: None,
            updated_at: chrono::Utc::now(),
        });
    }
}
