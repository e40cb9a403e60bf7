//! The crawl loop.
//!
//! One browser, one tab navigating at a time: the authenticated profile is
//! shared by every tab of the crawl, and sequential fetching keeps it
//! consistent. Tabs are opened per fetch and closed immediately; only the
//! session anchor survives to the end. The browser, its profile directory
//! and the CDP handler task are released on every exit path.
//!
//! The loop itself is written against the [`PageVisitor`] seam: the real
//! visitor drives a browser, and the queue/cap/depth/edge bookkeeping is
//! exercised in tests through a scripted visitor with no browser at all.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::Browser;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::browser_setup::launch_browser;
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::fetcher::{self, FetchRequest, PageKind};
use crate::links::{self, LinkLocation, PageLink, menu};
use crate::login::{self, LoginRecipe};
use crate::progress::{DiscoveryPhase, DiscoveryStatus, Progress, ProgressBroadcaster};
use crate::session::AuthSession;
use crate::urlnorm;

use super::types::{CrawlFailure, CrawlOutcome, DiscoveredPage, PageEdge, QueueItem};

/// Thumbnails are captured for this many pages, then disabled to cap time.
const THUMBNAIL_PAGE_LIMIT: usize = 10;

/// Inputs to one crawl run.
pub struct CrawlParams<'a> {
    pub config: &'a DiscoveryConfig,
    pub broadcaster: &'a ProgressBroadcaster,
    pub recipe: Option<&'a LoginRecipe>,
    /// Canonical URLs harvested from the sitemap, seeded at depth 1.
    pub sitemap_urls: &'a [String],
}

/// What one page visit yields: the record fields plus outgoing links.
pub(crate) struct VisitedPage {
    pub title: String,
    pub kind: PageKind,
    pub requires_auth: bool,
    pub accessible: bool,
    pub thumbnail: Option<Vec<u8>>,
    pub links: Vec<PageLink>,
}

/// Canonical URLs produced by a successful login.
#[derive(Debug, Clone)]
pub(crate) struct LoginSeed {
    pub login_url: String,
    pub landing_url: String,
}

/// The loop's view of page access. Implemented by the browser-backed
/// visitor in production and by scripted visitors in tests.
#[async_trait]
pub(crate) trait PageVisitor: Send {
    /// Execute the login recipe and hand back the seed URLs.
    async fn login(&mut self, recipe: &LoginRecipe) -> Result<LoginSeed, DiscoveryError>;

    /// Fetch one queued URL and extract its links.
    async fn visit(&mut self, item: &QueueItem, capture_thumbnail: bool) -> Result<VisitedPage>;

    /// Release any session state (the anchor tab) at end of crawl.
    async fn finish(&mut self);
}

/// In-memory state of the running crawl.
struct CrawlState {
    queue: VecDeque<QueueItem>,
    visited: HashSet<String>,
    pages: HashMap<String, DiscoveredPage>,
    order: Vec<String>,
    edges: Vec<PageEdge>,
    edge_keys: HashSet<(String, String)>,
    failures: Vec<CrawlFailure>,
}

impl CrawlState {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
            pages: HashMap::new(),
            order: Vec::new(),
            edges: Vec::new(),
            edge_keys: HashSet::new(),
            failures: Vec::new(),
        }
    }

    fn record_page(&mut self, page: DiscoveredPage) {
        match self.pages.get_mut(&page.url) {
            Some(existing) => {
                // Re-reached through a shorter path: keep the minimum depth.
                if page.depth < existing.depth {
                    existing.depth = page.depth;
                }
            }
            None => {
                self.order.push(page.url.clone());
                self.pages.insert(page.url.clone(), page);
            }
        }
    }

    fn lower_depth(&mut self, url: &str, depth: u8) {
        if let Some(existing) = self.pages.get_mut(url)
            && depth < existing.depth
        {
            existing.depth = depth;
        }
    }

    fn record_edge(&mut self, edge: PageEdge) {
        let key = (edge.source_url.clone(), edge.target_url.clone());
        if self.edge_keys.insert(key) {
            self.edges.push(edge);
        }
    }

    fn into_outcome(self) -> CrawlOutcome {
        let mut pages = Vec::with_capacity(self.order.len());
        let mut map = self.pages;
        for url in self.order {
            if let Some(page) = map.remove(&url) {
                pages.push(page);
            }
        }
        CrawlOutcome {
            pages,
            edges: self.edges,
            failures: self.failures,
        }
    }
}

/// Run the full crawl for `params.config`, returning the in-memory graph.
///
/// Launches its own browser and guarantees its release on success, failure
/// and panic-free error paths alike.
pub async fn crawl_site(params: CrawlParams<'_>) -> Result<CrawlOutcome, DiscoveryError> {
    let (browser, handler_task, profile_dir) = launch_browser(params.config.headless(), None)
        .await
        .map_err(DiscoveryError::Browser)?;

    let mut browser = browser;
    let local = urlnorm::folded_host(params.config.root_url())
        .is_some_and(|h| urlnorm::is_local_host(&h));

    let mut visitor = BrowserVisitor {
        browser: &browser,
        config: params.config,
        session: None,
        local,
    };
    let result = run_loop(&params, &mut visitor).await;
    drop(visitor);

    cleanup(&mut browser, handler_task, profile_dir).await;

    result
}

/// The BFS itself: seeding, dequeue, cap and depth enforcement, edge
/// recording, progress emission, failure absorption.
pub(crate) async fn run_loop<V: PageVisitor>(
    params: &CrawlParams<'_>,
    visitor: &mut V,
) -> Result<CrawlOutcome, DiscoveryError> {
    let config = params.config;
    let root_canonical = urlnorm::canonicalize(config.root_url());

    let mut state = CrawlState::new();

    // Authentication phase: a failed recipe fails the whole crawl. The
    // caller asked for authenticated discovery; silently crawling anonymous
    // would misrepresent every requires_auth flag we emit.
    if let Some(recipe) = params.recipe {
        emit_phase(params, &state, DiscoveryPhase::Authentication, None);

        let seed = visitor.login(recipe).await?;

        // The login page itself belongs in the graph.
        state.visited.insert(seed.login_url.clone());
        state.record_page(DiscoveredPage {
            url: seed.login_url,
            title: "Login".to_string(),
            kind: PageKind::Login,
            requires_auth: false,
            depth: 0,
            accessible: true,
            thumbnail: None,
        });

        // Post-login landing differs from the requested start: crawl both.
        if seed.landing_url != root_canonical
            && urlnorm::same_site(&seed.landing_url, config.root_url())
            && urlnorm::is_page_url(&seed.landing_url)
        {
            state.queue.push_back(QueueItem {
                url: seed.landing_url,
                depth: 0,
            });
        }
    }

    // Seed the BFS: root first, then sitemap URLs one hop out.
    state.queue.push_back(QueueItem {
        url: root_canonical,
        depth: 0,
    });
    for url in params.sitemap_urls {
        state.queue.push_back(QueueItem {
            url: url.clone(),
            depth: 1,
        });
    }

    emit_phase(params, &state, DiscoveryPhase::Crawling, None);

    while let Some(item) = state.queue.pop_front() {
        if state.pages.len() >= config.page_cap() {
            info!(
                target: "sitescout::crawl",
                "page cap {} reached; {} queued URLs discarded",
                config.page_cap(),
                state.queue.len() + 1
            );
            break;
        }
        if !state.visited.insert(item.url.clone()) {
            state.lower_depth(&item.url, item.depth);
            continue;
        }

        debug!(target: "sitescout::crawl", "crawling [depth {}]: {}", item.depth, item.url);

        let capture_thumbnail = state.pages.len() < THUMBNAIL_PAGE_LIMIT;
        match visitor.visit(&item, capture_thumbnail).await {
            Ok(visited) => {
                state.record_page(DiscoveredPage {
                    url: item.url.clone(),
                    title: visited.title,
                    kind: visited.kind,
                    requires_auth: visited.requires_auth,
                    depth: item.depth,
                    accessible: visited.accessible,
                    thumbnail: visited.thumbnail,
                });
                admit_links(&mut state, config, &item, visited.links);
            }
            Err(e) => {
                warn!(target: "sitescout::crawl", "page failed: {}: {e:#}", item.url);
                state.failures.push(CrawlFailure {
                    url: item.url.clone(),
                    reason: format!("{e:#}"),
                });
            }
        }

        emit_phase(params, &state, DiscoveryPhase::Crawling, Some(&item));
    }

    visitor.finish().await;

    // A reachable root that yielded nothing is a root-level problem (bot
    // protection, TLS, authwall); surface the first cause.
    if state.pages.is_empty() {
        let cause = state
            .failures
            .first()
            .map(|f| format!("{}: {}", f.url, f.reason))
            .unwrap_or_else(|| "no URLs were eligible for crawling".to_string());
        return Err(DiscoveryError::NoPagesDiscovered { cause });
    }

    info!(
        target: "sitescout::crawl",
        "crawl finished: {} pages, {} edges, {} failures",
        state.pages.len(),
        state.edges.len(),
        state.failures.len()
    );

    Ok(state.into_outcome())
}

/// Fold one page's links into the state: externals are dropped outright,
/// non-HTML targets get neither edge nor queue slot, and children enqueue
/// at `depth + 1 + menu_level` so menu-revealed pages count one deeper.
fn admit_links(
    state: &mut CrawlState,
    config: &DiscoveryConfig,
    item: &QueueItem,
    links: Vec<PageLink>,
) {
    for link in links {
        if link.location == LinkLocation::External {
            continue;
        }
        if !urlnorm::is_page_url(&link.url) {
            continue;
        }

        if let Some(edge) = PageEdge::from_link(&item.url, &link) {
            state.record_edge(edge);
        }

        let child_depth = item.depth.saturating_add(1).saturating_add(link.menu_level);
        if child_depth > config.depth_cap() {
            continue;
        }
        if state.visited.contains(&link.url) {
            state.lower_depth(&link.url, child_depth);
            continue;
        }
        state.queue.push_back(QueueItem {
            url: link.url,
            depth: child_depth,
        });
    }
}

/// Production visitor: drives the shared browser, one tab per fetch.
struct BrowserVisitor<'a> {
    browser: &'a Browser,
    config: &'a DiscoveryConfig,
    session: Option<AuthSession>,
    local: bool,
}

#[async_trait]
impl PageVisitor for BrowserVisitor<'_> {
    async fn login(&mut self, recipe: &LoginRecipe) -> Result<LoginSeed, DiscoveryError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| DiscoveryError::Browser(anyhow::anyhow!("failed to open tab: {e}")))?;

        let nav_url = self.config.navigation_url(&recipe.login_url);
        let outcome = match login::execute_recipe(&page, recipe, &nav_url).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = page.close().await;
                return Err(e);
            }
        };

        let auth = AuthSession::establish(page, recipe.login_url.clone())
            .await
            .map_err(DiscoveryError::Browser)?;
        self.session = Some(auth);

        Ok(LoginSeed {
            login_url: urlnorm::canonicalize(&recipe.login_url),
            landing_url: urlnorm::canonicalize(&outcome.final_url),
        })
    }

    async fn visit(&mut self, item: &QueueItem, capture_thumbnail: bool) -> Result<VisitedPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open tab")?;

        let nav_url = self.config.navigation_url(&item.url);
        let request = FetchRequest {
            canonical_url: &item.url,
            nav_url: &nav_url,
            session: self.session.as_ref(),
            capture_thumbnail,
            local: self.local,
        };

        let fetched = match fetcher::fetch_page(&page, &request).await {
            Ok(fetched) => fetched,
            Err(e) => {
                let _ = page.close().await;
                return Err(e);
            }
        };

        // Static links plus whatever the menu interaction shakes loose.
        let mut links = match links::extract_links(&page, self.config.root_url()).await {
            Ok(links) => links,
            Err(e) => {
                warn!(target: "sitescout::crawl", "link extraction failed for {}: {e:#}", item.url);
                Vec::new()
            }
        };
        links.extend(menu::harvest_menu_links(&page, self.config.root_url(), fetched.spa).await);

        let _ = page.close().await;

        Ok(VisitedPage {
            title: fetched.title,
            kind: fetched.kind,
            requires_auth: fetched.requires_auth,
            accessible: fetched.accessible,
            thumbnail: fetched.thumbnail,
            links,
        })
    }

    async fn finish(&mut self) {
        if let Some(auth) = self.session.take() {
            auth.close().await;
        }
    }
}

fn emit_phase(
    params: &CrawlParams<'_>,
    state: &CrawlState,
    phase: DiscoveryPhase,
    current: Option<&QueueItem>,
) {
    let config = params.config;
    let message = match (phase, current) {
        (DiscoveryPhase::Crawling, Some(item)) => format!("Crawling {}", item.url),
        (DiscoveryPhase::Crawling, None) => "Starting crawl".to_string(),
        (DiscoveryPhase::Authentication, _) => "Executing login recipe".to_string(),
        _ => String::new(),
    };

    let progress = Progress {
        project_id: config.project_id().to_string(),
        status: DiscoveryStatus::Discovering,
        phase,
        discovered_count: state.pages.len(),
        total_count: state.pages.len() + state.queue.len(),
        message,
        urls: state.order.clone(),
        current_url: current.map(|i| i.url.clone()),
        updated_at: chrono::Utc::now(),
    };

    params.broadcaster.emit_with_depth(
        progress,
        current.map(|i| i.depth),
        Some(config.depth_cap()),
    );
}

/// Release the browser, its CDP handler and the profile directory. Failures
/// are logged; teardown always runs to completion.
async fn cleanup(browser: &mut Browser, handler_task: JoinHandle<()>, profile_dir: PathBuf) {
    debug!(target: "sitescout::cleanup", "closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "sitescout::cleanup", "failed to close browser: {e}");
    }
    if let Err(e) = browser.wait().await {
        warn!(target: "sitescout::cleanup", "failed to wait for browser exit: {e}");
    }

    handler_task.abort();
    if let Err(e) = handler_task.await
        && !e.is_cancelled()
    {
        warn!(target: "sitescout::cleanup", "handler task failed during abort: {e}");
    }

    if let Err(e) = std::fs::remove_dir_all(&profile_dir) {
        warn!(
            target: "sitescout::cleanup",
            "failed to remove profile directory {}: {e}",
            profile_dir.display()
        );
    }
    debug!(target: "sitescout::cleanup", "browser released");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::RevealedBy;
    use crate::login::{Credentials, RecipeMode};

    const ROOT: &str = "https://example.com";

    fn config(depth_cap: u8, page_cap: usize) -> DiscoveryConfig {
        DiscoveryConfig::builder()
            .project_id("test-proj")
            .root_url(ROOT)
            .depth_cap(depth_cap)
            .page_cap(page_cap)
            .use_sitemap(false)
            .build()
            .expect("valid test config")
    }

    fn link(url: &str, location: LinkLocation, menu_level: u8) -> PageLink {
        PageLink {
            url: urlnorm::canonicalize(url),
            text: "link".into(),
            location,
            menu_level,
            revealed_by: if menu_level > 0 {
                RevealedBy::Hover
            } else {
                RevealedBy::None
            },
            parent_menu_text: None,
        }
    }

    fn recipe() -> LoginRecipe {
        LoginRecipe {
            login_url: format!("{ROOT}/login"),
            credentials: Credentials {
                username: "u".into(),
                password: "p".into(),
            },
            steps: vec![],
            mode: RecipeMode::Auto,
            manual_selectors: None,
        }
    }

    /// Visitor scripted from a url -> links table; no browser involved.
    struct ScriptedVisitor {
        links_by_url: HashMap<String, Vec<PageLink>>,
        failing: HashSet<String>,
        login_seed: Option<LoginSeed>,
        visits: Vec<String>,
    }

    impl ScriptedVisitor {
        fn new(site: &[(&str, Vec<PageLink>)]) -> Self {
            Self {
                links_by_url: site
                    .iter()
                    .map(|(url, links)| (urlnorm::canonicalize(url), links.clone()))
                    .collect(),
                failing: HashSet::new(),
                login_seed: None,
                visits: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl PageVisitor for ScriptedVisitor {
        async fn login(&mut self, _recipe: &LoginRecipe) -> Result<LoginSeed, DiscoveryError> {
            self.login_seed
                .clone()
                .ok_or_else(|| DiscoveryError::LoginFailed {
                    step: 2,
                    reason: "scripted failure".into(),
                })
        }

        async fn visit(&mut self, item: &QueueItem, _thumb: bool) -> Result<VisitedPage> {
            self.visits.push(item.url.clone());
            if self.failing.contains(&item.url) {
                anyhow::bail!("scripted fetch failure");
            }
            Ok(VisitedPage {
                title: format!("Title {}", item.url),
                kind: PageKind::Content,
                requires_auth: false,
                accessible: true,
                thumbnail: None,
                links: self.links_by_url.get(&item.url).cloned().unwrap_or_default(),
            })
        }

        async fn finish(&mut self) {}
    }

    async fn run(
        config: &DiscoveryConfig,
        recipe: Option<&LoginRecipe>,
        visitor: &mut ScriptedVisitor,
    ) -> Result<CrawlOutcome, DiscoveryError> {
        let broadcaster = ProgressBroadcaster::default();
        let params = CrawlParams {
            config,
            broadcaster: &broadcaster,
            recipe,
            sitemap_urls: &[],
        };
        run_loop(&params, visitor).await
    }

    #[tokio::test]
    async fn page_cap_is_enforced_by_the_loop() {
        // Root links to 30 distinct pages; the cap must stop the walk.
        let children: Vec<PageLink> = (0..30)
            .map(|i| link(&format!("{ROOT}/p{i}"), LinkLocation::Content, 0))
            .collect();
        let mut site: Vec<(String, Vec<PageLink>)> =
            vec![(format!("{ROOT}/"), children.clone())];
        for child in &children {
            site.push((child.url.clone(), Vec::new()));
        }
        let site_refs: Vec<(&str, Vec<PageLink>)> = site
            .iter()
            .map(|(url, links)| (url.as_str(), links.clone()))
            .collect();

        let config = config(3, 25);
        let mut visitor = ScriptedVisitor::new(&site_refs);
        let outcome = run(&config, None, &mut visitor).await.expect("crawl ok");

        assert_eq!(outcome.pages.len(), config.page_cap());
        assert!(outcome.failures.is_empty());
        // Truncation discards the rest of the queue without visiting it.
        assert_eq!(visitor.visits.len(), config.page_cap());
    }

    #[tokio::test]
    async fn static_site_yields_pages_and_edges_without_resources() {
        let site = [
            (
                ROOT,
                vec![
                    link(&format!("{ROOT}/a"), LinkLocation::Navigation, 0),
                    link(&format!("{ROOT}/b"), LinkLocation::Navigation, 0),
                ],
            ),
            (
                "https://example.com/a",
                vec![
                    link(&format!("{ROOT}/b"), LinkLocation::Content, 0),
                    link(&format!("{ROOT}/img.png"), LinkLocation::Content, 0),
                ],
            ),
            ("https://example.com/b", vec![]),
        ];

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        let outcome = run(&config, None, &mut visitor).await.expect("crawl ok");

        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(outcome.edges.len(), 3);
        assert!(
            outcome
                .edges
                .iter()
                .all(|e| !e.target_url.ends_with("img.png"))
        );
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn menu_revealed_links_enqueue_two_hops_deeper() {
        let site = [
            (
                ROOT,
                vec![
                    link(&format!("{ROOT}/static"), LinkLocation::Navigation, 0),
                    link(&format!("{ROOT}/hidden"), LinkLocation::Navigation, 1),
                ],
            ),
            ("https://example.com/static", vec![]),
            ("https://example.com/hidden", vec![]),
        ];

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        let outcome = run(&config, None, &mut visitor).await.expect("crawl ok");

        let depth_of = |url: &str| {
            outcome
                .pages
                .iter()
                .find(|p| p.url.ends_with(url))
                .map(|p| p.depth)
                .expect("page present")
        };
        let root_depth = outcome.pages[0].depth;
        assert_eq!(depth_of("/static"), 1);
        // A hover-revealed edge puts its target at least two hops past the
        // source that revealed it.
        assert_eq!(depth_of("/hidden"), 2);
        assert!(depth_of("/hidden") >= root_depth + 2);
    }

    #[tokio::test]
    async fn depth_cap_prunes_deeper_branches() {
        let site = [
            (ROOT, vec![link(&format!("{ROOT}/a"), LinkLocation::Content, 0)]),
            (
                "https://example.com/a",
                vec![link(&format!("{ROOT}/deep"), LinkLocation::Content, 0)],
            ),
            ("https://example.com/deep", vec![]),
        ];

        let config = config(1, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        let outcome = run(&config, None, &mut visitor).await.expect("crawl ok");

        assert_eq!(outcome.pages.len(), 2);
        assert!(!visitor.visits.iter().any(|u| u.ends_with("/deep")));
        // The pruned target still leaves its edge behind.
        assert!(outcome.edges.iter().any(|e| e.target_url.ends_with("/deep")));
    }

    #[tokio::test]
    async fn external_links_are_neither_recorded_nor_enqueued() {
        let site = [(
            ROOT,
            vec![link("https://elsewhere.com/x", LinkLocation::External, 0)],
        )];

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        let outcome = run(&config, None, &mut visitor).await.expect("crawl ok");

        assert_eq!(outcome.pages.len(), 1);
        assert!(outcome.edges.is_empty());
        assert_eq!(visitor.visits.len(), 1);
    }

    #[tokio::test]
    async fn login_seeds_login_page_and_landing() {
        let site = [
            (ROOT, vec![]),
            ("https://example.com/dashboard", vec![]),
        ];
        let r = recipe();

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        visitor.login_seed = Some(LoginSeed {
            login_url: urlnorm::canonicalize(&r.login_url),
            landing_url: urlnorm::canonicalize("https://example.com/dashboard"),
        });

        let outcome = run(&config, Some(&r), &mut visitor).await.expect("crawl ok");

        let login = &outcome.pages[0];
        assert!(login.url.ends_with("/login"));
        assert_eq!(login.kind, PageKind::Login);
        assert_eq!(login.depth, 0);
        assert!(!login.requires_auth);

        let dashboard = outcome
            .pages
            .iter()
            .find(|p| p.url.ends_with("/dashboard"))
            .expect("landing crawled");
        assert_eq!(dashboard.depth, 0);
    }

    #[tokio::test]
    async fn login_failure_aborts_with_zero_pages() {
        let site = [(ROOT, vec![])];
        let r = recipe();

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        // No login_seed scripted: the visitor reports a failed step.

        let err = run(&config, Some(&r), &mut visitor)
            .await
            .expect_err("login failure must abort");
        assert!(matches!(err, DiscoveryError::LoginFailed { step: 2, .. }));
        assert!(visitor.visits.is_empty());
    }

    #[tokio::test]
    async fn zero_yield_surfaces_the_first_failure() {
        let site = [(ROOT, vec![])];

        let config = config(3, 50);
        let mut visitor = ScriptedVisitor::new(&site);
        visitor.failing.insert(urlnorm::canonicalize(ROOT));

        let err = run(&config, None, &mut visitor)
            .await
            .expect_err("zero-yield crawl must fail");
        match err {
            DiscoveryError::NoPagesDiscovered { cause } => {
                assert!(cause.contains("example.com"));
                assert!(cause.contains("scripted fetch failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn record_page_keeps_minimum_depth() {
        let mut state = CrawlState::new();
        let page = |depth| DiscoveredPage {
            url: "https://example.com/a".into(),
            title: "t".into(),
            kind: PageKind::Content,
            requires_auth: false,
            depth,
            accessible: true,
            thumbnail: None,
        };
        state.record_page(page(3));
        state.record_page(page(1));
        state.record_page(page(2));
        assert_eq!(state.pages["https://example.com/a"].depth, 1);
        assert_eq!(state.order.len(), 1);
    }

    #[test]
    fn edges_deduplicate_by_endpoints() {
        let mut state = CrawlState::new();
        let l = link("https://example.com/b", LinkLocation::Content, 0);
        let edge = PageEdge::from_link("https://example.com/a", &l).expect("edge");
        state.record_edge(edge.clone());
        state.record_edge(edge);
        assert_eq!(state.edges.len(), 1);
    }
}
