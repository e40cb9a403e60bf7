//! Sitemap ingestion.
//!
//! Seeds the crawl with URLs the site itself advertises. Tries the usual
//! sitemap locations, falls back to the robots.txt `Sitemap:` directive, and
//! expands `<sitemapindex>` documents recursively. Every branch failure is
//! logged and abandoned: a partial union beats no sitemap, and absence is
//! not an error; the crawl proceeds either way.

use std::collections::HashSet;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use crate::urlnorm;

/// Well-known sitemap locations, probed in order.
const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap/sitemap.xml"];

/// Per-request timeout for sitemap and robots fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Recursion bound for nested `<sitemapindex>` documents.
const MAX_INDEX_DEPTH: usize = 3;

/// Upper bound on child sitemaps fetched from index documents.
const MAX_CHILD_SITEMAPS: usize = 50;

/// Upper bound on URLs returned from one ingestion.
const MAX_URLS: usize = 5_000;

const SITEMAP_USER_AGENT: &str = concat!("sitescout/", env!("CARGO_PKG_VERSION"));

lazy_static! {
    static ref LOC_RE: Regex = Regex::new(r"(?s)<loc>\s*(.*?)\s*</loc>").expect("static regex");
    static ref ROBOTS_SITEMAP_RE: Regex =
        Regex::new(r"(?im)^\s*sitemap:\s*(\S+)").expect("static regex");
}

/// URLs harvested from the site's sitemaps, canonicalized and filtered to
/// same-site HTML pages.
#[derive(Debug, Clone)]
pub struct SitemapResult {
    pub urls: Vec<String>,
    /// Sitemap documents that contributed to the union.
    pub sources: Vec<String>,
}

pub struct SitemapIngester {
    client: Client,
}

impl SitemapIngester {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(SITEMAP_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(3))
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch and flatten all discoverable sitemaps for `base_url`.
    ///
    /// Returns `None` when the host is a local development address (sitemaps
    /// rarely exist there and every probe costs a timeout) or when no
    /// sitemap could be located.
    pub async fn fetch(&self, base_url: &str) -> Option<SitemapResult> {
        let base = Url::parse(base_url).ok()?;
        let host = base.host_str()?;

        if urlnorm::is_local_host(host) {
            debug!(%base_url, "skipping sitemap probe for local address");
            return None;
        }

        self.probe_origin(base_url, &origin_of(&base)).await
    }

    /// Probe well-known locations and robots.txt under `origin`. Split from
    /// [`fetch`] so the probing logic is exercisable against loopback test
    /// servers, which `fetch` deliberately skips.
    async fn probe_origin(&self, base_url: &str, origin: &str) -> Option<SitemapResult> {
        for path in SITEMAP_PATHS {
            let candidate = format!("{origin}{path}");
            if let Some(body) = self.fetch_text(&candidate).await {
                return Some(self.expand(base_url, &candidate, body).await);
            }
        }

        // robots.txt fallback
        let robots_url = format!("{origin}/robots.txt");
        let robots = self.fetch_text(&robots_url).await?;
        for cap in ROBOTS_SITEMAP_RE.captures_iter(&robots) {
            let sitemap_url = cap[1].to_string();
            if let Some(body) = self.fetch_text(&sitemap_url).await {
                info!(%sitemap_url, "sitemap located via robots.txt");
                return Some(self.expand(base_url, &sitemap_url, body).await);
            }
        }

        debug!(%base_url, "no sitemap found");
        None
    }

    /// Expand one sitemap document (possibly an index) into the final URL set.
    async fn expand(&self, base_url: &str, source: &str, body: String) -> SitemapResult {
        let mut urls: HashSet<String> = HashSet::new();
        let mut sources = vec![source.to_string()];

        // Breadth-wise expansion of index documents, bounded in both depth
        // and fan-out.
        let mut frontier = vec![(body, 0usize)];
        let mut fetched_children = 0usize;

        while let Some((doc, depth)) = frontier.pop() {
            if is_sitemap_index(&doc) {
                if depth >= MAX_INDEX_DEPTH {
                    warn!(%source, "sitemap index nesting exceeds limit; branch dropped");
                    continue;
                }
                for child_url in extract_locs(&doc) {
                    if fetched_children >= MAX_CHILD_SITEMAPS {
                        warn!(%source, "sitemap index fan-out exceeds limit; remainder dropped");
                        break;
                    }
                    fetched_children += 1;
                    match self.fetch_text(&child_url).await {
                        Some(child_body) => {
                            sources.push(child_url);
                            frontier.push((child_body, depth + 1));
                        }
                        None => {
                            warn!(%child_url, "child sitemap fetch failed; branch abandoned");
                        }
                    }
                }
            } else {
                for loc in extract_locs(&doc) {
                    if urlnorm::same_site(&loc, base_url) && urlnorm::is_page_url(&loc) {
                        urls.insert(urlnorm::canonicalize(&loc));
                        if urls.len() >= MAX_URLS {
                            warn!(%source, "sitemap URL cap reached; remainder dropped");
                            break;
                        }
                    }
                }
            }
        }

        let mut urls: Vec<String> = urls.into_iter().collect();
        urls.sort();
        info!(
            count = urls.len(),
            sitemaps = sources.len(),
            "sitemap ingestion complete"
        );
        SitemapResult { urls, sources }
    }

    /// GET a URL, returning the body only for 2xx text responses.
    async fn fetch_text(&self, url: &str) -> Option<String> {
        match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(%url, error = %e, "failed to read sitemap body");
                    None
                }
            },
            Ok(response) => {
                debug!(%url, status = %response.status(), "sitemap candidate miss");
                None
            }
            Err(e) => {
                debug!(%url, error = %e, "sitemap fetch failed");
                None
            }
        }
    }
}

fn origin_of(url: &Url) -> String {
    let scheme = url.scheme();
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    }
}

fn is_sitemap_index(body: &str) -> bool {
    body.contains("<sitemapindex")
}

/// Pull `<loc>` values out of a sitemap document. Lenient by design: real
/// sitemaps ship with namespace quirks, BOMs and stray whitespace that a
/// strict XML parse would choke on.
fn extract_locs(body: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(body)
        .map(|cap| cap[1].trim().to_string())
        .filter(|loc| !loc.is_empty())
        .collect()
}
