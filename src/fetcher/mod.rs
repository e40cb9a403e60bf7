//! Page fetching: navigation, stabilization, classification, thumbnails.
//!
//! Navigation is progressive: a fast full-load attempt, then a patient
//! DOM-content attempt with best-effort load waits, then a last-resort slow
//! attempt. Local addresses get doubled deadlines. After navigation the
//! fetcher detects login redirects and performs one storage-state recovery
//! retry before giving up and flagging the page as auth-required.

pub mod classify;
pub mod js_scripts;
pub mod thumbnail;

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use log::{debug, warn};
use serde::Deserialize;

use crate::session::AuthSession;
use crate::urlnorm;

pub use classify::{PageKind, PageSummary};

/// Fast-path navigation deadline (seconds).
const NAV_FAST_SECS: u64 = 15;
/// Patient DOM-content deadline (seconds).
const NAV_PATIENT_SECS: u64 = 45;
/// Last-resort deadline (seconds).
const NAV_LAST_SECS: u64 = 60;
/// Best-effort load wait after a patient navigation (seconds).
const NAV_LOAD_WAIT_SECS: u64 = 15;

/// One fetch request. `canonical_url` is the page's identity; `nav_url` is
/// what the browser actually navigates to (container rewrite applied).
pub struct FetchRequest<'a> {
    pub canonical_url: &'a str,
    pub nav_url: &'a str,
    pub session: Option<&'a AuthSession>,
    pub capture_thumbnail: bool,
    pub local: bool,
}

/// Everything the orchestrator needs to record a discovered page.
#[derive(Debug)]
pub struct FetchedPage {
    pub final_url: String,
    pub title: String,
    pub kind: PageKind,
    pub requires_auth: bool,
    pub accessible: bool,
    pub thumbnail: Option<Vec<u8>>,
    pub spa: bool,
    pub summary: PageSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PageState {
    #[serde(default)]
    ready_state: String,
    #[serde(default)]
    anchor_count: usize,
    #[serde(default)]
    response_status: u16,
    #[serde(default)]
    spa: bool,
}

/// Apply an explicit deadline to a page operation, in the crawl engine's
/// house style: a timeout is an error naming the operation.
async fn with_deadline<F, T>(operation: F, secs: u64, name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!("{name} timed out after {secs}s")),
    }
}

/// Fetch one page and classify it.
pub async fn fetch_page(page: &Page, request: &FetchRequest<'_>) -> Result<FetchedPage> {
    navigate(page, request.nav_url, request.local).await?;

    let recipe_login = request.session.map(AuthSession::login_url);
    let mut final_url = current_url(page).await.unwrap_or_else(|| request.nav_url.to_string());

    // Session loss: one storage-state recovery retry, then flag and move on.
    let mut landed_on_login = false;
    if urlnorm::is_login_redirect(request.canonical_url, &final_url, recipe_login) {
        if let Some(session) = request.session {
            warn!(
                target: "sitescout::fetch",
                "{} redirected to login; re-applying storage state and retrying",
                request.canonical_url
            );
            session
                .reapply(page)
                .await
                .context("session re-application failed")?;
            navigate(page, request.nav_url, request.local).await?;
            final_url = current_url(page).await.unwrap_or_else(|| request.nav_url.to_string());
        }
        landed_on_login =
            urlnorm::is_login_redirect(request.canonical_url, &final_url, recipe_login);
    }

    let state = stabilize(page, request.local).await;

    let summary: PageSummary = match page.evaluate(js_scripts::PAGE_SUMMARY_SCRIPT).await {
        Ok(result) => result.into_value().unwrap_or_default(),
        Err(e) => {
            warn!(target: "sitescout::fetch", "page summary failed for {}: {e}", request.canonical_url);
            PageSummary::default()
        }
    };

    let title = classify::recover_title(&summary, request.canonical_url);
    let kind = classify::classify_page(request.canonical_url, &summary);
    let requires_auth =
        landed_on_login || classify::requires_auth(&summary, request.canonical_url, &title);

    let accessible = match state.response_status {
        0 => true, // browser did not expose a status; navigation succeeded
        status => (200..300).contains(&status),
    };

    let thumbnail = if request.capture_thumbnail {
        thumbnail::capture_thumbnail(page, request.canonical_url).await
    } else {
        None
    };

    Ok(FetchedPage {
        final_url,
        title,
        kind,
        requires_auth,
        accessible,
        thumbnail,
        spa: state.spa,
        summary,
    })
}

async fn current_url(page: &Page) -> Option<String> {
    page.url().await.ok().flatten()
}

/// Progressive navigation ladder. Local addresses double every deadline.
async fn navigate(page: &Page, nav_url: &str, local: bool) -> Result<()> {
    let scale = if local { 2 } else { 1 };

    // 1. Fast path: navigation plus full load inside one short deadline.
    let fast = with_deadline(
        async {
            page.goto(nav_url)
                .await
                .map_err(|e| anyhow!("navigation failed: {e}"))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| anyhow!("load wait failed: {e}"))?;
            Ok(())
        },
        NAV_FAST_SECS * scale,
        "fast navigation",
    )
    .await;
    if fast.is_ok() {
        return Ok(());
    }
    debug!(target: "sitescout::fetch", "fast navigation missed for {nav_url}; retrying patiently");

    // 2. Patient: commit the navigation, then best-effort load + readyState.
    let patient = with_deadline(
        async {
            page.goto(nav_url)
                .await
                .map_err(|e| anyhow!("navigation failed: {e}"))?;
            Ok(())
        },
        NAV_PATIENT_SECS * scale,
        "patient navigation",
    )
    .await;
    if patient.is_ok() {
        let _ = tokio::time::timeout(
            Duration::from_secs(NAV_LOAD_WAIT_SECS * scale),
            page.wait_for_navigation(),
        )
        .await;
        wait_for_ready_state(page, Duration::from_secs(NAV_LOAD_WAIT_SECS * scale)).await;
        return Ok(());
    }

    // 3. Last resort: one slow attempt, errors are final.
    with_deadline(
        async {
            page.goto(nav_url)
                .await
                .map_err(|e| anyhow!("navigation failed: {e}"))?;
            Ok(())
        },
        NAV_LAST_SECS * scale,
        "navigation",
    )
    .await
}

/// Poll `document.readyState` until complete or the budget runs out.
async fn wait_for_ready_state(page: &Page, budget: Duration) {
    let start = std::time::Instant::now();
    while start.elapsed() < budget {
        let ready: Option<String> = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|r| r.into_value().ok());
        if ready.as_deref() == Some("complete") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

/// Post-navigation settle for dynamically rendered pages.
async fn stabilize(page: &Page, local: bool) -> PageState {
    let state = probe_state(page).await;

    let obviously_ready = state.ready_state == "complete" && state.anchor_count > 0;
    if !obviously_ready {
        let settle = if local {
            Duration::from_secs(3)
        } else if state.spa {
            Duration::from_secs(2)
        } else {
            Duration::from_secs(1)
        };
        tokio::time::sleep(settle).await;
    }

    if state.spa {
        wait_for_network_idle(page, Duration::from_secs(3)).await;
    }

    if obviously_ready {
        state
    } else {
        probe_state(page).await
    }
}

async fn probe_state(page: &Page) -> PageState {
    match page.evaluate(js_scripts::PAGE_STATE_SCRIPT).await {
        Ok(result) => result.into_value().unwrap_or_default(),
        Err(_) => PageState::default(),
    }
}

/// Bounded network-idle approximation: the page's resource-entry count must
/// hold still for two consecutive samples.
async fn wait_for_network_idle(page: &Page, budget: Duration) {
    let start = std::time::Instant::now();
    let mut last: i64 = -1;
    let mut stable = 0u8;

    while start.elapsed() < budget {
        let count: i64 = page
            .evaluate(js_scripts::RESOURCE_COUNT_SCRIPT)
            .await
            .ok()
            .and_then(|r| r.into_value().ok())
            .unwrap_or(-1);

        if count >= 0 && count == last {
            stable += 1;
            if stable >= 2 {
                return;
            }
        } else {
            stable = 0;
        }
        last = count;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
