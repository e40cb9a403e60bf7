//! Menu interaction: hover/click nav triggers and harvest revealed links.
//!
//! Many sites hide most of their navigation behind hover or click menus. A
//! bounded, safety-gated interaction phase recovers those links without
//! risking runaway navigation: at most [`MAX_CANDIDATES`] triggers per page
//! under a [`MENU_PHASE_BUDGET`] wall clock, hover before click, click only
//! behind the safety filter, and an immediate rollback if a click actually
//! navigated.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
};
use log::{debug, warn};
use serde::Deserialize;

use super::{PageLink, RevealedBy, js_scripts};

/// Hard cap on triggers interacted with per page.
pub const MAX_CANDIDATES: usize = 15;

/// Wall-clock budget for the whole menu phase on one page.
pub const MENU_PHASE_BUDGET: Duration = Duration::from_secs(15);

/// Deadline for a single hover or click gesture.
const GESTURE_DEADLINE: Duration = Duration::from_secs(3);

/// Poll cadence while waiting for a menu to open.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to poll after a gesture before giving up on the menu.
const POLL_BUDGET_STATIC: Duration = Duration::from_millis(800);
const POLL_BUDGET_SPA: Duration = Duration::from_millis(1500);

/// Pause after parking the mouse so open hover menus close.
const MOUSE_PARK_SETTLE: Duration = Duration::from_millis(150);

/// Candidate metadata from `MENU_CANDIDATES_SCRIPT`.
#[derive(Debug, Clone, Deserialize)]
pub struct MenuCandidate {
    pub idx: u32,
    pub text: String,
    pub tag: String,
    pub has_sub_indicator: bool,
    pub has_real_href: bool,
    pub has_popup_aria: bool,
    pub has_toggle_class: bool,
    pub has_click_handler: bool,
}

/// Click safety filter: a click must plausibly toggle a menu, not navigate.
///
/// Bare anchors with real hrefs are rejected unless they expose submenu
/// ARIA; buttons and toggle-classed elements pass; span/div need an explicit
/// handler; anything else needs some popup evidence.
#[must_use]
pub fn click_safe(candidate: &MenuCandidate) -> bool {
    match candidate.tag.as_str() {
        "a" => !candidate.has_real_href || candidate.has_popup_aria,
        "button" => true,
        "span" | "div" => candidate.has_click_handler,
        _ => {
            candidate.has_popup_aria
                || candidate.has_toggle_class
                || candidate.has_click_handler
        }
    }
}

/// Order candidates: submenu indicators first, then document order; truncate
/// to the interaction cap.
#[must_use]
pub fn prioritize(mut candidates: Vec<MenuCandidate>) -> Vec<MenuCandidate> {
    candidates.sort_by_key(|c| (!c.has_sub_indicator, c.idx));
    candidates.truncate(MAX_CANDIDATES);
    candidates
}

/// Hover/click nav triggers on `page` and collect links that appear.
///
/// Never fails the page: every interaction error is logged and skipped.
pub async fn harvest_menu_links(page: &Page, base_site: &str, spa: bool) -> Vec<PageLink> {
    let phase_start = Instant::now();

    let candidates: Vec<MenuCandidate> = match page.evaluate(js_scripts::MENU_CANDIDATES_SCRIPT).await {
        Ok(result) => result.into_value().unwrap_or_default(),
        Err(e) => {
            warn!(target: "sitescout::menu", "menu candidate enumeration failed: {e}");
            return Vec::new();
        }
    };

    let candidates = prioritize(candidates);
    if candidates.is_empty() {
        return Vec::new();
    }
    debug!(target: "sitescout::menu", "interacting with {} menu candidates", candidates.len());

    let poll_budget = if spa { POLL_BUDGET_SPA } else { POLL_BUDGET_STATIC };
    let mut harvested: Vec<PageLink> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in &candidates {
        if phase_start.elapsed() >= MENU_PHASE_BUDGET {
            debug!(target: "sitescout::menu", "menu phase budget exhausted");
            break;
        }

        match interact(page, base_site, candidate, poll_budget).await {
            Ok(links) => {
                for link in links {
                    if seen.insert(link.url.clone()) {
                        harvested.push(link);
                    }
                }
            }
            Err(e) => {
                debug!(target: "sitescout::menu", "candidate '{}' skipped: {e}", candidate.text);
            }
        }

        park_mouse(page).await;
        tokio::time::sleep(MOUSE_PARK_SETTLE).await;
    }

    debug!(target: "sitescout::menu", "menu interaction revealed {} links", harvested.len());
    harvested
}

/// Hover first; click only if hover revealed nothing and the candidate both
/// advertises a submenu and passes the safety filter.
async fn interact(
    page: &Page,
    base_site: &str,
    candidate: &MenuCandidate,
    poll_budget: Duration,
) -> Result<Vec<PageLink>> {
    let selector = format!("[data-scout-menu=\"{}\"]", candidate.idx);
    let snapshot = super::visible_link_urls(page).await?;

    // Hover strategy
    let element = page
        .find_element(selector.as_str())
        .await
        .map_err(|e| anyhow::anyhow!("candidate vanished: {e}"))?;

    let hovered = tokio::time::timeout(GESTURE_DEADLINE, element.hover())
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);

    if hovered && wait_for_new_urls(page, &snapshot, poll_budget).await {
        return Ok(super::newly_revealed_links(
            page,
            base_site,
            &snapshot,
            RevealedBy::Hover,
            &candidate.text,
        )
        .await);
    }

    // Click strategy
    if !candidate.has_sub_indicator || !click_safe(candidate) {
        return Ok(Vec::new());
    }

    let url_before = page.url().await.ok().flatten();
    let clicked = tokio::time::timeout(GESTURE_DEADLINE, element.click())
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
    if !clicked {
        return Ok(Vec::new());
    }

    let revealed = wait_for_new_urls(page, &snapshot, poll_budget).await;

    // A click that navigated is rolled back and the candidate abandoned.
    let url_after = page.url().await.ok().flatten();
    if url_before.is_some() && url_after != url_before {
        warn!(
            target: "sitescout::menu",
            "click on '{}' navigated away; going back",
            candidate.text
        );
        if let Some(back) = url_before
            && let Err(e) = page.goto(back.as_str()).await
        {
            warn!(target: "sitescout::menu", "rollback navigation failed: {e}");
        }
        let _ = tokio::time::timeout(GESTURE_DEADLINE, page.wait_for_navigation()).await;
        return Ok(Vec::new());
    }

    if revealed {
        let links = super::newly_revealed_links(
            page,
            base_site,
            &snapshot,
            RevealedBy::Click,
            &candidate.text,
        )
        .await;
        press_escape(page).await;
        return Ok(links);
    }

    Ok(Vec::new())
}

/// Poll the visible-URL snapshot until something new shows up.
async fn wait_for_new_urls(page: &Page, snapshot: &HashSet<String>, budget: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < budget {
        tokio::time::sleep(POLL_INTERVAL).await;
        if let Ok(current) = super::visible_link_urls(page).await
            && current.difference(snapshot).next().is_some()
        {
            return true;
        }
    }
    false
}

/// Close a click-opened menu without touching the page content.
async fn press_escape(page: &Page) {
    for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
        let params = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key("Escape")
            .build();
        match params {
            Ok(params) => {
                if let Err(e) = page.execute(params).await {
                    debug!(target: "sitescout::menu", "escape dispatch failed: {e}");
                    return;
                }
            }
            Err(e) => {
                debug!(target: "sitescout::menu", "escape params invalid: {e}");
                return;
            }
        }
    }
}

/// Move the mouse to the top-left corner so hover menus collapse.
async fn park_mouse(page: &Page) {
    let params = DispatchMouseEventParams::builder()
        .r#type(DispatchMouseEventType::MouseMoved)
        .x(0.0)
        .y(0.0)
        .build();
    match params {
        Ok(params) => {
            if let Err(e) = page.execute(params).await {
                debug!(target: "sitescout::menu", "mouse park failed: {e}");
            }
        }
        Err(e) => debug!(target: "sitescout::menu", "mouse params invalid: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(tag: &str) -> MenuCandidate {
        MenuCandidate {
            idx: 0,
            text: "Products".into(),
            tag: tag.into(),
            has_sub_indicator: true,
            has_real_href: false,
            has_popup_aria: false,
            has_toggle_class: false,
            has_click_handler: false,
        }
    }

    #[test]
    fn anchors_with_real_hrefs_need_popup_aria() {
        let mut anchor = candidate("a");
        anchor.has_real_href = true;
        assert!(!click_safe(&anchor));
        anchor.has_popup_aria = true;
        assert!(click_safe(&anchor));
    }

    #[test]
    fn hashless_anchors_are_safe() {
        let anchor = candidate("a");
        assert!(click_safe(&anchor));
    }

    #[test]
    fn buttons_are_always_safe() {
        assert!(click_safe(&candidate("button")));
    }

    #[test]
    fn spans_need_explicit_handlers() {
        let mut span = candidate("span");
        assert!(!click_safe(&span));
        span.has_click_handler = true;
        assert!(click_safe(&span));
    }

    #[test]
    fn prioritize_prefers_sub_indicators_and_caps() {
        let mut candidates = Vec::new();
        for i in 0..30u32 {
            let mut c = candidate("button");
            c.idx = i;
            c.has_sub_indicator = i % 3 == 0;
            candidates.push(c);
        }
        let picked = prioritize(candidates);
        assert_eq!(picked.len(), MAX_CANDIDATES);
        // All sub-indicator candidates (10 of 30) come first, in order.
        assert!(picked[..10].iter().all(|c| c.has_sub_indicator));
        assert!(picked[10..].iter().all(|c| !c.has_sub_indicator));
        assert!(picked[..10].windows(2).all(|w| w[0].idx < w[1].idx));
    }
}
