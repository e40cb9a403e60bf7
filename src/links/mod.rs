//! Link extraction.
//!
//! A single JS pass enumerates visible anchors (and navigating buttons),
//! classifies their page location and resolves their URLs; the Rust side
//! canonicalizes, splits external from internal, and caps anchor text. The
//! menu interactor reuses this module's visible-URL snapshot and diff
//! helpers to harvest hover/click-revealed links.

pub mod js_scripts;
pub mod menu;

use std::collections::HashSet;

use anyhow::{Context, Result};
use chromiumoxide::Page;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::urlnorm;

/// Where a link lives on the page (or that it leaves the site).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkLocation {
    Navigation,
    Footer,
    Sidebar,
    Content,
    Button,
    Form,
    External,
}

impl LinkLocation {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Footer => "footer",
            Self::Sidebar => "sidebar",
            Self::Content => "content",
            Self::Button => "button",
            Self::Form => "form",
            Self::External => "external",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "navigation" => Self::Navigation,
            "footer" => Self::Footer,
            "sidebar" => Self::Sidebar,
            "button" => Self::Button,
            "form" => Self::Form,
            "external" => Self::External,
            _ => Self::Content,
        }
    }
}

/// How a link became visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RevealedBy {
    #[default]
    None,
    Hover,
    Click,
}

impl RevealedBy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hover => "hover",
            Self::Click => "click",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "hover" => Self::Hover,
            "click" => Self::Click,
            _ => Self::None,
        }
    }
}

/// Raw link as returned by `LINKS_SCRIPT`.
#[derive(Debug, Clone, Deserialize)]
struct RawLink {
    url: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    location: String,
}

/// A hyperlink edge discovered on a page. `url` is canonical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLink {
    pub url: String,
    pub text: String,
    pub location: LinkLocation,
    /// 0 = statically visible, 1 = revealed by menu interaction.
    pub menu_level: u8,
    pub revealed_by: RevealedBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_menu_text: Option<String>,
}

/// Maximum anchor text length persisted with an edge.
pub const MAX_LINK_TEXT: usize = 200;

/// Extract all visible static links from the page.
///
/// Cross-site targets (after host folding) are kept but re-labelled
/// `External`; the orchestrator drops them from both queue and storage.
pub async fn extract_links(page: &Page, base_site: &str) -> Result<Vec<PageLink>> {
    let raw: Vec<RawLink> = page
        .evaluate(js_scripts::LINKS_SCRIPT)
        .await
        .context("link extraction script failed")?
        .into_value()
        .context("link extraction returned a non-JSON value")?;

    Ok(raw
        .into_iter()
        .map(|link| to_page_link(link, base_site, 0, RevealedBy::None, None))
        .collect())
}

/// Snapshot of currently visible link URLs (canonical), for menu diffs.
pub async fn visible_link_urls(page: &Page) -> Result<HashSet<String>> {
    let urls: Vec<String> = page
        .evaluate(js_scripts::VISIBLE_URLS_SCRIPT)
        .await
        .context("visible URL snapshot failed")?
        .into_value()
        .context("visible URL snapshot returned a non-JSON value")?;

    Ok(urls.iter().map(|u| urlnorm::canonicalize(u)).collect())
}

/// Re-extract links and keep only those absent from `snapshot`.
pub(crate) async fn newly_revealed_links(
    page: &Page,
    base_site: &str,
    snapshot: &HashSet<String>,
    revealed_by: RevealedBy,
    parent_menu_text: &str,
) -> Vec<PageLink> {
    let raw: Vec<RawLink> = match page.evaluate(js_scripts::LINKS_SCRIPT).await {
        Ok(result) => result.into_value().unwrap_or_default(),
        Err(e) => {
            warn!(target: "sitescout::links", "revealed-link extraction failed: {e}");
            return Vec::new();
        }
    };

    raw.into_iter()
        .map(|link| {
            to_page_link(
                link,
                base_site,
                1,
                revealed_by,
                Some(parent_menu_text.to_string()),
            )
        })
        .filter(|link| !snapshot.contains(&link.url))
        .collect()
}

fn to_page_link(
    raw: RawLink,
    base_site: &str,
    menu_level: u8,
    revealed_by: RevealedBy,
    parent_menu_text: Option<String>,
) -> PageLink {
    let canonical = urlnorm::canonicalize(&raw.url);
    let location = if urlnorm::same_site(&raw.url, base_site) {
        LinkLocation::parse(&raw.location)
    } else {
        LinkLocation::External
    };

    let mut text = raw.text;
    if text.len() > MAX_LINK_TEXT {
        text = text.chars().take(MAX_LINK_TEXT).collect();
    }

    PageLink {
        url: canonical,
        text,
        location,
        menu_level,
        revealed_by,
        parent_menu_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(url: &str, location: &str) -> RawLink {
        RawLink {
            url: url.to_string(),
            text: "link".to_string(),
            location: location.to_string(),
        }
    }

    #[test]
    fn same_site_links_keep_their_location() {
        let link = to_page_link(
            raw("https://example.com/a", "navigation"),
            "https://example.com",
            0,
            RevealedBy::None,
            None,
        );
        assert_eq!(link.location, LinkLocation::Navigation);
        assert_eq!(link.url, "https://example.com/a");
    }

    #[test]
    fn cross_host_links_become_external() {
        let link = to_page_link(
            raw("https://elsewhere.com/a", "content"),
            "https://example.com",
            0,
            RevealedBy::None,
            None,
        );
        assert_eq!(link.location, LinkLocation::External);
    }

    #[test]
    fn subdomains_are_not_external() {
        let link = to_page_link(
            raw("https://docs.example.com/a", "content"),
            "https://example.com",
            0,
            RevealedBy::None,
            None,
        );
        assert_eq!(link.location, LinkLocation::Content);
    }

    #[test]
    fn link_text_is_capped() {
        let mut long = raw("https://example.com/a", "content");
        long.text = "x".repeat(500);
        let link = to_page_link(long, "https://example.com", 0, RevealedBy::None, None);
        assert_eq!(link.text.len(), MAX_LINK_TEXT);
    }

    #[test]
    fn location_round_trip() {
        for loc in [
            LinkLocation::Navigation,
            LinkLocation::Footer,
            LinkLocation::Sidebar,
            LinkLocation::Content,
            LinkLocation::Button,
            LinkLocation::External,
        ] {
            assert_eq!(LinkLocation::parse(loc.as_str()), loc);
        }
    }
}
