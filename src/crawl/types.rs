//! Core types for crawl results.

use serde::{Deserialize, Serialize};

use crate::fetcher::PageKind;
use crate::links::{LinkLocation, PageLink, RevealedBy};

/// Item in the BFS queue: a canonical URL and its hop distance from root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub url: String,
    pub depth: u8,
}

/// One discovered page, keyed by canonical URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub url: String,
    pub title: String,
    pub kind: PageKind,
    pub requires_auth: bool,
    /// Minimum known hop distance from the root.
    pub depth: u8,
    /// HTTP 2xx (or unknowable-but-rendered) on the last fetch.
    pub accessible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Vec<u8>>,
}

/// One hyperlink edge between two discovered pages (canonical URLs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEdge {
    pub source_url: String,
    pub target_url: String,
    pub text: String,
    pub location: LinkLocation,
    pub menu_level: u8,
    pub revealed_by: RevealedBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_menu_text: Option<String>,
}

impl PageEdge {
    /// Build an edge from an extracted link. Self-loops are invalid input
    /// and rejected here rather than at persistence time.
    #[must_use]
    pub fn from_link(source_url: &str, link: &PageLink) -> Option<Self> {
        if source_url == link.url {
            return None;
        }
        Some(Self {
            source_url: source_url.to_string(),
            target_url: link.url.clone(),
            text: link.text.clone(),
            location: link.location,
            menu_level: link.menu_level,
            revealed_by: link.revealed_by,
            parent_menu_text: link.parent_menu_text.clone(),
        })
    }
}

/// A page fetch that failed; the crawl continues past these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlFailure {
    pub url: String,
    pub reason: String,
}

/// Aggregate result of one crawl, before persistence.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub pages: Vec<DiscoveredPage>,
    pub edges: Vec<PageEdge>,
    pub failures: Vec<CrawlFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loops_are_rejected() {
        let link = PageLink {
            url: "https://example.com/a".into(),
            text: "self".into(),
            location: LinkLocation::Content,
            menu_level: 0,
            revealed_by: RevealedBy::None,
            parent_menu_text: None,
        };
        assert!(PageEdge::from_link("https://example.com/a", &link).is_none());
        assert!(PageEdge::from_link("https://example.com/b", &link).is_some());
    }
}
