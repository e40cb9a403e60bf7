//! Core configuration type for discovery runs.

use serde::{Deserialize, Serialize};

/// Depth caps the engine accepts.
pub const ALLOWED_DEPTH_CAPS: &[u8] = &[1, 2, 3, 5];

/// Page caps the engine accepts.
pub const ALLOWED_PAGE_CAPS: &[usize] = &[25, 50, 100, 200];

/// Default depth cap (hops from the root).
pub const DEFAULT_DEPTH_CAP: u8 = 3;

/// Default engine-side page cap.
pub const DEFAULT_PAGE_CAP: usize = 100;

/// Configuration for one discovery run.
///
/// Construct through [`DiscoveryConfig::builder`]; fields are validated at
/// build time and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub(crate) project_id: String,
    pub(crate) root_url: String,
    pub(crate) depth_cap: u8,
    pub(crate) page_cap: usize,
    pub(crate) use_sitemap: bool,
    pub(crate) login_recipe_id: Option<String>,
    pub(crate) headless: bool,
    /// Running inside a container: loopback hosts are rewritten to
    /// `host.docker.internal` for navigation.
    pub(crate) in_container: bool,
}

impl DiscoveryConfig {
    #[must_use]
    pub fn builder() -> super::builder::DiscoveryConfigBuilder<()> {
        super::builder::DiscoveryConfigBuilder::default()
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    #[must_use]
    pub fn depth_cap(&self) -> u8 {
        self.depth_cap
    }

    #[must_use]
    pub fn page_cap(&self) -> usize {
        self.page_cap
    }

    #[must_use]
    pub fn use_sitemap(&self) -> bool {
        self.use_sitemap
    }

    #[must_use]
    pub fn login_recipe_id(&self) -> Option<&str> {
        self.login_recipe_id.as_deref()
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn in_container(&self) -> bool {
        self.in_container
    }

    /// The URL the browser should actually navigate to for `url`, honoring
    /// the container host rewrite.
    #[must_use]
    pub fn navigation_url(&self, url: &str) -> String {
        if self.in_container {
            crate::urlnorm::rewrite_for_container(url)
        } else {
            url.to_string()
        }
    }
}
