//! Typestate builder for `DiscoveryConfig`.
//!
//! The builder moves through `() -> WithProjectId -> Complete` as the two
//! required fields are supplied; `build()` is only available on `Complete`,
//! so a half-configured discovery cannot compile.

use std::marker::PhantomData;

use anyhow::{Result, anyhow};

use super::types::{
    ALLOWED_DEPTH_CAPS, ALLOWED_PAGE_CAPS, DEFAULT_DEPTH_CAP, DEFAULT_PAGE_CAP, DiscoveryConfig,
};

// Type states
pub struct WithProjectId;
pub struct Complete;

pub struct DiscoveryConfigBuilder<State = ()> {
    project_id: Option<String>,
    root_url: Option<String>,
    depth_cap: u8,
    page_cap: usize,
    use_sitemap: bool,
    login_recipe_id: Option<String>,
    headless: bool,
    in_container: bool,
    _phantom: PhantomData<State>,
}

impl Default for DiscoveryConfigBuilder<()> {
    fn default() -> Self {
        Self {
            project_id: None,
            root_url: None,
            depth_cap: DEFAULT_DEPTH_CAP,
            page_cap: DEFAULT_PAGE_CAP,
            use_sitemap: true,
            login_recipe_id: None,
            headless: true,
            in_container: false,
            _phantom: PhantomData,
        }
    }
}

impl<State> DiscoveryConfigBuilder<State> {
    fn transition<Next>(self) -> DiscoveryConfigBuilder<Next> {
        DiscoveryConfigBuilder {
            project_id: self.project_id,
            root_url: self.root_url,
            depth_cap: self.depth_cap,
            page_cap: self.page_cap,
            use_sitemap: self.use_sitemap,
            login_recipe_id: self.login_recipe_id,
            headless: self.headless,
            in_container: self.in_container,
            _phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn depth_cap(mut self, depth: u8) -> Self {
        self.depth_cap = depth;
        self
    }

    #[must_use]
    pub fn page_cap(mut self, pages: usize) -> Self {
        self.page_cap = pages;
        self
    }

    #[must_use]
    pub fn use_sitemap(mut self, enabled: bool) -> Self {
        self.use_sitemap = enabled;
        self
    }

    #[must_use]
    pub fn login_recipe_id(mut self, id: impl Into<String>) -> Self {
        self.login_recipe_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn in_container(mut self, in_container: bool) -> Self {
        self.in_container = in_container;
        self
    }
}

impl DiscoveryConfigBuilder<()> {
    #[must_use]
    pub fn project_id(mut self, id: impl Into<String>) -> DiscoveryConfigBuilder<WithProjectId> {
        self.project_id = Some(id.into());
        self.transition()
    }
}

impl DiscoveryConfigBuilder<WithProjectId> {
    #[must_use]
    pub fn root_url(mut self, url: impl Into<String>) -> DiscoveryConfigBuilder<Complete> {
        self.root_url = Some(url.into());
        self.transition()
    }
}

impl DiscoveryConfigBuilder<Complete> {
    /// Validate caps and produce the immutable config.
    pub fn build(self) -> Result<DiscoveryConfig> {
        let project_id = self.project_id.expect("typestate guarantees project_id");
        let root_url = self.root_url.expect("typestate guarantees root_url");

        if url::Url::parse(&root_url).is_err() {
            return Err(anyhow!("root URL '{root_url}' is not a valid URL"));
        }
        if !ALLOWED_DEPTH_CAPS.contains(&self.depth_cap) {
            return Err(anyhow!(
                "depth cap {} not allowed (choose one of {ALLOWED_DEPTH_CAPS:?})",
                self.depth_cap
            ));
        }
        if !ALLOWED_PAGE_CAPS.contains(&self.page_cap) {
            return Err(anyhow!(
                "page cap {} not allowed (choose one of {ALLOWED_PAGE_CAPS:?})",
                self.page_cap
            ));
        }

        Ok(DiscoveryConfig {
            project_id,
            root_url,
            depth_cap: self.depth_cap,
            page_cap: self.page_cap,
            use_sitemap: self.use_sitemap,
            login_recipe_id: self.login_recipe_id,
            headless: self.headless,
            in_container: self.in_container,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DiscoveryConfig::builder()
            .project_id("proj-1")
            .root_url("https://example.com")
            .build()
            .expect("valid config");
        assert_eq!(config.depth_cap(), DEFAULT_DEPTH_CAP);
        assert_eq!(config.page_cap(), DEFAULT_PAGE_CAP);
        assert!(config.use_sitemap());
        assert!(config.headless());
    }

    #[test]
    fn rejects_unsupported_caps() {
        assert!(
            DiscoveryConfig::builder()
                .project_id("p")
                .root_url("https://example.com")
                .depth_cap(4)
                .build()
                .is_err()
        );
        assert!(
            DiscoveryConfig::builder()
                .project_id("p")
                .root_url("https://example.com")
                .page_cap(33)
                .build()
                .is_err()
        );
    }

    #[test]
    fn rejects_bad_root_url() {
        assert!(
            DiscoveryConfig::builder()
                .project_id("p")
                .root_url("::nope::")
                .build()
                .is_err()
        );
    }

    #[test]
    fn container_rewrite_applies_only_in_container() {
        let config = DiscoveryConfig::builder()
            .project_id("p")
            .root_url("http://localhost:3000")
            .in_container(true)
            .build()
            .expect("valid");
        assert_eq!(
            config.navigation_url("http://localhost:3000/a"),
            "http://host.docker.internal:3000/a"
        );

        let config = DiscoveryConfig::builder()
            .project_id("p")
            .root_url("http://localhost:3000")
            .build()
            .expect("valid");
        assert_eq!(
            config.navigation_url("http://localhost:3000/a"),
            "http://localhost:3000/a"
        );
    }
}
