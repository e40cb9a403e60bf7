//! Authenticated session capability.
//!
//! After a login recipe succeeds, the cookies living in the browser profile
//! are snapshotted into a [`StorageState`]. The [`AuthSession`] wraps that
//! snapshot together with the post-login tab, the *session anchor* (some
//! engines drop per-profile storage when the last tab of a session closes,
//! so the anchor stays open for the whole crawl), and knows how to re-seed a
//! page when the site forgets who we are mid-crawl.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetCookiesParams};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Cookie jar snapshot taken right after login.
///
/// Cookies are kept as raw JSON values: CDP `Cookie` and `CookieParam` are
/// different structs with a large common subset, and the serde round-trip
/// is the lossless bridge between them. A malformed entry degrades to a
/// skipped cookie, never a failed crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<serde_json::Value>,
    pub captured_at: chrono::DateTime<chrono::Utc>,
}

impl StorageState {
    /// Snapshot all cookies visible to `page`.
    pub async fn capture(page: &Page) -> Result<Self> {
        let cookies = page
            .get_cookies()
            .await
            .context("failed to read cookies for storage state")?;

        let cookies = cookies
            .into_iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect::<Vec<_>>();

        debug!(target: "sitescout::session", "captured storage state with {} cookies", cookies.len());
        Ok(Self {
            cookies,
            captured_at: chrono::Utc::now(),
        })
    }

    /// Deserialize the raw snapshot into CDP cookie params, dropping any
    /// entry that no longer round-trips.
    #[must_use]
    pub fn cookie_params(&self) -> Vec<CookieParam> {
        self.cookies
            .iter()
            .filter_map(|v| serde_json::from_value::<CookieParam>(v.clone()).ok())
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Opaque capability granting authenticated page fetches.
///
/// Owned by the orchestrator; consumed by the page fetcher. Session-loss
/// recovery is [`AuthSession::reapply`]: re-seed the stored cookies and let
/// the caller retry once.
pub struct AuthSession {
    storage_state: StorageState,
    login_url: String,
    anchor: Page,
}

impl AuthSession {
    /// Wrap a freshly authenticated tab. The tab stays open as the session
    /// anchor until [`close`](Self::close).
    pub async fn establish(anchor: Page, login_url: String) -> Result<Self> {
        let storage_state = StorageState::capture(&anchor).await?;
        if storage_state.is_empty() {
            warn!(target: "sitescout::session", "login produced no cookies; session may be token-based");
        }
        Ok(Self {
            storage_state,
            login_url,
            anchor,
        })
    }

    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    #[must_use]
    pub fn storage_state(&self) -> &StorageState {
        &self.storage_state
    }

    /// Inject the captured cookies into `page` before (re-)navigation.
    ///
    /// Returns the number of cookies applied; zero is not an error (the
    /// retry simply proceeds unauthenticated and the page gets flagged).
    pub async fn reapply(&self, page: &Page) -> Result<usize> {
        let params = self.storage_state.cookie_params();
        if params.is_empty() {
            warn!(target: "sitescout::session", "storage state holds no applicable cookies");
            return Ok(0);
        }

        let count = params.len();
        page.execute(SetCookiesParams::new(params))
            .await
            .context("failed to re-apply session cookies")?;
        debug!(target: "sitescout::session", "re-applied {count} session cookies");
        Ok(count)
    }

    /// Release the anchor tab. Called by the orchestrator's cleanup path;
    /// errors are logged, not propagated, so teardown always completes.
    pub async fn close(self) {
        if let Err(e) = self.anchor.close().await {
            warn!(target: "sitescout::session", "failed to close session anchor: {e}");
        }
    }
}
