//! Login recipe execution.
//!
//! Drives a browser tab through a recipe's type/click/wait steps. Manual
//! recipes trust their explicit selectors completely and fail loudly when
//! one misses; auto recipes get a 5 second grace per selector and then fall
//! back to smart detection. Credential values never reach the logs.

pub mod detect;
pub mod recipe;

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::element::Element;
use log::{debug, info, warn};

use crate::error::DiscoveryError;

pub use detect::{Confidence, Detection, FieldKind};
pub use recipe::{Credentials, LoginRecipe, LoginStep, ManualSelectors, RecipeMode, StepKind};

/// Grace period for an auto-mode step selector before smart detection.
const SELECTOR_DEADLINE: Duration = Duration::from_secs(5);

/// Pause between steps; login forms debounce, animate and validate.
const INTER_STEP_PAUSE: Duration = Duration::from_secs(1);

/// How long to wait for the post-submit navigation. Single-page apps may
/// never navigate, so elapsing is success, not failure.
const NAVIGATION_WAIT: Duration = Duration::from_secs(15);

/// Final settle after navigation (cookies, redirects, session writes).
const POST_LOGIN_SETTLE: Duration = Duration::from_secs(2);

/// Default wait-step duration when the recipe gives none.
const DEFAULT_WAIT_MS: u64 = 2_000;

/// Result of a successful login execution.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Where the browser ended up after the recipe ran.
    pub final_url: String,
    pub steps_executed: usize,
}

/// Execute `recipe` on `page`, starting with navigation to `nav_url` (the
/// recipe's login URL after any container host rewrite).
pub async fn execute_recipe(
    page: &Page,
    recipe: &LoginRecipe,
    nav_url: &str,
) -> Result<LoginOutcome, DiscoveryError> {
    info!(target: "sitescout::login", "navigating to login page {nav_url}");
    page.goto(nav_url)
        .await
        .map_err(|e| anyhow!("failed to open login page: {e}"))
        .map_err(DiscoveryError::Browser)?;
    let _ = tokio::time::timeout(NAVIGATION_WAIT, page.wait_for_navigation()).await;

    for (index, step) in recipe.steps.iter().enumerate() {
        execute_step(page, recipe, index, step)
            .await
            .map_err(|e| DiscoveryError::LoginFailed {
                step: index,
                reason: format!("{e:#}"),
            })?;

        if index + 1 < recipe.steps.len() {
            tokio::time::sleep(INTER_STEP_PAUSE).await;
        }
    }

    // SPAs often sign in without a navigation event; elapsing is fine.
    match tokio::time::timeout(NAVIGATION_WAIT, page.wait_for_navigation()).await {
        Ok(Ok(_)) => debug!(target: "sitescout::login", "post-login navigation observed"),
        Ok(Err(e)) => warn!(target: "sitescout::login", "post-login navigation errored: {e}"),
        Err(_) => debug!(target: "sitescout::login", "no post-login navigation (SPA?)"),
    }
    tokio::time::sleep(POST_LOGIN_SETTLE).await;

    let final_url = page
        .url()
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| nav_url.to_string());

    info!(
        target: "sitescout::login",
        "login recipe completed ({} steps), landed on {final_url}",
        recipe.steps.len()
    );

    Ok(LoginOutcome {
        final_url,
        steps_executed: recipe.steps.len(),
    })
}

async fn execute_step(
    page: &Page,
    recipe: &LoginRecipe,
    index: usize,
    step: &LoginStep,
) -> Result<()> {
    match step.kind {
        StepKind::Wait => {
            let ms = step
                .value
                .as_deref()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_WAIT_MS);
            debug!(target: "sitescout::login", "step {index}: wait {ms}ms");
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(())
        }
        StepKind::Type => {
            let raw_value = step
                .value
                .as_deref()
                .ok_or_else(|| anyhow!("type step is missing a value"))?;
            let secret = recipe.is_secret(raw_value);
            let field_kind = if secret {
                FieldKind::Password
            } else {
                FieldKind::Username
            };

            let element = resolve_element(page, recipe, step, field_kind).await?;
            let value = recipe.substitute(raw_value);

            debug!(
                target: "sitescout::login",
                "step {index}: typing into {} ({})",
                field_kind.label(),
                if secret { "redacted" } else { raw_value }
            );

            element
                .click()
                .await
                .map_err(|e| anyhow!("failed to focus {}: {e}", field_kind.label()))?;
            element
                .type_str(&value)
                .await
                .map_err(|e| anyhow!("failed to type into {}: {e}", field_kind.label()))?;
            Ok(())
        }
        StepKind::Click => {
            let element = resolve_element(page, recipe, step, FieldKind::Submit).await?;
            debug!(target: "sitescout::login", "step {index}: clicking submit control");
            element
                .click()
                .await
                .map_err(|e| anyhow!("failed to click submit control: {e}"))?;
            Ok(())
        }
    }
}

/// Find the element a step targets, honoring the recipe's mode.
async fn resolve_element(
    page: &Page,
    recipe: &LoginRecipe,
    step: &LoginStep,
    kind: FieldKind,
) -> Result<Element> {
    match recipe.mode {
        RecipeMode::Manual => {
            let selectors = recipe
                .manual_selectors
                .as_ref()
                .ok_or_else(|| anyhow!("manual mode recipe has no manual_selectors"))?;
            let selector = match kind {
                FieldKind::Username => &selectors.username_selector,
                FieldKind::Password => &selectors.password_selector,
                FieldKind::Submit => &selectors.submit_selector,
            };
            find_with_deadline(page, selector, SELECTOR_DEADLINE)
                .await
                .ok_or_else(|| {
                    anyhow!("manual selector '{selector}' matched no element for {}", kind.label())
                })
        }
        RecipeMode::Auto => {
            if let Some(selector) = step.selector.as_deref()
                && let Some(element) = find_with_deadline(page, selector, SELECTOR_DEADLINE).await
            {
                return Ok(element);
            }

            if let Some(selector) = step.selector.as_deref() {
                debug!(
                    target: "sitescout::login",
                    "selector '{selector}' missed; falling back to smart detection for {}",
                    kind.label()
                );
            }

            let detection = detect::detect_field(page, kind)
                .await
                .context("smart detection failed")?
                .ok_or_else(|| anyhow!("could not locate {} on the page", kind.label()))?;

            debug!(
                target: "sitescout::login",
                "smart detection found {} via '{}' ({:?})",
                kind.label(),
                detection.strategy,
                detection.confidence
            );

            page.find_element(detect::TAGGED_SELECTOR)
                .await
                .map_err(|e| anyhow!("tagged element vanished after detection: {e}"))
        }
    }
}

/// Poll for a selector until it appears or the deadline elapses.
async fn find_with_deadline(page: &Page, selector: &str, deadline: Duration) -> Option<Element> {
    let start = Instant::now();
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Some(element);
        }
        if start.elapsed() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
