//! Browser acquisition and launch.
//!
//! Resolution is a flat candidate walk: an explicit `CHROMIUM_PATH`
//! override, then every Chromium-family binary name on `PATH`, then a short
//! per-OS list of conventional install locations. When nothing exists
//! locally a managed Chromium is downloaded into the cache directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Pinned desktop user agent so fingerprints stay stable across launches.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Binary names probed on `PATH`.
const PATH_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

/// Launch flags: headless stability in containers, automation-marker
/// suppression, and no profile-manager chrome.
const LAUNCH_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-desktop-notifications",
    "--disable-software-rasterizer",
    "--ignore-certificate-errors",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--metrics-recording-only",
    "--password-store=basic",
    "--use-mock-keychain",
    "--hide-scrollbars",
    "--mute-audio",
];

fn conventional_paths() -> &'static [&'static str] {
    if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/snap/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    }
}

/// Locate an installed Chrome/Chromium binary, if any.
#[must_use]
pub fn find_browser() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("CHROMIUM_PATH") {
        let explicit = PathBuf::from(explicit);
        if explicit.is_file() {
            debug!("using browser from CHROMIUM_PATH: {}", explicit.display());
            return Some(explicit);
        }
        warn!(
            "CHROMIUM_PATH is set but {} does not exist; falling back to search",
            explicit.display()
        );
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            for name in PATH_NAMES {
                candidates.push(dir.join(name));
                if cfg!(target_os = "windows") {
                    candidates.push(dir.join(format!("{name}.exe")));
                }
            }
        }
    }
    candidates.extend(conventional_paths().iter().map(PathBuf::from));

    let found = candidates.into_iter().find(|p| p.is_file());
    if let Some(path) = &found {
        debug!("found browser at {}", path.display());
    }
    found
}

/// Find an installed browser or download a managed Chromium into the cache.
pub async fn ensure_browser() -> Result<PathBuf> {
    if let Some(installed) = find_browser() {
        return Ok(installed);
    }

    let cache = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sitescout")
        .join("chromium");
    tokio::fs::create_dir_all(&cache)
        .await
        .context("failed to create browser cache directory")?;

    info!(
        "no local Chrome/Chromium found; downloading a managed build into {}",
        cache.display()
    );

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache)
            .build()
            .map_err(|e| anyhow!("invalid browser fetcher options: {e}"))?,
    );
    let revision = fetcher
        .fetch()
        .await
        .context("managed Chromium download failed")?;

    info!("managed Chromium ready at {}", revision.executable_path.display());
    Ok(revision.executable_path)
}

/// Deserialization misses for CDP events chromiumoxide does not model.
/// Chrome emits them constantly; they carry no signal.
fn cdp_error_is_noise(message: &str) -> bool {
    message.contains("untagged enum Message") || message.contains("deserialize WS response")
}

/// Launch a browser with a dedicated profile directory.
///
/// Every crawl gets its own profile so concurrent runs never fight over the
/// singleton lock. The returned task drains the CDP event stream and must
/// be aborted by the caller during teardown.
pub async fn launch_browser(
    headless: bool,
    profile_dir: Option<PathBuf>,
) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let executable = ensure_browser().await?;

    let profile_dir = profile_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("sitescout_profile_{}", std::process::id()))
    });
    std::fs::create_dir_all(&profile_dir).context("failed to create profile directory")?;

    let mut builder = BrowserConfigBuilder::default()
        .chrome_executable(executable)
        .user_data_dir(&profile_dir)
        .window_size(1280, 720)
        .request_timeout(Duration::from_secs(30))
        .arg(format!("--user-agent={BROWSER_USER_AGENT}"));
    for flag in LAUNCH_FLAGS {
        builder = builder.arg(*flag);
    }
    builder = if headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };

    let config = builder
        .build()
        .map_err(|e| anyhow!("browser configuration rejected: {e}"))?;

    info!("launching browser");
    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("browser failed to launch")?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            if cdp_error_is_noise(&message) {
                debug!("dropping unmodeled CDP event: {message}");
            } else {
                error!("CDP handler error: {message}");
            }
        }
        debug!("CDP event stream closed");
    });

    Ok((browser, handler_task, profile_dir))
}
