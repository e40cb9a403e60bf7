//! Viewport thumbnail capture.

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, Viewport,
};
use log::{debug, warn};

/// Thumbnail bounds; anything beyond the fold is irrelevant for a preview.
const THUMBNAIL_WIDTH: f64 = 1280.0;
const THUMBNAIL_HEIGHT: f64 = 720.0;

/// JPEG quality for thumbnails. Previews, not archives.
const THUMBNAIL_QUALITY: i64 = 50;

/// Hard deadline on capture; a stuck renderer must not stall the crawl.
const CAPTURE_DEADLINE: Duration = Duration::from_secs(5);

/// Capture a bounded JPEG thumbnail of the current viewport.
///
/// Failures degrade to `None`: a missing thumbnail never fails a page.
pub async fn capture_thumbnail(page: &Page, url: &str) -> Option<Vec<u8>> {
    match tokio::time::timeout(CAPTURE_DEADLINE, capture(page)).await {
        Ok(Ok(bytes)) => {
            debug!(target: "sitescout::fetch", "thumbnail captured for {url} ({} bytes)", bytes.len());
            Some(bytes)
        }
        Ok(Err(e)) => {
            warn!(target: "sitescout::fetch", "thumbnail capture failed for {url}: {e}");
            None
        }
        Err(_) => {
            warn!(target: "sitescout::fetch", "thumbnail capture timed out for {url}");
            None
        }
    }
}

async fn capture(page: &Page) -> Result<Vec<u8>> {
    let params = CaptureScreenshotParams {
        format: Some(CaptureScreenshotFormat::Jpeg),
        quality: Some(THUMBNAIL_QUALITY),
        clip: Some(Viewport {
            x: 0.0,
            y: 0.0,
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
            scale: 1.0,
        }),
        ..Default::default()
    };

    page.screenshot(params)
        .await
        .map_err(|e| anyhow::anyhow!("screenshot failed: {e}"))
}
