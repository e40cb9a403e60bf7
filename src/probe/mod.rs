//! Pre-flight reachability probe.
//!
//! A cheap HEAD request issued before the browser is launched, so DNS,
//! connection-refused and timeout failures surface as actionable messages
//! instead of opaque navigation errors minutes later. Anything that produces
//! an HTTP response counts as reachable; the progressive fetcher is the
//! authority on per-page failures, and plenty of servers answer HEAD with
//! 405 or worse while serving GET fine.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use url::Url;

use crate::error::{DiscoveryError, UnreachableKind};
use crate::urlnorm;

/// Probe timeout. Kept short: this runs before any user-visible progress.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const PROBE_USER_AGENT: &str = concat!("sitescout/", env!("CARGO_PKG_VERSION"));

/// Issue a HEAD request against `url` and classify transport failures.
///
/// Returns `Ok(())` when the host answered at all, `DiscoveryError::Unreachable`
/// for the three classified failure classes, and `Ok(())` for anything
/// ambiguous so the crawl still gets its chance.
pub async fn check_reachable(url: &str) -> Result<(), DiscoveryError> {
    let parsed =
        Url::parse(url).map_err(|_| DiscoveryError::InvalidUrl(url.to_string()))?;
    let local = parsed
        .host_str()
        .is_some_and(urlnorm::is_local_host);

    let client = build_client(local)
        .context("failed to build probe HTTP client")
        .map_err(DiscoveryError::Other)?;

    match client.head(parsed.clone()).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_server_error() {
                warn!(%url, %status, "probe got a server error status; proceeding anyway");
            } else {
                debug!(%url, %status, "probe succeeded");
            }
            Ok(())
        }
        Err(e) => match classify(&e) {
            Some(kind) => Err(DiscoveryError::Unreachable {
                kind,
                message: format!("{url}: {}", kind.advice()),
            }),
            // HEAD-unfriendly servers and odd middleboxes fall through to
            // the fetcher rather than failing the whole run here.
            None => {
                warn!(%url, error = %e, "probe failed with unclassified error; proceeding");
                Ok(())
            }
        },
    }
}

/// Local addresses commonly run with self-signed certificates.
fn build_client(local: bool) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(PROBE_USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(PROBE_TIMEOUT);
    if local {
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder.build().map_err(Into::into)
}

/// Map a reqwest transport error onto the probe failure taxonomy.
fn classify(error: &reqwest::Error) -> Option<UnreachableKind> {
    if error.is_timeout() {
        return Some(UnreachableKind::Timeout);
    }

    // reqwest does not expose the io::ErrorKind, so fall back to the
    // rendered error chain the way the crawl retry classifier does.
    let chain = error_chain_text(error);
    if chain.contains("connection refused") {
        return Some(UnreachableKind::ConnectionRefused);
    }
    if chain.contains("dns") || chain.contains("failed to lookup") || chain.contains("resolve") {
        return Some(UnreachableKind::NameNotResolved);
    }
    None
}

fn error_chain_text(error: &reqwest::Error) -> String {
    let mut text = error.to_string().to_lowercase();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push(' ');
        text.push_str(&cause.to_string().to_lowercase());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn head_success_is_reachable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("HEAD", "/")
            .with_status(200)
            .create_async()
            .await;

        check_reachable(&server.url()).await.expect("reachable");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_still_counts_as_reachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/")
            .with_status(503)
            .create_async()
            .await;

        check_reachable(&server.url()).await.expect("reachable");
    }

    #[tokio::test]
    async fn connection_refused_is_classified() {
        // Bind a port, then drop the listener so connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let err = check_reachable(&format!("http://127.0.0.1:{port}/"))
            .await
            .expect_err("must be unreachable");
        match err {
            DiscoveryError::Unreachable { kind, .. } => {
                assert_eq!(kind, UnreachableKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bad_hostname_is_classified() {
        let err = check_reachable("http://definitely-not-a-real-host.invalid/")
            .await
            .expect_err("must be unreachable");
        match err {
            DiscoveryError::Unreachable { kind, .. } => {
                assert_eq!(kind, UnreachableKind::NameNotResolved);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_url_rejected() {
        assert!(matches!(
            check_reachable("not a url").await,
            Err(DiscoveryError::InvalidUrl(_))
        ));
    }
}
