//! Error types for discovery operations.
//!
//! `DiscoveryError` is the typed error surfaced at the engine API boundary.
//! Internal plumbing uses `anyhow::Result` with context; only the seams that
//! callers react to get their own variants here.

use thiserror::Error;

/// Why the root URL could not be reached during the pre-flight probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableKind {
    /// TCP connection refused (nothing listening, wrong port, firewall)
    ConnectionRefused,
    /// DNS resolution failed
    NameNotResolved,
    /// No response within the probe deadline
    Timeout,
}

impl UnreachableKind {
    /// Actionable, user-readable explanation for this failure class.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ConnectionRefused => {
                "The server refused the connection. Check that the site is running and the port is correct."
            }
            Self::NameNotResolved => {
                "The hostname could not be resolved. Check the URL for typos or DNS configuration."
            }
            Self::Timeout => {
                "The server did not respond in time. It may be down, overloaded, or blocked by a firewall."
            }
        }
    }
}

/// Typed error for a discovery run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("root URL unreachable: {message}")]
    Unreachable {
        kind: UnreachableKind,
        message: String,
    },

    #[error("login recipe '{0}' not found")]
    RecipeNotFound(String),

    #[error("login failed at step {step}: {reason}")]
    LoginFailed { step: usize, reason: String },

    #[error("no pages could be fetched: {cause}")]
    NoPagesDiscovered { cause: String },

    #[error("browser error: {0}")]
    Browser(#[source] anyhow::Error),

    #[error("storage error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DiscoveryError {
    /// True when the error has an actionable cause the caller can fix
    /// (bad URL, unreachable host, bad recipe). Server-side faults return
    /// false and should be surfaced generically.
    ///
    /// A classified client error must never be re-wrapped into a server
    /// error by callers.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl(_)
                | Self::Unreachable { .. }
                | Self::RecipeNotFound(_)
                | Self::LoginFailed { .. }
                | Self::NoPagesDiscovered { .. }
        )
    }
}

/// Convenience alias for engine-level results.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_server_split() {
        assert!(DiscoveryError::InvalidUrl("x".into()).is_client_error());
        assert!(
            DiscoveryError::LoginFailed {
                step: 2,
                reason: "selector not found".into()
            }
            .is_client_error()
        );
        assert!(!DiscoveryError::Browser(anyhow::anyhow!("tab crashed")).is_client_error());
    }

    #[test]
    fn unreachable_advice_is_specific() {
        assert!(
            UnreachableKind::NameNotResolved
                .advice()
                .contains("resolved")
        );
        assert!(UnreachableKind::Timeout.advice().contains("respond"));
    }
}
