//! Live progress: last-known snapshot per project plus a push stream.
//!
//! The snapshot is one coherent value replaced atomically per emit, so
//! polling clients behind lossy transports always read something sane. The
//! push stream is a `tokio::sync::broadcast` channel: delivery is
//! fire-and-forget and a lagged subscriber only loses intermediate events,
//! never the final state (which is always in the snapshot).

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Engine-side lifecycle status of a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    Pending,
    Discovering,
    Complete,
    Failed,
}

/// Engine-side phases, in emission order. `Ord` reflects that order so
/// monotonicity is testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryPhase {
    Initialization,
    Connectivity,
    Sitemap,
    Authentication,
    Crawling,
    Processing,
    Saving,
    Complete,
    Error,
}

/// Coarser phase vocabulary used on the wire, kept stable for display
/// parity across clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportPhase {
    Crawling,
    Sitemap,
    Filtering,
    Completed,
    Error,
}

impl DiscoveryPhase {
    #[must_use]
    pub fn transport(&self) -> TransportPhase {
        match self {
            Self::Sitemap => TransportPhase::Sitemap,
            Self::Processing | Self::Saving => TransportPhase::Filtering,
            Self::Complete => TransportPhase::Completed,
            Self::Error => TransportPhase::Error,
            Self::Initialization
            | Self::Connectivity
            | Self::Authentication
            | Self::Crawling => TransportPhase::Crawling,
        }
    }

    /// Human-readable message shown next to the phase.
    #[must_use]
    pub fn friendly_message(&self) -> &'static str {
        match self {
            Self::Initialization => "Preparing discovery...",
            Self::Connectivity => "Checking that your site is reachable...",
            Self::Sitemap => "Reading the site's sitemap...",
            Self::Authentication => "Logging in with your saved credentials...",
            Self::Crawling => "Exploring pages...",
            Self::Processing => "Organizing discovered pages...",
            Self::Saving => "Saving the site map...",
            Self::Complete => "Discovery complete!",
            Self::Error => "Discovery ran into a problem.",
        }
    }
}

/// Snapshot of a crawl's progress. One coherent value per emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub project_id: String,
    pub status: DiscoveryStatus,
    pub phase: DiscoveryPhase,
    pub discovered_count: usize,
    pub total_count: usize,
    pub message: String,
    /// Running snapshot of discovered canonical URLs.
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Progress {
    #[must_use]
    pub fn pending(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            status: DiscoveryStatus::Pending,
            phase: DiscoveryPhase::Initialization,
            discovered_count: 0,
            total_count: 0,
            message: String::new(),
            urls: Vec::new(),
            current_url: None,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Event pushed to subscribers on every progress change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub project_id: String,
    pub phase: TransportPhase,
    pub message: String,
    pub friendly_message: String,
    pub urls_found: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u8>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Default broadcast channel capacity.
const CHANNEL_CAPACITY: usize = 256;

/// Snapshot map + broadcast stream, shared by all projects.
pub struct ProgressBroadcaster {
    snapshots: DashMap<String, Progress>,
    sender: broadcast::Sender<ProgressEvent>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new(CHANNEL_CAPACITY)
    }
}

impl ProgressBroadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            snapshots: DashMap::new(),
            sender,
        }
    }

    /// Store the snapshot and push the derived event. Send failures (no
    /// subscribers) are expected and ignored.
    pub fn emit(&self, progress: Progress) {
        self.emit_with_depth(progress, None, None);
    }

    /// Emit with crawl depth attached, for the crawling phase.
    pub fn emit_with_depth(
        &self,
        mut progress: Progress,
        current_depth: Option<u8>,
        max_depth: Option<u8>,
    ) {
        progress.updated_at = chrono::Utc::now();

        let event = ProgressEvent {
            project_id: progress.project_id.clone(),
            phase: progress.phase.transport(),
            message: progress.message.clone(),
            friendly_message: progress.phase.friendly_message().to_string(),
            urls_found: progress.discovered_count,
            current_depth,
            max_depth,
            timestamp: progress.updated_at,
        };

        self.snapshots
            .insert(progress.project_id.clone(), progress);
        let _ = self.sender.send(event);
    }

    /// Last-known snapshot for a project.
    #[must_use]
    pub fn snapshot(&self, project_id: &str) -> Option<Progress> {
        self.snapshots.get(project_id).map(|p| p.clone())
    }

    /// Subscribe to the push stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
