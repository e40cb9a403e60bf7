//! Configuration for a discovery run.
//!
//! `DiscoveryConfig` is built through a typestate builder so a config cannot
//! exist without its two required fields (project id and root URL) and so
//! cap validation runs exactly once, at build time.

pub mod builder;
pub mod types;

pub use builder::{Complete, DiscoveryConfigBuilder, WithProjectId};
pub use types::DiscoveryConfig;
