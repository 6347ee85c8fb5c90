//! Tunables for throttling, walking and deletion safety.

use std::time::Duration;

/// Default Microsoft Graph endpoint.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Proactive pause and 429 backoff policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottleConfig {
    /// Pause after every `pause_every` calls; 0 disables the proactive pause.
    pub pause_every: u64,
    pub pause: Duration,
    /// Wait used when a 429 carries no usable `Retry-After` header.
    pub default_retry_after: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            pause_every: 200,
            pause: Duration::from_secs(2),
            default_retry_after: Duration::from_secs(10),
        }
    }
}

/// Tree walk and deletion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkConfig {
    /// `$top` sent with every children listing.
    pub page_size: u32,
    /// Never select or delete empty folders sitting directly under a library root.
    pub protect_top_level: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            page_size: 5000,
            protect_top_level: true,
        }
    }
}

/// Everything a sweep needs besides credentials and file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub graph_base: String,
    pub throttle: ThrottleConfig,
    pub walk: WalkConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            graph_base: GRAPH_API_BASE.to_string(),
            throttle: ThrottleConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Graph base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.graph_base.trim_end_matches('/')
    }
}
