//! Configuration for the attachment layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Discovery timing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Overall budget for a single `wait_for` attempt, in milliseconds
    pub timeout_ms: u64,
    /// Budget for waiting on a node container to appear, in milliseconds
    pub container_timeout_ms: u64,
    /// Delayed-retry attempts after the observer waits are exhausted
    pub max_retries: u32,
    /// Pause between delayed retries, in milliseconds
    pub retry_interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 3_000,
            container_timeout_ms: 2_000,
            max_retries: 3,
            retry_interval_ms: 150,
        }
    }
}

impl DiscoveryConfig {
    /// Per-attempt timeout as a `Duration`
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Container-wait timeout as a `Duration`
    #[inline]
    #[must_use]
    pub fn container_timeout(&self) -> Duration {
        Duration::from_millis(self.container_timeout_ms)
    }

    /// Retry pause as a `Duration`
    #[inline]
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockConfig {
    /// TTL of the cached render-mode reading, in milliseconds
    pub mode_ttl_ms: u64,
    /// Discovery timing
    pub discovery: DiscoveryConfig,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            mode_ttl_ms: 1_000,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl DockConfig {
    /// Create a configuration with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the render-mode cache TTL
    #[must_use]
    pub fn with_mode_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.mode_ttl_ms = ttl_ms;
        self
    }

    /// Override the discovery timing
    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Render-mode cache TTL as a `Duration`
    #[inline]
    #[must_use]
    pub fn mode_ttl(&self) -> Duration {
        Duration::from_millis(self.mode_ttl_ms)
    }
}
