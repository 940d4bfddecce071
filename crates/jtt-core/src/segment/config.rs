//! Construction-time settings for [`SegmentCache`](crate::segment::SegmentCache).
//!
//! Every field has a serde default, so a partial `[segment]` table (or none
//! at all) in a configuration file yields working settings:
//!
//! ```toml
//! [segment]
//! capacity = 10000
//! default_ttl_ms = 60000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reassembly cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentCacheConfig {
    /// Maximum number of in-flight reassemblies.  Beyond it the entry closest
    /// to expiry is evicted.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Number of entries the map is sized for up front.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// How long a partial reassembly survives without receiving a part,
    /// in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,
    /// Upper bound on recycled buffers kept for reuse.
    #[serde(default = "default_max_idle_buffers")]
    pub max_idle_buffers: usize,
    /// Minimum gap between two expiry sweeps, in milliseconds.  Writes sweep
    /// once the earliest deadline has passed, but never more often than this.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

fn default_capacity() -> usize {
    65_536
}
fn default_initial_capacity() -> usize {
    1_000
}
fn default_ttl_ms() -> u64 {
    300_000
}
fn default_max_idle_buffers() -> usize {
    1_024
}
fn default_sweep_interval_ms() -> u64 {
    1_000
}

impl Default for SegmentCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            initial_capacity: default_initial_capacity(),
            default_ttl_ms: default_ttl_ms(),
            max_idle_buffers: default_max_idle_buffers(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl SegmentCacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the default time-to-live of a partial reassembly.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_idle_buffers(mut self, max_idle_buffers: usize) -> Self {
        self.max_idle_buffers = max_idle_buffers;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
