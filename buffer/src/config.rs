//! Buffer configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Default per-stream capacity.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default wait budget for blocking pops, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 500;

/// Capacity and wait budget shared by the timed buffers.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// pipeline config only has to name what it overrides:
///
/// ```
/// use timesync_buffer::BufferConfig;
///
/// let config: BufferConfig = serde_json::from_str(r#"{"capacity": 8}"#).unwrap();
/// assert_eq!(config.capacity, 8);
/// assert_eq!(config.timeout_ms, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of entries retained per stream before the oldest is
    /// overwritten. Deserializing a capacity of 0 fails.
    #[serde(deserialize_with = "deserialize_capacity")]
    pub capacity: usize,
    /// Default wait budget for blocking pops.
    pub timeout_ms: u64,
}

fn deserialize_capacity<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match usize::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom("capacity must be greater than 0")),
        capacity => Ok(capacity),
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl BufferConfig {
    /// Set the per-stream capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the default wait budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the default wait budget.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
