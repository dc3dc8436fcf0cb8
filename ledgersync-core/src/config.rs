//! Tunables for the acquisition engine, deserializable from whatever
//! config format the embedding node uses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs governing how an [`crate::Acquisition`] paces its requests.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquireConfig {
    /// Delay between a trigger and the next, in milliseconds.
    pub acquire_timeout_ms: u64,
    /// Maximum node-ids requested from a SHAMap subtree in one round.
    pub missing_node_batch: usize,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        AcquireConfig {
            acquire_timeout_ms: 2000,
            missing_node_batch: 128,
        }
    }
}

impl AcquireConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let config = AcquireConfig::default();
        assert_eq!(config.acquire_timeout(), Duration::from_millis(2000));
        assert_eq!(config.missing_node_batch, 128);
    }
}
