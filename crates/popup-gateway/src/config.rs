//! Gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bound after which the caller receives the fallback response
    pub response_timeout_ms: u64,
    /// Requests waiting for the worker before `dispatch` backs up
    pub queue_depth: usize,
    pub event_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 20_000,
            queue_depth: 16,
            event_capacity: 64,
        }
    }
}

impl GatewayConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}
