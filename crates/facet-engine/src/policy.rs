use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use facetsync_core_types::{FacetError, FacetKind};
use serde::{Deserialize, Serialize};

/// Retry budget and pacing for one `apply` call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnginePolicy {
    pub brand_attempts: u32,
    /// Size options are the slowest to render on most storefronts
    pub size_attempts: u32,
    pub color_attempts: u32,
    /// Pause before re-attempting the same value
    pub attempt_delay_ms: u64,
    /// Pause between an interaction and its verification
    pub settle_delay_ms: u64,
    /// Pause between facet groups
    pub group_delay_ms: u64,
    /// Re-run exhausted values once after every group has been processed
    pub second_pass: bool,
    /// Coverage at or above which the whole call counts as verified
    pub verify_threshold: f64,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            brand_attempts: 2,
            size_attempts: 3,
            color_attempts: 2,
            attempt_delay_ms: 500,
            settle_delay_ms: 300,
            group_delay_ms: 500,
            second_pass: true,
            verify_threshold: 0.5,
        }
    }
}

impl EnginePolicy {
    pub fn attempts(&self, kind: FacetKind) -> u32 {
        match kind {
            FacetKind::Brand => self.brand_attempts,
            FacetKind::Size => self.size_attempts,
            FacetKind::Color => self.color_attempts,
        }
    }

    pub fn attempt_delay(&self) -> Duration {
        Duration::from_millis(self.attempt_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn group_delay(&self) -> Duration {
        Duration::from_millis(self.group_delay_ms)
    }

    pub fn validate(&self) -> Result<(), FacetError> {
        if !(0.0..=1.0).contains(&self.verify_threshold) {
            return Err(FacetError::Config(format!(
                "verify_threshold must be within 0..=1, got {}",
                self.verify_threshold
            )));
        }
        if FacetKind::ORDERED.iter().any(|kind| self.attempts(*kind) == 0) {
            return Err(FacetError::Config(
                "every facet group needs at least one attempt".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bounds for the readiness poll.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            poll_interval_ms: 250,
        }
    }
}

impl ReadinessPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How a request combines with facets already active on the page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
    /// Keep active facets and add the requested ones
    #[default]
    Merge,
    /// Clear every active facet first
    Replace,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyMode::Merge => f.write_str("merge"),
            ApplyMode::Replace => f.write_str("replace"),
        }
    }
}

impl FromStr for ApplyMode {
    type Err = FacetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ApplyMode::Merge),
            "replace" => Ok(ApplyMode::Replace),
            other => Err(FacetError::Config(format!("unknown apply mode '{other}'"))),
        }
    }
}
