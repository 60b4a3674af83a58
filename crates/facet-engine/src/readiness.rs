//! Readiness gate
//!
//! Storefronts hydrate their filter panels after the initial page load. The
//! gate polls the profile's anchor selectors with a short interval instead of
//! sleeping for a fixed time.

use std::time::Duration;

use facetsync_core_types::{FacetError, SiteId};
use site_adapter::{AdapterRegistry, Page, SiteProfile};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct ReadinessGate {
    registry: AdapterRegistry,
}

impl ReadinessGate {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    /// True on the first poll where any anchor exists; false once
    /// `max_attempts` polls have failed, unless the profile opts into
    /// proceeding anyway.
    pub async fn wait_for_adapter_ready(
        &self,
        page: &dyn Page,
        site: &SiteId,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<bool, FacetError> {
        let adapter = self.registry.get(site)?;
        Ok(wait_for_profile(page, adapter.profile(), max_attempts, delay).await)
    }
}

#[instrument(skip(page, profile), fields(site = %profile.id))]
pub async fn wait_for_profile(
    page: &dyn Page,
    profile: &SiteProfile,
    max_attempts: u32,
    delay: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        if anchor_present(page, profile).await {
            debug!(attempt, "facet panel ready");
            return true;
        }
        if attempt < max_attempts {
            sleep(delay).await;
        }
    }

    if profile.assume_ready_on_exhaustion {
        info!(max_attempts, "no readiness anchor found, proceeding anyway");
        return true;
    }
    warn!(max_attempts, "facet panel never became ready");
    false
}

async fn anchor_present(page: &dyn Page, profile: &SiteProfile) -> bool {
    for anchor in &profile.anchors {
        match page.exists(anchor).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => debug!(%anchor, %err, "anchor poll failed"),
        }
    }
    false
}
