//! Retry-verify engine
//!
//! Applies a requested [`FacetSet`] one value at a time. Every value moves
//! through `Pending -> Attempting -> {Applied, SkippedAlreadyApplied,
//! Exhausted}`; failures are folded into the report instead of aborting the
//! call. Groups run brand, size, color in that order because some storefronts
//! only populate sizes once a brand is chosen. Each group starts from a fresh
//! extraction.

use async_trait::async_trait;
use facet_normalizer::normalize_label;
use facetsync_core_types::{ApplyResult, FacetError, FacetKind, FacetSet};
use serde::{Deserialize, Serialize};
use site_adapter::{applied_in, FacetAttempt, Page, SiteAdapter};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::policy::{ApplyMode, EnginePolicy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacetState {
    Pending,
    Attempting,
    Applied,
    SkippedAlreadyApplied,
    Exhausted,
}

impl FacetState {
    pub fn counts_as_applied(&self) -> bool {
        matches!(self, FacetState::Applied | FacetState::SkippedAlreadyApplied)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetReport {
    pub label: String,
    pub state: FacetState,
    /// Interactions spent on this value across both passes
    pub attempts: u32,
    #[serde(default)]
    pub matched: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub kind: FacetKind,
    pub facets: Vec<FacetReport>,
}

impl GroupReport {
    pub fn applied(&self) -> usize {
        self.facets
            .iter()
            .filter(|facet| facet.state.counts_as_applied())
            .count()
    }
}

/// Full account of one `apply` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub result: ApplyResult,
    /// Call-level check: coverage reached the policy threshold
    pub verified: bool,
    pub coverage: f64,
    pub groups: Vec<GroupReport>,
}

impl ApplyOutcome {
    pub fn interactions(&self) -> u32 {
        self.groups
            .iter()
            .flat_map(|group| &group.facets)
            .map(|facet| facet.attempts)
            .sum()
    }
}

#[derive(Clone, Debug, Default)]
pub struct RetryVerifyEngine {
    policy: EnginePolicy,
}

impl RetryVerifyEngine {
    pub fn new(policy: EnginePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    /// Extracts the current facets, retrying once before giving up.
    pub async fn extract<A: SiteAdapter + ?Sized>(
        &self,
        adapter: &A,
        page: &dyn Page,
    ) -> Result<FacetSet, FacetError> {
        match adapter.extract(page).await {
            Ok(current) => Ok(current),
            Err(first) => {
                warn!(site = %adapter.site_id(), %first, "extraction failed, retrying once");
                sleep(self.policy.settle_delay()).await;
                adapter.extract(page).await.map_err(|err| match err {
                    FacetError::Extraction(_) => err,
                    other => FacetError::Extraction(other.to_string()),
                })
            }
        }
    }

    #[instrument(skip_all, fields(site = %adapter.site_id(), %mode, requested = requested.len()))]
    pub async fn apply<A: SiteAdapter + ?Sized>(
        &self,
        adapter: &A,
        page: &dyn Page,
        requested: &FacetSet,
        mode: ApplyMode,
    ) -> Result<ApplyOutcome, FacetError> {
        let requested = canonical(requested);

        if mode == ApplyMode::Replace {
            match adapter.reset(page).await {
                Ok(()) => sleep(self.policy.settle_delay()).await,
                Err(err) => warn!(%err, "reset failed, applying on top of active facets"),
            }
        }

        let mut groups = Vec::new();
        for kind in FacetKind::ORDERED {
            let labels = requested.labels(kind);
            if labels.is_empty() {
                continue;
            }
            if !groups.is_empty() {
                sleep(self.policy.group_delay()).await;
            }
            // Earlier groups may have reset this one.
            let current = self.extract(adapter, page).await?;

            let mut report = GroupReport {
                kind,
                facets: labels
                    .into_iter()
                    .map(|label| FacetReport {
                        label,
                        state: FacetState::Pending,
                        attempts: 0,
                        matched: None,
                    })
                    .collect(),
            };
            for facet in &mut report.facets {
                if applied_in(&current, kind, &facet.label) {
                    debug!(%kind, label = %facet.label, "already applied");
                    facet.state = FacetState::SkippedAlreadyApplied;
                    continue;
                }
                self.drive(adapter, page, kind, facet).await;
            }
            groups.push(report);
        }

        if self.policy.second_pass {
            self.second_pass(adapter, page, &mut groups).await;
        }

        let mut applied = FacetSet::new();
        for group in &groups {
            for facet in group.facets.iter().filter(|f| f.state.counts_as_applied()) {
                applied.push_unique(group.kind, facet.label.clone());
            }
        }
        let result = ApplyResult::evaluate(&requested, applied);
        let coverage = result.coverage(&requested);
        let verified = !requested.is_empty() && coverage >= self.policy.verify_threshold;

        info!(
            applied = result.applied_filters.len(),
            success = result.success,
            partial = result.partial_success,
            verified,
            "apply finished"
        );
        Ok(ApplyOutcome {
            result,
            verified,
            coverage,
            groups,
        })
    }

    /// One more round over exhausted values only.
    async fn second_pass<A: SiteAdapter + ?Sized>(
        &self,
        adapter: &A,
        page: &dyn Page,
        groups: &mut [GroupReport],
    ) {
        let pending = groups
            .iter()
            .flat_map(|group| &group.facets)
            .filter(|facet| facet.state == FacetState::Exhausted)
            .count();
        if pending == 0 {
            return;
        }

        debug!(pending, "second pass over exhausted facets");
        sleep(self.policy.group_delay()).await;
        for group in groups.iter_mut() {
            let kind = group.kind;
            for facet in group
                .facets
                .iter_mut()
                .filter(|facet| facet.state == FacetState::Exhausted)
            {
                self.drive(adapter, page, kind, facet).await;
            }
        }
    }

    /// Attempts one value until it verifies or the budget for its group runs out.
    async fn drive<A: SiteAdapter + ?Sized>(
        &self,
        adapter: &A,
        page: &dyn Page,
        kind: FacetKind,
        facet: &mut FacetReport,
    ) {
        facet.state = FacetState::Attempting;
        let budget = self.policy.attempts(kind);

        for attempt in 1..=budget {
            if attempt > 1 {
                sleep(self.policy.attempt_delay()).await;
            }
            facet.attempts += 1;

            match adapter.apply_facet(page, kind, &facet.label).await {
                Ok(FacetAttempt::Clicked { matched }) => facet.matched = Some(matched),
                Ok(FacetAttempt::AlreadyActive) => {}
                Ok(FacetAttempt::ControlMissing) => {
                    debug!(%kind, label = %facet.label, attempt, "no control yet");
                    continue;
                }
                Err(err) => {
                    warn!(%kind, label = %facet.label, attempt, %err, "facet interaction failed");
                    continue;
                }
            }

            sleep(self.policy.settle_delay()).await;
            match adapter.is_filter_applied(page, kind, &facet.label).await {
                Ok(true) => {
                    debug!(%kind, label = %facet.label, attempt, "facet verified");
                    facet.state = FacetState::Applied;
                    return;
                }
                Ok(false) => debug!(%kind, label = %facet.label, attempt, "facet not verified"),
                Err(err) => warn!(%kind, label = %facet.label, %err, "verification failed"),
            }
        }

        warn!(%kind, label = %facet.label, attempts = budget, "giving up on facet");
        facet.state = FacetState::Exhausted;
    }
}

/// Normalized, de-duplicated copy of a request.
fn canonical(requested: &FacetSet) -> FacetSet {
    let mut out = FacetSet::new();
    for (kind, value) in requested.iter() {
        out.push_unique(kind, normalize_label(value));
    }
    out
}

/// Whole-set application for every adapter, on top of its single-facet
/// primitives.
#[async_trait]
pub trait ApplyFacets: SiteAdapter {
    async fn apply(&self, page: &dyn Page, requested: &FacetSet) -> Result<ApplyResult, FacetError> {
        RetryVerifyEngine::default()
            .apply(self, page, requested, ApplyMode::Merge)
            .await
            .map(|outcome| outcome.result)
    }
}

impl<A: SiteAdapter + ?Sized> ApplyFacets for A {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_request() {
        let requested: FacetSet =
            serde_json::from_str(r#"{"brands":["  Nike ", {"text":"Nike"}, {"value":"Puma"}]}"#)
                .unwrap();
        let canonical = canonical(&requested);
        assert_eq!(
            canonical.labels(FacetKind::Brand),
            vec!["Nike".to_string(), "Puma".to_string()]
        );
    }

    #[test]
    fn test_state_accounting() {
        assert!(FacetState::Applied.counts_as_applied());
        assert!(FacetState::SkippedAlreadyApplied.counts_as_applied());
        assert!(!FacetState::Exhausted.counts_as_applied());
        assert!(!FacetState::Pending.counts_as_applied());
    }
}
