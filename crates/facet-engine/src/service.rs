use std::sync::Arc;

use facetsync_core_types::{CurrentFilters, FacetError, FacetSet, SiteId};
use site_adapter::{AdapterRegistry, Page, SiteAdapter};
use tracing::{info, instrument};

use crate::engine::{ApplyOutcome, RetryVerifyEngine};
use crate::policy::{ApplyMode, EnginePolicy, ReadinessPolicy};
use crate::readiness::ReadinessGate;

/// Resolves the adapter for a page, waits for it to be ready and runs
/// extraction or the retry-verify loop.
#[derive(Clone)]
pub struct FacetSyncService {
    registry: AdapterRegistry,
    gate: ReadinessGate,
    engine: RetryVerifyEngine,
    readiness: ReadinessPolicy,
    site_override: Option<SiteId>,
}

impl FacetSyncService {
    pub fn new(
        registry: AdapterRegistry,
        engine: EnginePolicy,
        readiness: ReadinessPolicy,
    ) -> Result<Self, FacetError> {
        engine.validate()?;
        Ok(Self {
            gate: ReadinessGate::new(registry.clone()),
            registry,
            engine: RetryVerifyEngine::new(engine),
            readiness,
            site_override: None,
        })
    }

    /// Always use this site instead of matching the page's host.
    pub fn with_site(mut self, site: Option<SiteId>) -> Self {
        self.site_override = site;
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub async fn adapter_for(&self, page: &dyn Page) -> Result<Arc<dyn SiteAdapter>, FacetError> {
        match &self.site_override {
            Some(site) => self.registry.get(site),
            None => self.registry.for_url(&page.url().await?),
        }
    }

    async fn ready_adapter(&self, page: &dyn Page) -> Result<Arc<dyn SiteAdapter>, FacetError> {
        let adapter = self.adapter_for(page).await?;
        let ready = self
            .gate
            .wait_for_adapter_ready(
                page,
                adapter.site_id(),
                self.readiness.max_attempts,
                self.readiness.poll_interval(),
            )
            .await?;
        if !ready {
            return Err(FacetError::Timeout(format!(
                "facet panel for '{}' did not render",
                adapter.site_id()
            )));
        }
        Ok(adapter)
    }

    #[instrument(skip_all)]
    pub async fn current_filters(&self, page: &dyn Page) -> Result<CurrentFilters, FacetError> {
        let adapter = self.ready_adapter(page).await?;
        let data = self.engine.extract(adapter.as_ref(), page).await?;
        info!(site = %adapter.site_id(), facets = data.len(), "read current filters");
        Ok(CurrentFilters {
            url: page.url().await?,
            data,
        })
    }

    #[instrument(skip_all, fields(%mode))]
    pub async fn apply_filters(
        &self,
        page: &dyn Page,
        requested: &FacetSet,
        mode: ApplyMode,
    ) -> Result<ApplyOutcome, FacetError> {
        let adapter = self.ready_adapter(page).await?;
        self.engine
            .apply(adapter.as_ref(), page, requested, mode)
            .await
    }
}
