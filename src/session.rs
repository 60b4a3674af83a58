use std::sync::Arc;

use async_trait::async_trait;
use facet_engine::{ApplyMode, FacetSyncService};
use facetsync_core_types::{ApplyResult, CurrentFilters, FacetError, FacetSet};
use popup_gateway::FilterService;
use site_adapter::Page;

/// One page exposed to the gateway.
pub struct PageSession {
    service: FacetSyncService,
    page: Arc<dyn Page>,
    mode: ApplyMode,
}

impl PageSession {
    pub fn new(service: FacetSyncService, page: Arc<dyn Page>, mode: ApplyMode) -> Self {
        Self {
            service,
            page,
            mode,
        }
    }
}

#[async_trait]
impl FilterService for PageSession {
    async fn current_filters(&self) -> Result<CurrentFilters, FacetError> {
        self.service.current_filters(self.page.as_ref()).await
    }

    async fn apply_filters(&self, requested: FacetSet) -> Result<ApplyResult, FacetError> {
        self.service
            .apply_filters(self.page.as_ref(), &requested, self.mode)
            .await
            .map(|outcome| outcome.result)
    }
}
