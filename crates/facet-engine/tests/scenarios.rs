use async_trait::async_trait;
use facet_engine::{
    ApplyFacets, ApplyMode, EnginePolicy, FacetState, FacetSyncService, ReadinessPolicy,
    RetryVerifyEngine,
};
use facetsync_core_types::{FacetError, FacetKind, FacetSet};
use site_adapter::{
    AdapterRegistry, ConfiguredAdapter, DemoStoreFixture, ElementId, ElementSnapshot,
    InMemoryPage, Page, SiteAdapter, SiteProfile,
};
use tokio_test::{assert_err, assert_ok};

fn adapter() -> ConfiguredAdapter {
    ConfiguredAdapter::new(SiteProfile::demo_store()).unwrap()
}

fn engine() -> RetryVerifyEngine {
    RetryVerifyEngine::new(EnginePolicy::default())
}

#[tokio::test(start_paused = true)]
async fn nike_m_l_is_partial() {
    let page = DemoStoreFixture::new()
        .brand("Nike", false)
        .brand("Adidas", false)
        .size("M", false)
        .size("L", false)
        .inert("L")
        .build();
    let requested = FacetSet::new()
        .with(FacetKind::Brand, ["Nike"])
        .with(FacetKind::Size, ["M", "L"]);

    let outcome = engine()
        .apply(&adapter(), &page, &requested, ApplyMode::Merge)
        .await
        .unwrap();

    let expected = FacetSet::new()
        .with(FacetKind::Brand, ["Nike"])
        .with(FacetKind::Size, ["M"]);
    assert_eq!(outcome.result.applied_filters, expected);
    assert!(outcome.result.success);
    assert!(outcome.result.partial_success);
    assert!(outcome.verified);

    let sizes = &outcome.groups[1];
    assert_eq!(sizes.kind, FacetKind::Size);
    assert_eq!(sizes.facets[1].state, FacetState::Exhausted);
    // Three attempts in the first pass and three more in the second.
    assert_eq!(sizes.facets[1].attempts, 6);
    assert_eq!(page.click_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn already_applied_request_needs_no_interaction() {
    let page = DemoStoreFixture::new()
        .brand("Nike", true)
        .size("M", true)
        .color("Black", true)
        .build();
    let requested = FacetSet::new()
        .with(FacetKind::Brand, ["nike"])
        .with(FacetKind::Size, ["M"])
        .with(FacetKind::Color, ["Black"]);

    let outcome = engine()
        .apply(&adapter(), &page, &requested, ApplyMode::Merge)
        .await
        .unwrap();

    assert_eq!(page.click_count(), 0);
    assert_eq!(outcome.interactions(), 0);
    assert!(outcome.result.success);
    assert!(!outcome.result.partial_success);
    assert!(outcome
        .groups
        .iter()
        .flat_map(|group| &group.facets)
        .all(|facet| facet.state == FacetState::SkippedAlreadyApplied));
}

#[tokio::test(start_paused = true)]
async fn extract_after_apply_matches_request() {
    let page = DemoStoreFixture::new()
        .brand("Nike (12)", false)
        .brand("Puma (3)", false)
        .size("UK 7", false)
        .size("UK 8", false)
        .color("Navy", false)
        .build();
    let requested = FacetSet::new()
        .with(FacetKind::Brand, ["Puma"])
        .with(FacetKind::Size, ["UK 8"])
        .with(FacetKind::Color, ["Navy"]);
    let adapter = adapter();

    let result = assert_ok!(adapter.apply(&page, &requested).await);
    assert_eq!(result.applied_filters, requested);
    assert!(!result.partial_success);

    let current = adapter.extract(&page).await.unwrap();
    assert_eq!(current, requested);
}

#[tokio::test(start_paused = true)]
async fn brand_is_applied_before_size() {
    let page = DemoStoreFixture::new()
        .brand("Nike", false)
        .size("UK 8", false)
        .sizes_after_brand()
        .build();
    // Sizes listed first in the request still wait for the brand.
    let requested = FacetSet::new()
        .with(FacetKind::Size, ["UK 8"])
        .with(FacetKind::Brand, ["Nike"]);

    let outcome = engine()
        .apply(&adapter(), &page, &requested, ApplyMode::Merge)
        .await
        .unwrap();

    assert_eq!(page.clicks(), vec!["brand-0".to_string(), "size-0".to_string()]);
    assert_eq!(outcome.result.applied_filters, requested);
}

#[tokio::test(start_paused = true)]
async fn flaky_control_succeeds_on_retry() {
    let page = DemoStoreFixture::new()
        .color("Black", false)
        .flaky("Black", 1)
        .build();
    let requested = FacetSet::new().with(FacetKind::Color, ["black"]);

    let outcome = engine()
        .apply(&adapter(), &page, &requested, ApplyMode::Merge)
        .await
        .unwrap();

    let black = &outcome.groups[0].facets[0];
    assert_eq!(black.state, FacetState::Applied);
    assert_eq!(black.attempts, 2);
    assert_eq!(black.matched.as_deref(), Some("Black"));
}

#[tokio::test(start_paused = true)]
async fn nothing_applied_is_neither_success_nor_partial() {
    let page = DemoStoreFixture::new().brand("Nike", false).build();
    let requested = FacetSet::new().with(FacetKind::Brand, ["Hoka"]);
    let policy = EnginePolicy {
        second_pass: false,
        ..EnginePolicy::default()
    };

    let outcome = RetryVerifyEngine::new(policy)
        .apply(&adapter(), &page, &requested, ApplyMode::Merge)
        .await
        .unwrap();

    assert!(!outcome.result.success);
    assert!(!outcome.result.partial_success);
    assert!(!outcome.verified);
    assert_eq!(outcome.groups[0].facets[0].attempts, 2);
    assert_eq!(page.click_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn replace_mode_clears_first() {
    let page = DemoStoreFixture::new()
        .brand("Nike", false)
        .brand("Adidas", true)
        .build();
    let requested = FacetSet::new().with(FacetKind::Brand, ["Nike"]);
    let adapter = adapter();

    engine()
        .apply(&adapter, &page, &requested, ApplyMode::Replace)
        .await
        .unwrap();

    assert_eq!(page.clicks()[0], "clear-all");
    assert_eq!(adapter.extract(&page).await.unwrap(), requested);
}

struct BrokenPage;

#[async_trait]
impl Page for BrokenPage {
    async fn url(&self) -> Result<String, FacetError> {
        Ok("https://demo-store.test/".to_string())
    }

    async fn query_all(&self, _selector: &str) -> Result<Vec<ElementSnapshot>, FacetError> {
        Err(FacetError::Page("document detached".to_string()))
    }

    async fn query_within(
        &self,
        _parent: &ElementId,
        _selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError> {
        Err(FacetError::Page("document detached".to_string()))
    }

    async fn click(&self, _element: &ElementId) -> Result<(), FacetError> {
        Err(FacetError::Page("document detached".to_string()))
    }

    async fn scroll_into_view(&self, _element: &ElementId) -> Result<(), FacetError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn extraction_failure_is_fatal_after_one_retry() {
    let requested = FacetSet::new().with(FacetKind::Brand, ["Nike"]);
    let err = assert_err!(
        engine()
            .apply(&adapter(), &BrokenPage, &requested, ApplyMode::Merge)
            .await
    );
    assert!(matches!(err, FacetError::Extraction(_)));
}

/// Storefront whose brand toggles drop the size selection.
struct BrandResetsSizes(InMemoryPage);

#[async_trait]
impl Page for BrandResetsSizes {
    async fn url(&self) -> Result<String, FacetError> {
        self.0.url().await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, FacetError> {
        self.0.query_all(selector).await
    }

    async fn query_within(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError> {
        self.0.query_within(parent, selector).await
    }

    async fn click(&self, element: &ElementId) -> Result<(), FacetError> {
        self.0.click(element).await?;
        if element.0.starts_with("brand-") {
            let sizes = self
                .0
                .query_within(&ElementId("group-size".to_string()), ".facet-option")
                .await?;
            for size in sizes.into_iter().filter(|size| size.checked) {
                self.0.click(&size.id).await?;
            }
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementId) -> Result<(), FacetError> {
        self.0.scroll_into_view(element).await
    }
}

#[tokio::test(start_paused = true)]
async fn size_dropped_by_brand_click_is_reapplied() {
    let page = BrandResetsSizes(
        DemoStoreFixture::new()
            .brand("Nike", false)
            .size("M", true)
            .build(),
    );
    let adapter = adapter();
    let requested = FacetSet::new()
        .with(FacetKind::Brand, ["Nike"])
        .with(FacetKind::Size, ["M"]);

    let outcome = assert_ok!(engine().apply(&adapter, &page, &requested, ApplyMode::Merge).await);

    assert_eq!(outcome.groups[1].facets[0].state, FacetState::Applied);
    assert_eq!(outcome.result.applied_filters, requested);
    assert_eq!(adapter.extract(&page).await.unwrap(), requested);
}

/// Storefront where one control throws on every click.
struct ThrowingControl {
    page: InMemoryPage,
    broken: &'static str,
}

#[async_trait]
impl Page for ThrowingControl {
    async fn url(&self) -> Result<String, FacetError> {
        self.page.url().await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, FacetError> {
        self.page.query_all(selector).await
    }

    async fn query_within(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError> {
        self.page.query_within(parent, selector).await
    }

    async fn click(&self, element: &ElementId) -> Result<(), FacetError> {
        if element.0 == self.broken {
            return Err(FacetError::Page("element is not clickable".to_string()));
        }
        self.page.click(element).await
    }

    async fn scroll_into_view(&self, element: &ElementId) -> Result<(), FacetError> {
        self.page.scroll_into_view(element).await
    }
}

#[tokio::test(start_paused = true)]
async fn interaction_error_does_not_abort_the_group() {
    let page = ThrowingControl {
        page: DemoStoreFixture::new().size("M", false).size("L", false).build(),
        broken: "size-0",
    };
    let requested = FacetSet::new().with(FacetKind::Size, ["M", "L"]);

    let outcome = assert_ok!(engine().apply(&adapter(), &page, &requested, ApplyMode::Merge).await);

    let sizes = &outcome.groups[0];
    assert_eq!(sizes.facets[0].label, "M");
    assert_eq!(sizes.facets[0].state, FacetState::Exhausted);
    assert_eq!(sizes.facets[0].attempts, 6);
    assert_eq!(sizes.facets[1].state, FacetState::Applied);
    assert_eq!(
        outcome.result.applied_filters,
        FacetSet::new().with(FacetKind::Size, ["L"])
    );
    assert!(outcome.result.success);
    assert!(outcome.result.partial_success);
    assert_eq!(page.page.clicks(), vec!["size-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn service_resolves_adapter_by_host() {
    let service = FacetSyncService::new(
        AdapterRegistry::with_builtin().unwrap(),
        EnginePolicy::default(),
        ReadinessPolicy::default(),
    )
    .unwrap();
    let page = DemoStoreFixture::new()
        .brand("Nike", true)
        .size("M", false)
        .render_after(4)
        .build();

    let current = service.current_filters(&page).await.unwrap();
    assert_eq!(current.url, "https://demo-store.test/women/shoes");
    assert_eq!(current.data, FacetSet::new().with(FacetKind::Brand, ["Nike"]));

    let requested = FacetSet::new().with(FacetKind::Size, ["M"]);
    let outcome = service
        .apply_filters(&page, &requested, ApplyMode::Merge)
        .await
        .unwrap();
    assert!(outcome.result.success);

    let elsewhere = DemoStoreFixture::new().url("https://elsewhere.test/").build();
    assert!(matches!(
        service.current_filters(&elsewhere).await,
        Err(FacetError::UnsupportedSite(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn service_reports_panel_that_never_renders() {
    let service = FacetSyncService::new(
        AdapterRegistry::with_builtin().unwrap(),
        EnginePolicy::default(),
        ReadinessPolicy {
            max_attempts: 3,
            poll_interval_ms: 100,
        },
    )
    .unwrap();
    let page = DemoStoreFixture::new().render_after(100).build();

    assert!(matches!(
        service.current_filters(&page).await,
        Err(FacetError::Timeout(_))
    ));
}
