use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use facetsync_core_types::{ApplyResult, CurrentFilters, FacetError, FacetKind, FacetSet};
use popup_gateway::{
    ApplyResponse, FilterService, FiltersResponse, Gateway, GatewayAction, GatewayConfig,
    GatewayError, GatewayEvent, GatewayRequest, GatewayResponse,
};
use serde_json::json;
use tokio::time::{sleep, Instant};
use tokio_test::assert_ok;

/// Service whose work takes a fixed amount of (paused) time.
struct SlowService {
    delay: Duration,
    running: AtomicUsize,
    overlapped: AtomicUsize,
}

impl SlowService {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            running: AtomicUsize::new(0),
            overlapped: AtomicUsize::new(0),
        })
    }

    async fn work(&self) {
        if self.running.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.fetch_add(1, Ordering::SeqCst);
        }
        sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FilterService for SlowService {
    async fn current_filters(&self) -> Result<CurrentFilters, FacetError> {
        self.work().await;
        Ok(CurrentFilters {
            url: "https://demo-store.test/".to_string(),
            data: FacetSet::new().with(FacetKind::Brand, ["Nike"]),
        })
    }

    async fn apply_filters(&self, requested: FacetSet) -> Result<ApplyResult, FacetError> {
        self.work().await;
        if requested.is_empty() {
            return Err(FacetError::UnsupportedSite("nowhere.test".to_string()));
        }
        Ok(ApplyResult::evaluate(&requested, requested.clone()))
    }
}

fn config() -> GatewayConfig {
    GatewayConfig {
        response_timeout_ms: 20_000,
        ..GatewayConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn late_work_yields_exactly_one_fallback() {
    let service = SlowService::new(Duration::from_secs(25));
    let gateway = Gateway::spawn(service, config());
    let mut events = gateway.subscribe();
    let started = Instant::now();

    let pending = assert_ok!(
        gateway
            .dispatch(GatewayRequest::apply(FacetSet::new().with(FacetKind::Brand, ["Nike"])))
            .await
    );
    let id = pending.request();
    let response = pending.wait().await;

    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"success": false, "error": "taking too long"})
    );

    let mut seen = Vec::new();
    loop {
        let event = events.recv().await.unwrap();
        let done = matches!(event, GatewayEvent::LateResultDiscarded { .. });
        seen.push(event);
        if done {
            break;
        }
    }
    assert_eq!(started.elapsed(), Duration::from_secs(25));
    assert_eq!(
        seen,
        vec![
            GatewayEvent::Accepted {
                request: id,
                action: GatewayAction::ApplyFilters
            },
            GatewayEvent::TimedOut {
                request: id,
                action: GatewayAction::ApplyFilters
            },
            GatewayEvent::LateResultDiscarded {
                request: id,
                action: GatewayAction::ApplyFilters,
                elapsed_ms: 25_000
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn get_timeout_fallback_shape() {
    let gateway = Gateway::spawn(SlowService::new(Duration::from_secs(30)), config());
    let response = gateway.handle(GatewayRequest::GetCurrentFilters).await;
    assert_eq!(
        response,
        GatewayResponse::Filters(FiltersResponse::failed("timeout"))
    );
}

#[tokio::test(start_paused = true)]
async fn fast_work_answers_and_disarms_timer() {
    let gateway = Gateway::spawn(SlowService::new(Duration::from_secs(2)), config());
    let mut events = gateway.subscribe();

    let response = gateway.handle(GatewayRequest::GetCurrentFilters).await;
    match response {
        GatewayResponse::Filters(FiltersResponse {
            filters: Some(filters),
            error: None,
        }) => assert_eq!(filters.data.labels(FacetKind::Brand), vec!["Nike".to_string()]),
        other => panic!("unexpected response: {:?}", other),
    }

    assert!(matches!(events.recv().await.unwrap(), GatewayEvent::Accepted { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        GatewayEvent::Answered { elapsed_ms: 2_000, .. }
    ));

    // Nothing else fires once the timer would have expired.
    sleep(Duration::from_secs(30)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn requests_never_overlap() {
    let service = SlowService::new(Duration::from_secs(3));
    let gateway = Gateway::spawn(service.clone(), config());

    let first = gateway.dispatch(GatewayRequest::GetCurrentFilters).await.unwrap();
    let second = gateway
        .dispatch(GatewayRequest::apply(FacetSet::new().with(FacetKind::Size, ["M"])))
        .await
        .unwrap();
    let started = Instant::now();

    let (first, second) = tokio::join!(first.wait(), second.wait());
    assert!(first.error().is_none());
    assert!(second.error().is_none());
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert_eq!(service.overlapped.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn service_errors_become_structured_responses() {
    let gateway = Gateway::spawn(SlowService::new(Duration::from_millis(10)), config());

    let response = gateway
        .handle_json(&json!({"action": "applyFilters", "filters": {}}))
        .await
        .unwrap();
    assert_eq!(
        response,
        GatewayResponse::Apply(ApplyResponse::failed("unsupported site: nowhere.test"))
    );

    let malformed = gateway.handle_json(&json!({"action": "selfDestruct"})).await;
    assert!(matches!(malformed, Err(GatewayError::Malformed(_))));
}
