use std::sync::Arc;

use async_trait::async_trait;
use facetsync_core_types::{ApplyResult, CurrentFilters, FacetError, FacetSet, RequestId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::responder::Responder;
use crate::wire::{ApplyResponse, FiltersResponse, GatewayAction, GatewayRequest, GatewayResponse};

/// The engine as seen from the gateway: one page, two operations.
#[async_trait]
pub trait FilterService: Send + Sync {
    async fn current_filters(&self) -> Result<CurrentFilters, FacetError>;

    async fn apply_filters(&self, requested: FacetSet) -> Result<ApplyResult, FacetError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway worker stopped")]
    Closed,
    #[error("malformed request: {0}")]
    Malformed(String),
}

pub type GatewayEventBus = broadcast::Sender<GatewayEvent>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEvent {
    Accepted {
        request: RequestId,
        action: GatewayAction,
    },
    Answered {
        request: RequestId,
        action: GatewayAction,
        elapsed_ms: u64,
    },
    TimedOut {
        request: RequestId,
        action: GatewayAction,
    },
    /// Work finished after the fallback had already been sent
    LateResultDiscarded {
        request: RequestId,
        action: GatewayAction,
        elapsed_ms: u64,
    },
    /// The request timed out while still queued and was never started
    ExpiredInQueue {
        request: RequestId,
        action: GatewayAction,
    },
}

struct Job {
    request: GatewayRequest,
    responder: Arc<Responder>,
    timer: JoinHandle<()>,
    accepted_at: Instant,
}

/// Awaitable answer to one dispatched request.
#[derive(Debug)]
pub struct PendingResponse {
    request: RequestId,
    action: GatewayAction,
    rx: oneshot::Receiver<GatewayResponse>,
}

impl PendingResponse {
    pub fn request(&self) -> RequestId {
        self.request
    }

    pub async fn wait(self) -> GatewayResponse {
        match self.rx.await {
            Ok(response) => response,
            // Only reachable if the runtime is shutting down under us.
            Err(_) => self.action.timeout_response(),
        }
    }
}

/// Runs requests one at a time against a [`FilterService`], answering each
/// exactly once: with the work's result, or with the fallback when the
/// response timeout fires first.
pub struct Gateway {
    queue: mpsc::Sender<Job>,
    events: GatewayEventBus,
    config: GatewayConfig,
    worker: JoinHandle<()>,
}

impl Gateway {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(service: Arc<dyn FilterService>, config: GatewayConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (queue, rx) = mpsc::channel(config.queue_depth.max(1));
        let worker = tokio::spawn(run_worker(service, rx, events.clone()));
        info!(
            timeout_ms = config.response_timeout_ms,
            "popup gateway started"
        );
        Self {
            queue,
            events,
            config,
            worker,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Queues the request and arms its response timer.
    pub async fn dispatch(&self, request: GatewayRequest) -> Result<PendingResponse, GatewayError> {
        let id = RequestId::new();
        let action = request.action();
        let (responder, rx) = Responder::new(id);
        let responder = Arc::new(responder);

        let timer = {
            let responder = responder.clone();
            let events = self.events.clone();
            let timeout = self.config.response_timeout();
            tokio::spawn(async move {
                sleep(timeout).await;
                if responder.respond(action.timeout_response()) {
                    warn!(request = %id, %action, "response timeout, fallback sent");
                    let _ = events.send(GatewayEvent::TimedOut { request: id, action });
                }
            })
        };

        let job = Job {
            request,
            responder,
            timer,
            accepted_at: Instant::now(),
        };
        let _ = self.events.send(GatewayEvent::Accepted { request: id, action });
        if let Err(mpsc::error::SendError(job)) = self.queue.send(job).await {
            job.timer.abort();
            return Err(GatewayError::Closed);
        }
        debug!(request = %id, %action, "request queued");
        Ok(PendingResponse {
            request: id,
            action,
            rx,
        })
    }

    /// Dispatches and waits for the single response.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let action = request.action();
        match self.dispatch(request).await {
            Ok(pending) => pending.wait().await,
            Err(err) => match action {
                GatewayAction::GetCurrentFilters => FiltersResponse::failed(err.to_string()).into(),
                GatewayAction::ApplyFilters => ApplyResponse::failed(err.to_string()).into(),
            },
        }
    }

    /// Decodes one JSON request and handles it.
    pub async fn handle_json(&self, raw: &serde_json::Value) -> Result<GatewayResponse, GatewayError> {
        let request: GatewayRequest = serde_json::from_value(raw.clone())
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;
        Ok(self.handle(request).await)
    }

    /// Stops accepting requests and waits for queued work to drain.
    pub async fn shutdown(self) {
        drop(self.queue);
        if let Err(err) = self.worker.await {
            warn!(%err, "gateway worker ended abnormally");
        }
    }
}

async fn run_worker(
    service: Arc<dyn FilterService>,
    mut rx: mpsc::Receiver<Job>,
    events: GatewayEventBus,
) {
    while let Some(job) = rx.recv().await {
        let id = job.responder.request();
        let action = job.request.action();
        if job.responder.is_answered() {
            debug!(request = %id, %action, "request expired while queued");
            let _ = events.send(GatewayEvent::ExpiredInQueue { request: id, action });
            continue;
        }

        let response = execute(service.as_ref(), job.request).await;
        let elapsed_ms = job.accepted_at.elapsed().as_millis() as u64;
        if job.responder.respond(response) {
            job.timer.abort();
            debug!(request = %id, %action, elapsed_ms, "request answered");
            let _ = events.send(GatewayEvent::Answered {
                request: id,
                action,
                elapsed_ms,
            });
        } else {
            info!(request = %id, %action, elapsed_ms, "late result discarded");
            let _ = events.send(GatewayEvent::LateResultDiscarded {
                request: id,
                action,
                elapsed_ms,
            });
        }
    }
    debug!("gateway worker stopped");
}

async fn execute(service: &dyn FilterService, request: GatewayRequest) -> GatewayResponse {
    match request {
        GatewayRequest::GetCurrentFilters => match service.current_filters().await {
            Ok(filters) => FiltersResponse::ok(filters).into(),
            Err(err) => {
                warn!(%err, "reading current filters failed");
                FiltersResponse::failed(err.to_string()).into()
            }
        },
        GatewayRequest::ApplyFilters { filters } => {
            match service.apply_filters(filters.into_facets()).await {
                Ok(result) => ApplyResponse::from(result).into(),
                Err(err) => {
                    warn!(%err, "applying filters failed");
                    ApplyResponse::failed(err.to_string()).into()
                }
            }
        }
    }
}
