use facetsync_core_types::RequestId;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::wire::GatewayResponse;

/// Single-resolution response slot shared by the timer and the worker.
///
/// Whoever calls [`Responder::respond`] first delivers the response; every
/// later call is a no-op that returns `false`.
#[derive(Debug)]
pub struct Responder {
    request: RequestId,
    slot: Mutex<Option<oneshot::Sender<GatewayResponse>>>,
}

impl Responder {
    pub fn new(request: RequestId) -> (Self, oneshot::Receiver<GatewayResponse>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            request,
            slot: Mutex::new(Some(tx)),
        };
        (responder, rx)
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn respond(&self, response: GatewayResponse) -> bool {
        let Some(sender) = self.slot.lock().take() else {
            return false;
        };
        // A dropped receiver still consumes the slot.
        let _ = sender.send(response);
        true
    }

    pub fn is_answered(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{FiltersResponse, GatewayAction};

    #[tokio::test]
    async fn test_first_responder_wins() {
        let (responder, rx) = Responder::new(RequestId::new());
        assert!(!responder.is_answered());

        assert!(responder.respond(GatewayAction::GetCurrentFilters.timeout_response()));
        assert!(!responder.respond(FiltersResponse::failed("late").into()));
        assert!(responder.is_answered());

        let response = rx.await.unwrap();
        assert_eq!(response.error(), Some("timeout"));
    }
}
