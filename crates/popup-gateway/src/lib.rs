//! Boundary gateway between the popup and the facet engine.
//!
//! Every request gets exactly one response. A timer armed at dispatch races
//! the work; whichever finishes first answers through the request's
//! [`Responder`] and the loser is dropped. The timeout never cancels work that
//! already started, it only suppresses its result. Work is serialized on a
//! single worker task so two page operations never overlap.

pub mod config;
pub mod gateway;
pub mod responder;
pub mod wire;

pub use config::GatewayConfig;
pub use gateway::{FilterService, Gateway, GatewayError, GatewayEvent, GatewayEventBus, PendingResponse};
pub use responder::Responder;
pub use wire::{ApplyResponse, FiltersResponse, GatewayAction, GatewayRequest, GatewayResponse};
