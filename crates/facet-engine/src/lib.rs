//! Facet synchronization engine
//!
//! The [`ReadinessGate`] waits for a storefront's facet panel, the
//! [`RetryVerifyEngine`] applies a requested set group by group and
//! [`FacetSyncService`] ties both to the adapter registry.

pub mod engine;
pub mod policy;
pub mod readiness;
pub mod service;

pub use engine::{ApplyFacets, ApplyOutcome, FacetReport, FacetState, GroupReport, RetryVerifyEngine};
pub use policy::{ApplyMode, EnginePolicy, ReadinessPolicy};
pub use readiness::{wait_for_profile, ReadinessGate};
pub use service::FacetSyncService;
