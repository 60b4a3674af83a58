//! Shared primitives for the facetsync engine.
//!
//! Every other crate in the workspace speaks in terms of these types: the
//! canonical [`FacetSet`], the [`ApplyResult`] reported back to callers and the
//! [`FacetError`] taxonomy.

mod errors;
mod facet;
mod result;

pub use errors::{FacetError, FacetResult};
pub use facet::{FacetKind, FacetSet, FacetValue};
pub use result::{ApplyResult, CurrentFilters, FilterInput, SavedFilterSet};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storefront identifier, e.g. `demo-store`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier attached to every inbound gateway request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
