//! Request and response shapes exchanged with the popup.

use std::fmt;

use facetsync_core_types::{ApplyResult, CurrentFilters, FacetSet, FilterInput};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum GatewayRequest {
    GetCurrentFilters,
    ApplyFilters { filters: FilterInput },
}

impl GatewayRequest {
    pub fn apply(filters: FacetSet) -> Self {
        GatewayRequest::ApplyFilters {
            filters: FilterInput::Bare(filters),
        }
    }

    pub fn action(&self) -> GatewayAction {
        match self {
            GatewayRequest::GetCurrentFilters => GatewayAction::GetCurrentFilters,
            GatewayRequest::ApplyFilters { .. } => GatewayAction::ApplyFilters,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayAction {
    GetCurrentFilters,
    ApplyFilters,
}

impl GatewayAction {
    /// Response sent when the work does not finish in time.
    pub fn timeout_response(&self) -> GatewayResponse {
        match self {
            GatewayAction::GetCurrentFilters => FiltersResponse::failed("timeout").into(),
            GatewayAction::ApplyFilters => ApplyResponse::failed("taking too long").into(),
        }
    }
}

impl fmt::Display for GatewayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayAction::GetCurrentFilters => f.write_str("getCurrentFilters"),
            GatewayAction::ApplyFilters => f.write_str("applyFilters"),
        }
    }
}

/// `{filters, error?}`; `filters` is null on failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersResponse {
    pub filters: Option<CurrentFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FiltersResponse {
    pub fn ok(filters: CurrentFilters) -> Self {
        Self {
            filters: Some(filters),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            filters: None,
            error: Some(error.into()),
        }
    }
}

/// `{success, result, error?}`; `result` is absent when the call failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ApplyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplyResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

impl From<ApplyResult> for ApplyResponse {
    fn from(result: ApplyResult) -> Self {
        Self {
            success: result.success,
            result: Some(result),
            error: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GatewayResponse {
    Filters(FiltersResponse),
    Apply(ApplyResponse),
}

impl GatewayResponse {
    pub fn error(&self) -> Option<&str> {
        match self {
            GatewayResponse::Filters(response) => response.error.as_deref(),
            GatewayResponse::Apply(response) => response.error.as_deref(),
        }
    }
}

impl From<FiltersResponse> for GatewayResponse {
    fn from(response: FiltersResponse) -> Self {
        GatewayResponse::Filters(response)
    }
}

impl From<ApplyResponse> for GatewayResponse {
    fn from(response: ApplyResponse) -> Self {
        GatewayResponse::Apply(response)
    }
}
