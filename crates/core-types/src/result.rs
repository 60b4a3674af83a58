use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::facet::FacetSet;

/// Outcome of applying a requested [`FacetSet`] to a page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub success: bool,
    pub applied_filters: FacetSet,
    pub partial_success: bool,
}

impl ApplyResult {
    /// Derives the flags from the requested and applied sets.
    ///
    /// `success` holds when anything was applied; `partial_success` only when
    /// the applied set is a strict, non-empty subset of the request.
    pub fn evaluate(requested: &FacetSet, applied_filters: FacetSet) -> Self {
        let requested_count = requested.len();
        let applied_count = applied_filters.len();
        Self {
            success: applied_count > 0,
            partial_success: applied_count > 0 && applied_count < requested_count,
            applied_filters,
        }
    }

    /// Fraction of the request that took effect; 0.0 for an empty request.
    pub fn coverage(&self, requested: &FacetSet) -> f64 {
        if requested.is_empty() {
            return 0.0;
        }
        self.applied_filters.len() as f64 / requested.len() as f64
    }
}

/// Payload answering `getCurrentFilters`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentFilters {
    pub url: String,
    pub data: FacetSet,
}

/// Named filter set as stored by the persistence collaborator.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFilterSet {
    pub id: String,
    pub name: String,
    pub filters: FacetSet,
    pub timestamp: DateTime<Utc>,
    pub origin_site: String,
}

impl SavedFilterSet {
    pub fn new(name: impl Into<String>, filters: FacetSet, origin_site: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            filters,
            timestamp: Utc::now(),
            origin_site: origin_site.into(),
        }
    }
}

/// Apply input: either a saved set or a bare facet set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    Saved(SavedFilterSet),
    Bare(FacetSet),
}

impl FilterInput {
    pub fn into_facets(self) -> FacetSet {
        match self {
            FilterInput::Saved(saved) => saved.filters,
            FilterInput::Bare(facets) => facets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FacetKind;

    fn requested() -> FacetSet {
        FacetSet::new()
            .with(FacetKind::Brand, ["Nike"])
            .with(FacetKind::Size, ["M", "L"])
    }

    #[test]
    fn test_partial_when_strict_subset() {
        let applied = FacetSet::new()
            .with(FacetKind::Brand, ["Nike"])
            .with(FacetKind::Size, ["M"]);
        let result = ApplyResult::evaluate(&requested(), applied);
        assert!(result.success);
        assert!(result.partial_success);
    }

    #[test]
    fn test_not_partial_when_fully_covered() {
        let result = ApplyResult::evaluate(&requested(), requested());
        assert!(result.success);
        assert!(!result.partial_success);
        assert!((result.coverage(&requested()) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nothing_applied() {
        let result = ApplyResult::evaluate(&requested(), FacetSet::new());
        assert!(!result.success);
        assert!(!result.partial_success);
    }

    #[test]
    fn test_wire_names() {
        let result = ApplyResult::evaluate(&requested(), requested());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("appliedFilters").is_some());
        assert_eq!(json["partialSuccess"], serde_json::json!(false));
    }

    #[test]
    fn test_filter_input_accepts_both_shapes() {
        let saved = SavedFilterSet::new("summer", requested(), "demo-store");
        let json = serde_json::to_string(&saved).unwrap();
        let input: FilterInput = serde_json::from_str(&json).unwrap();
        assert!(matches!(input, FilterInput::Saved(_)));
        assert_eq!(input.into_facets(), requested());

        let input: FilterInput = serde_json::from_str(r#"{"sizes":["M"]}"#).unwrap();
        assert!(matches!(input, FilterInput::Bare(_)));
    }
}
