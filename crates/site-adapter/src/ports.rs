use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use facetsync_core_types::FacetError;
use serde::{Deserialize, Serialize};

/// Opaque handle to an element of the page it came from.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time view of one element.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    /// Checked, pressed or otherwise active
    pub checked: bool,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Live document as seen by an adapter.
///
/// Adapters never reach for globals; every DOM read and interaction goes
/// through this handle so they can run against a fake page in tests.
#[async_trait]
pub trait Page: Send + Sync {
    async fn url(&self) -> Result<String, FacetError>;

    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, FacetError>;

    /// Descendants of `parent` matching `selector`.
    async fn query_within(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError>;

    async fn exists(&self, selector: &str) -> Result<bool, FacetError> {
        Ok(!self.query_all(selector).await?.is_empty())
    }

    async fn click(&self, element: &ElementId) -> Result<(), FacetError>;

    async fn scroll_into_view(&self, element: &ElementId) -> Result<(), FacetError>;
}
