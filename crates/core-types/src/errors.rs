use thiserror::Error;

/// Error taxonomy shared by adapters, the engine and the gateway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FacetError {
    /// An expected control or section is absent from the page
    #[error("not found: {0}")]
    NotFound(String),

    /// A readiness or response bound was exceeded
    #[error("timed out: {0}")]
    Timeout(String),

    /// A click or toggle failed, or did not produce the verified state
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// No adapter is registered for the requested storefront
    #[error("unsupported site: {0}")]
    UnsupportedSite(String),

    /// The current facet state could not be read at all
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The page handle reported an error
    #[error("page error: {0}")]
    Page(String),

    /// A site profile or rule table is malformed
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FacetError {
    /// Check if retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FacetError::Timeout(_) | FacetError::Interaction(_) | FacetError::Page(_)
        )
    }

    /// Errors allowed to escape the engine as a call-level failure
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FacetError::UnsupportedSite(_) | FacetError::Extraction(_) | FacetError::Config(_)
        )
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            FacetError::UnsupportedSite(_) | FacetError::Config(_) => 3,
            FacetError::Extraction(_) | FacetError::Timeout(_) => 2,
            FacetError::Interaction(_) | FacetError::Page(_) => 1,
            FacetError::NotFound(_) => 0,
        }
    }
}

pub type FacetResult<T> = Result<T, FacetError>;
