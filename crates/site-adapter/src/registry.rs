use std::collections::BTreeMap;
use std::sync::Arc;

use facetsync_core_types::{FacetError, SiteId};
use tracing::debug;
use url::Url;

use crate::adapter::{ConfiguredAdapter, SiteAdapter};
use crate::profile::{builtin_profiles, SiteProfile};

/// Adapters keyed by site id.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<SiteId, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in profile.
    pub fn with_builtin() -> Result<Self, FacetError> {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.register_profile(profile)?;
        }
        Ok(registry)
    }

    /// Replaces any adapter already registered under the same id.
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        let id = adapter.site_id().clone();
        if self.adapters.insert(id.clone(), adapter).is_some() {
            debug!(site = %id, "replaced site adapter");
        }
    }

    pub fn register_profile(&mut self, profile: SiteProfile) -> Result<(), FacetError> {
        self.register(Arc::new(ConfiguredAdapter::new(profile)?));
        Ok(())
    }

    pub fn get(&self, site: &SiteId) -> Result<Arc<dyn SiteAdapter>, FacetError> {
        self.adapters
            .get(site)
            .cloned()
            .ok_or_else(|| FacetError::UnsupportedSite(site.to_string()))
    }

    /// Adapter whose profile serves the host of `url`.
    pub fn for_url(&self, url: &str) -> Result<Arc<dyn SiteAdapter>, FacetError> {
        let parsed = Url::parse(url)
            .map_err(|err| FacetError::UnsupportedSite(format!("{url}: {err}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FacetError::UnsupportedSite(format!("{url}: no host")))?;
        self.adapters
            .values()
            .find(|adapter| adapter.profile().serves_host(host))
            .cloned()
            .ok_or_else(|| FacetError::UnsupportedSite(host.to_string()))
    }

    pub fn site_ids(&self) -> Vec<SiteId> {
        self.adapters.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let registry = AdapterRegistry::with_builtin().unwrap();
        assert_eq!(registry.len(), 2);

        let adapter = registry
            .for_url("https://www.demo-store.test/women?page=2")
            .unwrap();
        assert_eq!(adapter.site_id().as_str(), "demo-store");
        assert!(registry.get(&SiteId::new("outlet-store")).is_ok());

        assert!(matches!(
            registry.for_url("https://elsewhere.test/"),
            Err(FacetError::UnsupportedSite(_))
        ));
        assert!(matches!(
            registry.get(&SiteId::new("nowhere")),
            Err(FacetError::UnsupportedSite(_))
        ));
    }

    #[test]
    fn test_profile_without_anchors_rejected() {
        let mut profile = SiteProfile::demo_store();
        profile.anchors.clear();
        let mut registry = AdapterRegistry::new();
        assert!(matches!(
            registry.register_profile(profile),
            Err(FacetError::Config(_))
        ));
        assert!(registry.is_empty());
    }
}
