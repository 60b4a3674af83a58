//! Application configuration
//!
//! Loaded from YAML; every section is optional and falls back to the
//! library defaults.

use std::env;

use facet_engine::{ApplyMode, EnginePolicy, FacetSyncService, ReadinessPolicy};
use facetsync_core_types::{FacetError, SiteId};
use popup_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use site_adapter::{AdapterRegistry, SiteProfile};
use tracing::{debug, warn};

pub const ENV_RESPONSE_TIMEOUT_MS: &str = "FACETSYNC_RESPONSE_TIMEOUT_MS";
pub const ENV_SITE: &str = "FACETSYNC_SITE";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub readiness: ReadinessPolicy,
    pub engine: EnginePolicy,
    pub apply_mode: ApplyMode,
    /// Force one site instead of matching the page host
    pub site: Option<SiteId>,
    /// Extra storefront profiles; an id matching a built-in replaces it
    pub profiles: Vec<SiteProfile>,
}

impl AppConfig {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Applies `FACETSYNC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_RESPONSE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => {
                    debug!(ms, "response timeout overridden from environment");
                    self.gateway.response_timeout_ms = ms;
                }
                Err(err) => warn!(value = %raw, %err, "ignoring invalid response timeout override"),
            }
        }
        if let Some(site) = lookup(ENV_SITE).filter(|s| !s.trim().is_empty()) {
            self.site = Some(SiteId::new(site.trim()));
        }
    }

    pub fn registry(&self) -> Result<AdapterRegistry, FacetError> {
        let mut registry = AdapterRegistry::with_builtin()?;
        for profile in &self.profiles {
            registry.register_profile(profile.clone())?;
        }
        Ok(registry)
    }

    pub fn service(&self) -> Result<FacetSyncService, FacetError> {
        let service = FacetSyncService::new(
            self.registry()?,
            self.engine.clone(),
            self.readiness.clone(),
        )?;
        Ok(service.with_site(self.site.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml(
            r#"
gateway:
  response_timeout_ms: 5000
engine:
  size_attempts: 4
apply_mode: replace
"#,
        )
        .unwrap();
        assert_eq!(config.gateway.response_timeout_ms, 5000);
        assert_eq!(config.gateway.queue_depth, GatewayConfig::default().queue_depth);
        assert_eq!(config.engine.size_attempts, 4);
        assert_eq!(config.engine.brand_attempts, 2);
        assert_eq!(config.apply_mode, ApplyMode::Replace);
        assert_eq!(config.readiness, ReadinessPolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_RESPONSE_TIMEOUT_MS, "1500"),
            (ENV_SITE, " outlet-store "),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.gateway.response_timeout_ms, 1500);
        assert_eq!(config.site, Some(SiteId::new("outlet-store")));

        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == ENV_RESPONSE_TIMEOUT_MS).then(|| "soon".to_string()));
        assert_eq!(config.gateway.response_timeout_ms, 20_000);
    }

    #[test]
    fn test_custom_profiles_join_registry() {
        let config = AppConfig::from_yaml(
            r##"
profiles:
  - id: tiny-shop
    hosts: [tiny.test]
    anchors: ["#filters"]
    sections:
      container: ".filter"
      option: ".filter__option"
"##,
        )
        .unwrap();
        let registry = config.registry().unwrap();
        assert!(registry.for_url("https://tiny.test/shoes").is_ok());
        assert_eq!(registry.len(), 3);
    }
}
