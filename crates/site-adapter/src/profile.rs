//! Per-storefront configuration tables
//!
//! A profile is everything that differs between storefronts: where the facet
//! panel lives, how a group announces its type, which element toggles a facet
//! and how its label is rendered.

use facet_normalizer::LabelRulesConfig;
use facetsync_core_types::SiteId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SiteProfile {
    pub id: SiteId,
    /// Hostnames served by this storefront; subdomains match too
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Selectors that exist once the facet UI has mounted
    pub anchors: Vec<String>,
    /// Proceed even when no anchor ever shows up
    #[serde(default)]
    pub assume_ready_on_exhaustion: bool,
    pub sections: SectionSelectors,
    #[serde(default)]
    pub chips: Option<ChipSelectors>,
    /// Control that clears every active facet at once
    #[serde(default)]
    pub clear_all: Option<String>,
    #[serde(default)]
    pub label_rules: LabelRulesConfig,
}

/// Facet groups rendered as sections of toggleable options.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SectionSelectors {
    pub container: String,
    /// Attribute on the container carrying an explicit type tag
    #[serde(default)]
    pub kind_attr: Option<String>,
    /// Heading inside the container, used when there is no type tag
    #[serde(default)]
    pub heading: Option<String>,
    /// Toggle that expands a collapsed section
    #[serde(default)]
    pub expander: Option<String>,
    pub option: String,
    /// Label element inside an option; the option's own text otherwise
    #[serde(default)]
    pub option_label: Option<String>,
    #[serde(default)]
    pub option_value_attr: Option<String>,
}

/// "Active filter" chips rendered outside the sections.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChipSelectors {
    pub chip: String,
    #[serde(default)]
    pub kind_attr: Option<String>,
    /// Remove button inside a chip
    #[serde(default)]
    pub remove: Option<String>,
}

impl SiteProfile {
    /// Reference storefront; the markup [`crate::DemoStoreFixture`] renders.
    pub fn demo_store() -> Self {
        Self {
            id: SiteId::new("demo-store"),
            hosts: vec!["demo-store.test".to_string()],
            anchors: vec![".facet-panel".to_string(), "[data-facet-panel]".to_string()],
            assume_ready_on_exhaustion: false,
            sections: SectionSelectors {
                container: ".facet-group".to_string(),
                kind_attr: Some("data-facet-type".to_string()),
                heading: Some(".facet-group__title".to_string()),
                expander: Some(".facet-group__toggle".to_string()),
                option: ".facet-option".to_string(),
                option_label: Some(".facet-option__label".to_string()),
                option_value_attr: Some("data-value".to_string()),
            },
            chips: None,
            clear_all: Some(".active-filters__clear".to_string()),
            label_rules: LabelRulesConfig {
                strip_patterns: vec![r"\s*\(\d+\)$".to_string()],
                ..LabelRulesConfig::default()
            },
        }
    }

    /// Storefront whose filter panel hydrates unpredictably; its chips bar is
    /// the reliable signal, so readiness is relaxed.
    pub fn outlet_store() -> Self {
        Self {
            id: SiteId::new("outlet-store"),
            hosts: vec!["outlet-store.test".to_string()],
            anchors: vec!["#refinements".to_string(), ".refinement-bar".to_string()],
            assume_ready_on_exhaustion: true,
            sections: SectionSelectors {
                container: ".refinement".to_string(),
                kind_attr: None,
                heading: Some(".refinement__name".to_string()),
                expander: None,
                option: "li.refinement__value".to_string(),
                option_label: None,
                option_value_attr: Some("data-refinement-value".to_string()),
            },
            chips: Some(ChipSelectors {
                chip: ".selected-refinement".to_string(),
                kind_attr: Some("data-refinement-type".to_string()),
                remove: Some(".selected-refinement__remove".to_string()),
            }),
            clear_all: None,
            label_rules: LabelRulesConfig {
                strip_patterns: vec![r"\s*-\s*\d+$".to_string(), r"(?i)^remove\s+".to_string()],
                ..LabelRulesConfig::default()
            },
        }
    }

    /// True when `host` is one of the profile's hosts or a subdomain of one.
    pub fn serves_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.hosts.iter().any(|known| {
            let known = known.to_ascii_lowercase();
            host == known || host.ends_with(&format!(".{known}"))
        })
    }
}

pub fn builtin_profiles() -> Vec<SiteProfile> {
    vec![SiteProfile::demo_store(), SiteProfile::outlet_store()]
}
