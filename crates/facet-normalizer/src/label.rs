//! Label normalization and facet-group classification

use std::collections::HashSet;

use facetsync_core_types::{FacetError, FacetKind, FacetValue};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

static STANDARD_RULES: Lazy<LabelRules> = Lazy::new(|| {
    LabelRules::from_config(&LabelRulesConfig::default())
        .expect("built-in label rules must compile")
});

/// Words that qualify a palette name without changing the group ("Light Blue").
const COLOR_MODIFIERS: &[&str] = &[
    "light", "dark", "pale", "bright", "deep", "mid", "off", "neon", "dusty", "washed",
];

/// Normalizes a wire facet value to its label.
pub fn normalize_label(value: &FacetValue) -> String {
    normalize_text(value.raw_label())
}

/// NFKC-normalizes, trims and collapses internal whitespace.
pub fn normalize_text(raw: &str) -> String {
    let composed: String = raw.nfkc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a page type tag or section heading to a facet group.
pub fn parse_kind_tag(tag: &str) -> Option<FacetKind> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return None;
    }
    if tag.contains("brand") || tag.contains("designer") || tag.contains("manufacturer") {
        Some(FacetKind::Brand)
    } else if tag.contains("size") {
        Some(FacetKind::Size)
    } else if tag.contains("colour") || tag.contains("color") {
        Some(FacetKind::Color)
    } else {
        None
    }
}

/// Classifies a bare label: size pattern > color pattern > brand.
pub fn classify(label: &str, rules: &LabelRules) -> FacetKind {
    if rules.is_size(label) {
        FacetKind::Size
    } else if rules.is_color(label) {
        FacetKind::Color
    } else {
        FacetKind::Brand
    }
}

/// Classifies with an explicit page tag taking priority over label patterns.
pub fn classify_with_tag(tag: Option<&str>, label: &str, rules: &LabelRules) -> FacetKind {
    tag.and_then(parse_kind_tag)
        .unwrap_or_else(|| classify(label, rules))
}

/// Serializable rule tables, usually part of a site profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LabelRulesConfig {
    /// Regexes matched against the whole cleaned label
    #[serde(default = "default_size_patterns")]
    pub size_patterns: Vec<String>,
    /// Enumerated letter sizes, compared case-insensitively
    #[serde(default = "default_letter_sizes")]
    pub letter_sizes: Vec<String>,
    /// Palette names, compared per token
    #[serde(default = "default_color_names")]
    pub color_names: Vec<String>,
    /// Fragments removed from labels before comparison, e.g. result counts
    #[serde(default)]
    pub strip_patterns: Vec<String>,
}

impl Default for LabelRulesConfig {
    fn default() -> Self {
        Self {
            size_patterns: default_size_patterns(),
            letter_sizes: default_letter_sizes(),
            color_names: default_color_names(),
            strip_patterns: Vec::new(),
        }
    }
}

fn default_size_patterns() -> Vec<String> {
    vec![
        r"(?i)^uk\s*\d{1,2}(\.5)?$".to_string(),
        r"(?i)^(eu|us)\s*\d{1,2}(\.5)?$".to_string(),
        r"^\d{1,3}(\.5)?$".to_string(),
        r"^\d{2}\s*[x/]\s*\d{2}$".to_string(),
        r"(?i)^(w|waist)\s*\d{2}$".to_string(),
    ]
}

fn default_letter_sizes() -> Vec<String> {
    [
        "XXS", "XS", "S", "M", "L", "XL", "XXL", "XXXL", "2XL", "3XL", "4XL", "S/M", "M/L",
        "L/XL", "Small", "Medium", "Large", "X-Large", "One Size",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_color_names() -> Vec<String> {
    [
        "black", "white", "grey", "gray", "red", "blue", "navy", "green", "yellow", "orange",
        "pink", "purple", "brown", "beige", "cream", "khaki", "gold", "silver", "multi",
        "burgundy", "teal", "olive", "tan", "ivory", "charcoal", "stone", "camel", "lilac",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Compiled rule tables.
#[derive(Clone, Debug)]
pub struct LabelRules {
    size_patterns: Vec<Regex>,
    letter_sizes: HashSet<String>,
    palette: HashSet<String>,
    strip: Vec<Regex>,
}

impl LabelRules {
    /// Rules used when a site profile does not override them.
    pub fn standard() -> &'static LabelRules {
        &STANDARD_RULES
    }

    pub fn from_config(config: &LabelRulesConfig) -> Result<Self, FacetError> {
        let compile = |patterns: &[String]| -> Result<Vec<Regex>, FacetError> {
            patterns
                .iter()
                .map(|pattern| {
                    Regex::new(pattern).map_err(|err| {
                        warn!(%pattern, %err, "rejecting label rule pattern");
                        FacetError::Config(format!("invalid label pattern '{pattern}': {err}"))
                    })
                })
                .collect()
        };

        let rules = Self {
            size_patterns: compile(&config.size_patterns)?,
            letter_sizes: config
                .letter_sizes
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            palette: config
                .color_names
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            strip: compile(&config.strip_patterns)?,
        };
        debug!(
            size_patterns = rules.size_patterns.len(),
            strip_patterns = rules.strip.len(),
            "compiled label rules"
        );
        Ok(rules)
    }

    /// Normalizes and removes site-specific noise such as result counts.
    pub fn clean(&self, raw: &str) -> String {
        let mut label = normalize_text(raw);
        for pattern in &self.strip {
            label = pattern.replace_all(&label, "").into_owned();
        }
        normalize_text(&label)
    }

    pub fn is_size(&self, label: &str) -> bool {
        let label = self.clean(label);
        if label.is_empty() {
            return false;
        }
        self.letter_sizes.contains(&label.to_lowercase())
            || self.size_patterns.iter().any(|re| re.is_match(&label))
    }

    /// Every token must be a palette name or a modifier, with at least one palette name.
    pub fn is_color(&self, label: &str) -> bool {
        let label = self.clean(label).to_lowercase();
        let mut saw_palette = false;
        for token in label.split(|c: char| c.is_whitespace() || c == '/' || c == '-') {
            if token.is_empty() {
                continue;
            }
            if self.palette.contains(token) {
                saw_palette = true;
            } else if !COLOR_MODIFIERS.contains(&token) {
                return false;
            }
        }
        saw_palette
    }
}

impl Default for LabelRules {
    fn default() -> Self {
        STANDARD_RULES.clone()
    }
}
