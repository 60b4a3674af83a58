//! Facet label normalization and matching
//!
//! Storefronts render the same facet in many ways ("UK 8", "8", "UK 8 (120)").
//! This crate turns those labels into comparable strings, decides which facet
//! group an unlabelled value belongs to, and judges label equivalence.

pub mod fuzzy;
pub mod label;

pub use fuzzy::{best_match, fuzzy_match};
pub use label::{
    classify, classify_with_tag, normalize_label, normalize_text, parse_kind_tag, LabelRules,
    LabelRulesConfig,
};
