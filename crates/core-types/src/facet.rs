use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One facet group.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Brand,
    Size,
    Color,
}

impl FacetKind {
    /// Processing order: some storefronts only populate sizes once a brand is narrowed.
    pub const ORDERED: [FacetKind; 3] = [FacetKind::Brand, FacetKind::Size, FacetKind::Color];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetKind::Brand => "brand",
            FacetKind::Size => "size",
            FacetKind::Color => "color",
        }
    }

    /// Name of the group inside a serialized [`FacetSet`].
    pub fn group_name(&self) -> &'static str {
        match self {
            FacetKind::Brand => "brands",
            FacetKind::Size => "sizes",
            FacetKind::Color => "colors",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "brand" | "brands" => Ok(FacetKind::Brand),
            "size" | "sizes" => Ok(FacetKind::Size),
            "color" | "colors" | "colour" | "colours" => Ok(FacetKind::Color),
            other => Err(format!("unknown facet kind '{other}'")),
        }
    }
}

/// A facet value as found on the wire: a bare label or a `{text, value}` pair.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FacetValue {
    Label(String),
    Pair {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl FacetValue {
    /// Resolves `text ?? value ?? self`.
    pub fn raw_label(&self) -> &str {
        match self {
            FacetValue::Label(label) => label,
            FacetValue::Pair { text, value } => text
                .as_deref()
                .or(value.as_deref())
                .unwrap_or_default(),
        }
    }

    /// Trimmed label.
    pub fn label(&self) -> &str {
        self.raw_label().trim()
    }
}

impl From<&str> for FacetValue {
    fn from(value: &str) -> Self {
        FacetValue::Label(value.to_string())
    }
}

impl From<String> for FacetValue {
    fn from(value: String) -> Self {
        FacetValue::Label(value)
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical, site-independent facet selection.
///
/// Group order is kept for display but ignored by equality.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FacetSet {
    #[serde(default)]
    pub brands: Vec<FacetValue>,
    #[serde(default)]
    pub sizes: Vec<FacetValue>,
    #[serde(default)]
    pub colors: Vec<FacetValue>,
}

impl FacetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used heavily by tests and fixtures.
    pub fn with<I, S>(mut self, kind: FacetKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for label in labels {
            self.push_unique(kind, label);
        }
        self
    }

    pub fn group(&self, kind: FacetKind) -> &[FacetValue] {
        match kind {
            FacetKind::Brand => &self.brands,
            FacetKind::Size => &self.sizes,
            FacetKind::Color => &self.colors,
        }
    }

    fn group_mut(&mut self, kind: FacetKind) -> &mut Vec<FacetValue> {
        match kind {
            FacetKind::Brand => &mut self.brands,
            FacetKind::Size => &mut self.sizes,
            FacetKind::Color => &mut self.colors,
        }
    }

    /// Trimmed labels of one group, in display order.
    pub fn labels(&self, kind: FacetKind) -> Vec<String> {
        self.group(kind)
            .iter()
            .map(|value| value.label().to_string())
            .collect()
    }

    /// Appends a label unless the group already holds it (case-sensitive).
    /// Empty labels are ignored.
    pub fn push_unique(&mut self, kind: FacetKind, label: impl Into<String>) -> bool {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return false;
        }
        let group = self.group_mut(kind);
        if group.iter().any(|existing| existing.label() == trimmed) {
            return false;
        }
        group.push(FacetValue::Label(trimmed.to_string()));
        true
    }

    pub fn len(&self) -> usize {
        self.brands.len() + self.sizes.len() + self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (FacetKind, &FacetValue)> + '_ {
        FacetKind::ORDERED
            .into_iter()
            .flat_map(move |kind| self.group(kind).iter().map(move |value| (kind, value)))
    }

    fn sorted_labels(&self, kind: FacetKind) -> Vec<&str> {
        let mut labels: Vec<&str> = self.group(kind).iter().map(FacetValue::label).collect();
        labels.sort_unstable();
        labels
    }
}

impl PartialEq for FacetSet {
    fn eq(&self, other: &Self) -> bool {
        FacetKind::ORDERED
            .iter()
            .all(|kind| self.sorted_labels(*kind) == other.sorted_labels(*kind))
    }
}

impl Eq for FacetSet {}
