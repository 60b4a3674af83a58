//! Site adapter contract and the configuration-driven implementation

use async_trait::async_trait;
use facet_normalizer::{
    best_match, classify, classify_with_tag, fuzzy_match, parse_kind_tag, LabelRules,
};
use facetsync_core_types::{FacetError, FacetKind, FacetSet, FacetValue, SiteId};
use tracing::{debug, info, instrument, warn};

use crate::ports::{ElementSnapshot, Page};
use crate::profile::SiteProfile;

/// Outcome of a single interaction with one facet control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FacetAttempt {
    /// A matching control was toggled; verification is still pending
    Clicked { matched: String },
    /// The matching control is already active
    AlreadyActive,
    /// No control for the value exists on the page
    ControlMissing,
}

/// Capabilities every storefront adapter provides.
///
/// Applying a whole [`FacetSet`] with retries and verification is layered on
/// top of these primitives by the engine.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    fn site_id(&self) -> &SiteId;

    fn profile(&self) -> &SiteProfile;

    /// Reads the facets currently applied on the page.
    async fn extract(&self, page: &dyn Page) -> Result<FacetSet, FacetError>;

    /// Clears every active facet.
    async fn reset(&self, page: &dyn Page) -> Result<(), FacetError>;

    /// Locates and toggles the control for one value.
    async fn apply_facet(
        &self,
        page: &dyn Page,
        kind: FacetKind,
        value: &str,
    ) -> Result<FacetAttempt, FacetError>;

    /// Verification is defined in terms of extraction so the two never disagree.
    async fn is_filter_applied(
        &self,
        page: &dyn Page,
        kind: FacetKind,
        value: &str,
    ) -> Result<bool, FacetError> {
        let current = self.extract(page).await?;
        Ok(applied_in(&current, kind, value))
    }
}

/// Whether `value` fuzzy-matches anything already in `current`'s group.
pub fn applied_in(current: &FacetSet, kind: FacetKind, value: &str) -> bool {
    current
        .group(kind)
        .iter()
        .any(|applied| fuzzy_match(value, applied.label()))
}

/// Adapter driven entirely by a [`SiteProfile`].
pub struct ConfiguredAdapter {
    profile: SiteProfile,
    rules: LabelRules,
}

impl ConfiguredAdapter {
    pub fn new(profile: SiteProfile) -> Result<Self, FacetError> {
        if profile.anchors.is_empty() {
            return Err(FacetError::Config(format!(
                "profile '{}' declares no readiness anchors",
                profile.id
            )));
        }
        let rules = LabelRules::from_config(&profile.label_rules)?;
        Ok(Self { profile, rules })
    }

    pub fn rules(&self) -> &LabelRules {
        &self.rules
    }

    /// Type tag first, then the heading text.
    async fn section_kind(&self, page: &dyn Page, section: &ElementSnapshot) -> Option<FacetKind> {
        let selectors = &self.profile.sections;
        let tagged = selectors
            .kind_attr
            .as_deref()
            .and_then(|attr| section.attr(attr))
            .and_then(parse_kind_tag);
        if tagged.is_some() {
            return tagged;
        }

        let heading = selectors.heading.as_deref()?;
        match page.query_within(&section.id, heading).await {
            Ok(found) => found.first().and_then(|h| parse_kind_tag(&h.text)),
            Err(err) => {
                debug!(section = %section.id, %err, "section heading unreadable");
                None
            }
        }
    }

    async fn sections(
        &self,
        page: &dyn Page,
    ) -> Result<Vec<(ElementSnapshot, Option<FacetKind>)>, FacetError> {
        let containers = page.query_all(&self.profile.sections.container).await?;
        let mut sections = Vec::with_capacity(containers.len());
        for container in containers {
            let kind = self.section_kind(page, &container).await;
            sections.push((container, kind));
        }
        Ok(sections)
    }

    async fn option_label(&self, page: &dyn Page, option: &ElementSnapshot) -> String {
        let selectors = &self.profile.sections;
        let text = match selectors.option_label.as_deref() {
            Some(selector) => page
                .query_within(&option.id, selector)
                .await
                .ok()
                .and_then(|found| found.into_iter().next())
                .map(|label| label.text),
            None => Some(option.text.clone()),
        }
        .filter(|text| !text.trim().is_empty());
        let value = selectors
            .option_value_attr
            .as_deref()
            .and_then(|attr| option.attr(attr))
            .map(str::to_string);

        self.rules.clean(FacetValue::Pair { text, value }.raw_label())
    }

    async fn options_in(
        &self,
        page: &dyn Page,
        section: &ElementSnapshot,
    ) -> Result<Vec<(ElementSnapshot, String)>, FacetError> {
        let options = page
            .query_within(&section.id, &self.profile.sections.option)
            .await?;
        let mut labelled = Vec::with_capacity(options.len());
        for option in options {
            let label = self.option_label(page, &option).await;
            if !label.is_empty() {
                labelled.push((option, label));
            }
        }
        Ok(labelled)
    }

    async fn expand(&self, page: &dyn Page, section: &ElementSnapshot) -> bool {
        let Some(selector) = self.profile.sections.expander.as_deref() else {
            return false;
        };
        let toggle = match page.query_within(&section.id, selector).await {
            Ok(found) => found.into_iter().next(),
            Err(err) => {
                debug!(section = %section.id, %err, "expander lookup failed");
                None
            }
        };
        let Some(toggle) = toggle else {
            return false;
        };
        match page.click(&toggle.id).await {
            Ok(()) => true,
            Err(err) => {
                warn!(section = %section.id, %err, "failed to expand facet section");
                false
            }
        }
    }

    async fn extract_chips(&self, page: &dyn Page, current: &mut FacetSet) {
        let Some(chips) = &self.profile.chips else {
            return;
        };
        match page.query_all(&chips.chip).await {
            Ok(found) => {
                for chip in found {
                    let label = self.rules.clean(&chip.text);
                    let tag = chips.kind_attr.as_deref().and_then(|attr| chip.attr(attr));
                    let kind = classify_with_tag(tag, &label, &self.rules);
                    current.push_unique(kind, label);
                }
            }
            Err(err) => warn!(%err, "active filter chips unreadable"),
        }
    }

    async fn remove_chips(&self, page: &dyn Page) -> Result<bool, FacetError> {
        let Some(remove) = self.profile.chips.as_ref().and_then(|c| c.remove.as_deref()) else {
            return Ok(false);
        };
        let buttons = page.query_all(remove).await?;
        for button in &buttons {
            if let Err(err) = page.click(&button.id).await {
                warn!(element = %button.id, %err, "failed to remove active filter chip");
            }
        }
        Ok(!buttons.is_empty())
    }
}

#[async_trait]
impl SiteAdapter for ConfiguredAdapter {
    fn site_id(&self) -> &SiteId {
        &self.profile.id
    }

    fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    #[instrument(skip_all, fields(site = %self.profile.id))]
    async fn extract(&self, page: &dyn Page) -> Result<FacetSet, FacetError> {
        let sections = self.sections(page).await.map_err(|err| {
            FacetError::Extraction(format!("facet sections unavailable: {err}"))
        })?;

        let mut current = FacetSet::new();
        for (section, kind) in &sections {
            let options = match self.options_in(page, section).await {
                Ok(options) => options,
                Err(err) => {
                    warn!(section = %section.id, %err, "skipping unreadable facet section");
                    continue;
                }
            };
            for (_, label) in options.into_iter().filter(|(option, _)| option.checked) {
                let kind = kind.unwrap_or_else(|| classify(&label, &self.rules));
                current.push_unique(kind, label);
            }
        }
        self.extract_chips(page, &mut current).await;

        debug!(facets = current.len(), "extracted current facets");
        Ok(current)
    }

    #[instrument(skip_all, fields(site = %self.profile.id))]
    async fn reset(&self, page: &dyn Page) -> Result<(), FacetError> {
        if let Some(selector) = &self.profile.clear_all {
            if let Some(button) = page.query_all(selector).await?.into_iter().next() {
                page.click(&button.id).await?;
                info!("cleared facets via clear-all control");
                return Ok(());
            }
        }

        if self.remove_chips(page).await? {
            info!("cleared facets via chip remove buttons");
            return Ok(());
        }

        for (section, _) in self.sections(page).await? {
            let options = match self.options_in(page, &section).await {
                Ok(options) => options,
                Err(err) => {
                    warn!(section = %section.id, %err, "skipping unreadable facet section");
                    continue;
                }
            };
            for (option, label) in options.into_iter().filter(|(option, _)| option.checked) {
                if let Err(err) = page.click(&option.id).await {
                    warn!(%label, %err, "failed to clear facet");
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self, page), fields(site = %self.profile.id))]
    async fn apply_facet(
        &self,
        page: &dyn Page,
        kind: FacetKind,
        value: &str,
    ) -> Result<FacetAttempt, FacetError> {
        let wanted = self.rules.clean(value);
        let candidates: Vec<_> = self
            .sections(page)
            .await?
            .into_iter()
            .filter(|(_, section_kind)| section_kind.map_or(true, |k| k == kind))
            .collect();
        if candidates.is_empty() {
            debug!("no facet section for this group");
            return Ok(FacetAttempt::ControlMissing);
        }

        for (section, section_kind) in candidates {
            let mut options = self.options_in(page, &section).await?;
            if options.is_empty() && self.expand(page, &section).await {
                options = self.options_in(page, &section).await?;
            }
            if section_kind.is_none() {
                options.retain(|(_, label)| classify(label, &self.rules) == kind);
            }

            let labels: Vec<&str> = options.iter().map(|(_, label)| label.as_str()).collect();
            let Some(index) = best_match(&wanted, &labels) else {
                continue;
            };
            let (option, label) = &options[index];
            if option.checked {
                return Ok(FacetAttempt::AlreadyActive);
            }
            if let Err(err) = page.scroll_into_view(&option.id).await {
                debug!(%label, %err, "scroll into view failed");
            }
            page.click(&option.id).await.map_err(|err| {
                FacetError::Interaction(format!("toggling {kind} '{label}': {err}"))
            })?;
            debug!(%label, "toggled facet control");
            return Ok(FacetAttempt::Clicked {
                matched: label.clone(),
            });
        }

        debug!("no matching control");
        Ok(FacetAttempt::ControlMissing)
    }
}
