//! In-memory page handle
//!
//! A small fake DOM used by tests and by the CLI to replay saved page
//! snapshots. Elements declare the selectors they answer to instead of being
//! matched by a CSS engine. The page can model the awkward parts of real
//! storefronts: panels that render late, controls that silently ignore clicks
//! and options that only appear after another facet is chosen.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use facetsync_core_types::FacetError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::ports::{ElementId, ElementSnapshot, Page};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FakeElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub hidden: bool,
    /// Number of queries the page must serve before this element renders
    #[serde(default)]
    pub render_after_queries: u32,
    /// Clicks that are swallowed before the control starts responding
    #[serde(default)]
    pub ignore_clicks: u32,
    /// Clicks never change anything
    #[serde(default)]
    pub inert: bool,
    /// Element ids unhidden by a click on this element
    #[serde(default)]
    pub reveals: Vec<String>,
    /// Clicking unchecks every element on the page
    #[serde(default)]
    pub clears_all: bool,
}

impl FakeElement {
    pub fn new(id: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selectors: vec![selector.into()],
            ..Self::default()
        }
    }

    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

/// Serializable page state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PageFixture {
    pub url: String,
    pub elements: Vec<FakeElement>,
}

#[derive(Debug)]
struct PageState {
    url: String,
    elements: Vec<FakeElement>,
    index: HashMap<String, usize>,
    queries: u32,
    clicks: Vec<String>,
}

impl PageState {
    fn is_rendered(&self, idx: usize) -> bool {
        let mut current = Some(idx);
        while let Some(i) = current {
            let element = &self.elements[i];
            let pending = element.render_after_queries > 0
                && self.queries <= element.render_after_queries;
            if element.hidden || pending {
                return false;
            }
            current = element
                .parent
                .as_ref()
                .and_then(|parent| self.index.get(parent).copied());
        }
        true
    }

    fn is_descendant_of(&self, idx: usize, ancestor: &str) -> bool {
        let mut parent = self.elements[idx].parent.as_deref();
        while let Some(id) = parent {
            if id == ancestor {
                return true;
            }
            parent = self
                .index
                .get(id)
                .and_then(|i| self.elements[*i].parent.as_deref());
        }
        false
    }

    fn select(&mut self, selector: &str, within: Option<&str>) -> Vec<ElementSnapshot> {
        self.queries += 1;
        (0..self.elements.len())
            .filter(|i| self.elements[*i].selectors.iter().any(|s| s == selector))
            .filter(|i| within.map_or(true, |ancestor| self.is_descendant_of(*i, ancestor)))
            .filter(|i| self.is_rendered(*i))
            .map(|i| snapshot(&self.elements[i]))
            .collect()
    }

    fn rendered_index(&self, element: &ElementId) -> Result<usize, FacetError> {
        self.index
            .get(&element.0)
            .copied()
            .filter(|i| self.is_rendered(*i))
            .ok_or_else(|| FacetError::NotFound(format!("element '{}' is not rendered", element)))
    }
}

fn snapshot(element: &FakeElement) -> ElementSnapshot {
    ElementSnapshot {
        id: ElementId(element.id.clone()),
        text: element.text.clone(),
        attributes: element.attributes.clone(),
        checked: element.checked,
    }
}

/// Fake page handle; cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct InMemoryPage {
    state: Mutex<PageState>,
}

impl InMemoryPage {
    pub fn new(fixture: PageFixture) -> Self {
        let index = fixture
            .elements
            .iter()
            .enumerate()
            .map(|(i, element)| (element.id.clone(), i))
            .collect();
        Self {
            state: Mutex::new(PageState {
                url: fixture.url,
                elements: fixture.elements,
                index,
                queries: 0,
                clicks: Vec::new(),
            }),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, FacetError> {
        let fixture: PageFixture = serde_json::from_str(json)
            .map_err(|err| FacetError::Config(format!("invalid page fixture: {err}")))?;
        Ok(Self::new(fixture))
    }

    /// Current state, suitable for writing back out as a fixture.
    pub fn fixture(&self) -> PageFixture {
        let state = self.state.lock();
        PageFixture {
            url: state.url.clone(),
            elements: state.elements.clone(),
        }
    }

    /// Ids of every element clicked so far, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn click_count(&self) -> usize {
        self.state.lock().clicks.len()
    }

    pub fn query_count(&self) -> u32 {
        self.state.lock().queries
    }
}

#[async_trait]
impl Page for InMemoryPage {
    async fn url(&self) -> Result<String, FacetError> {
        Ok(self.state.lock().url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, FacetError> {
        Ok(self.state.lock().select(selector, None))
    }

    async fn query_within(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError> {
        let mut state = self.state.lock();
        if !state.index.contains_key(&parent.0) {
            return Err(FacetError::NotFound(format!("element '{}' is gone", parent)));
        }
        Ok(state.select(selector, Some(parent.0.as_str())))
    }

    async fn click(&self, element: &ElementId) -> Result<(), FacetError> {
        let mut state = self.state.lock();
        let idx = state.rendered_index(element)?;
        state.clicks.push(element.0.clone());

        let target = &mut state.elements[idx];
        if target.ignore_clicks > 0 {
            target.ignore_clicks -= 1;
            return Ok(());
        }
        if target.inert {
            return Ok(());
        }
        if target.clears_all {
            for element in state.elements.iter_mut() {
                element.checked = false;
            }
            return Ok(());
        }
        target.checked = !target.checked;
        let reveals = target.reveals.clone();
        for id in reveals {
            if let Some(i) = state.index.get(&id).copied() {
                state.elements[i].hidden = false;
            }
        }
        Ok(())
    }

    async fn scroll_into_view(&self, element: &ElementId) -> Result<(), FacetError> {
        self.state.lock().rendered_index(element).map(|_| ())
    }
}

/// Builds pages rendering the markup of the built-in `demo-store` profile.
#[derive(Clone, Debug)]
pub struct DemoStoreFixture {
    url: String,
    groups: Vec<(&'static str, &'static str, Vec<(String, bool)>)>,
    render_after_queries: u32,
    sizes_after_brand: bool,
    collapsed: Vec<&'static str>,
    flaky: HashMap<String, u32>,
    inert: Vec<String>,
}

impl Default for DemoStoreFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoStoreFixture {
    pub fn new() -> Self {
        Self {
            url: "https://demo-store.test/women/shoes".to_string(),
            groups: vec![
                ("brand", "Brand", Vec::new()),
                ("size", "Size", Vec::new()),
                ("color", "Colour", Vec::new()),
            ],
            render_after_queries: 0,
            sizes_after_brand: false,
            collapsed: Vec::new(),
            flaky: HashMap::new(),
            inert: Vec::new(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn option(mut self, group: &str, label: &str, checked: bool) -> Self {
        if let Some((_, _, options)) = self.groups.iter_mut().find(|(key, _, _)| *key == group) {
            options.push((label.to_string(), checked));
        }
        self
    }

    pub fn brand(self, label: &str, checked: bool) -> Self {
        self.option("brand", label, checked)
    }

    pub fn size(self, label: &str, checked: bool) -> Self {
        self.option("size", label, checked)
    }

    pub fn color(self, label: &str, checked: bool) -> Self {
        self.option("color", label, checked)
    }

    /// The facet panel mounts only after this many page queries.
    pub fn render_after(mut self, queries: u32) -> Self {
        self.render_after_queries = queries;
        self
    }

    /// Size options stay hidden until some brand is toggled.
    pub fn sizes_after_brand(mut self) -> Self {
        self.sizes_after_brand = true;
        self
    }

    /// Options of the group render only after its expander is clicked.
    pub fn collapsed(mut self, group: &'static str) -> Self {
        self.collapsed.push(group);
        self
    }

    /// The option swallows its first `clicks` clicks.
    pub fn flaky(mut self, label: &str, clicks: u32) -> Self {
        self.flaky.insert(label.to_string(), clicks);
        self
    }

    /// The option never responds to clicks.
    pub fn inert(mut self, label: &str) -> Self {
        self.inert.push(label.to_string());
        self
    }

    pub fn fixture(&self) -> PageFixture {
        let mut elements = vec![FakeElement {
            render_after_queries: self.render_after_queries,
            ..FakeElement::new("panel", ".facet-panel")
        }];
        elements.push(
            FakeElement {
                clears_all: true,
                ..FakeElement::new("clear-all", ".active-filters__clear")
            }
            .child_of("panel")
            .text("Clear all"),
        );

        let size_option_ids: Vec<String> = self
            .groups
            .iter()
            .filter(|(key, _, _)| *key == "size")
            .flat_map(|(_, _, options)| (0..options.len()).map(|i| format!("size-{i}")))
            .collect();

        for (key, title, options) in &self.groups {
            let group_id = format!("group-{key}");
            let collapsed = self.collapsed.contains(key);
            elements.push(
                FakeElement::new(group_id.clone(), ".facet-group")
                    .child_of("panel")
                    .attr("data-facet-type", *key),
            );
            elements.push(
                FakeElement::new(format!("{group_id}-title"), ".facet-group__title")
                    .child_of(group_id.clone())
                    .text(*title),
            );
            if collapsed {
                elements.push(FakeElement {
                    reveals: (0..options.len()).map(|i| format!("{key}-{i}")).collect(),
                    ..FakeElement::new(format!("{group_id}-toggle"), ".facet-group__toggle")
                        .child_of(group_id.clone())
                });
            }

            for (i, (label, checked)) in options.iter().enumerate() {
                let option_id = format!("{key}-{i}");
                let mut option = FakeElement::new(option_id.clone(), ".facet-option")
                    .child_of(group_id.clone())
                    .attr("data-value", label.to_lowercase())
                    .checked(*checked);
                option.hidden = collapsed || (*key == "size" && self.sizes_after_brand);
                option.ignore_clicks = self.flaky.get(label).copied().unwrap_or(0);
                option.inert = self.inert.contains(label);
                if *key == "brand" && self.sizes_after_brand {
                    option.reveals = size_option_ids.clone();
                }
                elements.push(option);
                elements.push(
                    FakeElement::new(format!("{option_id}-label"), ".facet-option__label")
                        .child_of(option_id)
                        .text(label.clone()),
                );
            }
        }

        PageFixture {
            url: self.url.clone(),
            elements,
        }
    }

    pub fn build(&self) -> InMemoryPage {
        InMemoryPage::new(self.fixture())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_and_toggle() {
        let page = DemoStoreFixture::new().brand("Nike", false).build();
        let options = page.query_all(".facet-option").await.unwrap();
        assert_eq!(options.len(), 1);
        assert!(!options[0].checked);

        page.click(&options[0].id).await.unwrap();
        let options = page.query_all(".facet-option").await.unwrap();
        assert!(options[0].checked);
        assert_eq!(page.clicks(), vec!["brand-0".to_string()]);
    }

    #[tokio::test]
    async fn test_query_within_scopes_to_descendants() {
        let page = DemoStoreFixture::new()
            .brand("Nike", false)
            .size("M", false)
            .build();
        let labels = page
            .query_within(&ElementId("group-size".into()), ".facet-option__label")
            .await
            .unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "M");
    }

    #[tokio::test]
    async fn test_late_render() {
        let page = DemoStoreFixture::new().render_after(2).build();
        assert!(!page.exists(".facet-panel").await.unwrap());
        assert!(!page.exists(".facet-panel").await.unwrap());
        assert!(page.exists(".facet-panel").await.unwrap());
    }

    #[tokio::test]
    async fn test_hidden_until_revealed() {
        let page = DemoStoreFixture::new()
            .brand("Nike", false)
            .size("M", false)
            .sizes_after_brand()
            .build();
        let size = ElementId("size-0".into());
        assert!(matches!(
            page.click(&size).await,
            Err(FacetError::NotFound(_))
        ));
        page.click(&ElementId("brand-0".into())).await.unwrap();
        page.click(&size).await.unwrap();
        assert!(page.fixture().elements.iter().any(|e| e.id == "size-0" && e.checked));
    }

    #[tokio::test]
    async fn test_flaky_and_inert_controls() {
        let page = DemoStoreFixture::new()
            .size("M", false)
            .size("L", false)
            .flaky("M", 1)
            .inert("L")
            .build();
        let m = ElementId("size-0".into());
        let l = ElementId("size-1".into());
        page.click(&m).await.unwrap();
        page.click(&l).await.unwrap();
        assert!(page.query_all(".facet-option").await.unwrap().iter().all(|o| !o.checked));
        page.click(&m).await.unwrap();
        let checked: Vec<_> = page
            .query_all(".facet-option")
            .await
            .unwrap()
            .into_iter()
            .filter(|o| o.checked)
            .map(|o| o.id.0)
            .collect();
        assert_eq!(checked, vec!["size-0".to_string()]);
    }

    #[test]
    fn test_fixture_json_round_trip() {
        let fixture = DemoStoreFixture::new().brand("Nike", true).fixture();
        let json = serde_json::to_string(&fixture).unwrap();
        let page = InMemoryPage::from_json(&json).unwrap();
        assert_eq!(page.fixture(), fixture);
        assert!(matches!(
            InMemoryPage::from_json("{"),
            Err(FacetError::Config(_))
        ));
    }
}
