//! Read-only page handle over a saved HTML document
//!
//! Lets adapters extract facets from a page saved out of a browser. The
//! document is re-parsed per query so the handle stays `Send + Sync`;
//! interactions are rejected.

use std::collections::BTreeMap;

use async_trait::async_trait;
use facetsync_core_types::FacetError;
use scraper::{ElementRef, Html, Selector};

use crate::ports::{ElementId, ElementSnapshot, Page};

pub struct HtmlSnapshotPage {
    url: String,
    source: String,
}

impl HtmlSnapshotPage {
    pub fn new(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }

    /// Uses the document's canonical link (or `og:url`) when present.
    pub fn with_discovered_url(fallback: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let url = discover_url(&source).unwrap_or_else(|| fallback.into());
        Self { url, source }
    }

    fn run<T>(&self, op: impl FnOnce(&Html) -> Result<T, FacetError>) -> Result<T, FacetError> {
        let document = Html::parse_document(&self.source);
        op(&document)
    }
}

fn discover_url(source: &str) -> Option<String> {
    let document = Html::parse_document(source);
    ["link[rel=canonical]", "meta[property='og:url']"]
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|selector| {
            document.select(&selector).find_map(|el| {
                el.value()
                    .attr("href")
                    .or_else(|| el.value().attr("content"))
                    .map(str::to_string)
            })
        })
}

fn parse_selector(raw: &str) -> Result<Selector, FacetError> {
    Selector::parse(raw).map_err(|err| FacetError::Page(format!("invalid selector '{raw}': {err}")))
}

/// Elements in document order; ids are positions in this list.
fn elements(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .collect()
}

fn element_snapshot(position: usize, element: ElementRef<'_>) -> ElementSnapshot {
    let attributes: BTreeMap<String, String> = element
        .value()
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let checked = attributes.contains_key("checked")
        || ["aria-checked", "aria-pressed", "aria-selected", "data-checked"]
            .iter()
            .any(|attr| attributes.get(*attr).is_some_and(|v| v == "true"));
    let text = element.text().collect::<Vec<_>>().join(" ");

    ElementSnapshot {
        id: ElementId(format!("n{position}")),
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
        attributes,
        checked,
    }
}

fn position_of(id: &ElementId) -> Result<usize, FacetError> {
    id.0.strip_prefix('n')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| FacetError::NotFound(format!("element '{}' is not from this page", id)))
}

fn snapshots_of<'a>(
    all: &[ElementRef<'a>],
    matches: impl Iterator<Item = ElementRef<'a>>,
) -> Vec<ElementSnapshot> {
    matches
        .filter_map(|found| {
            all.iter()
                .position(|candidate| candidate.id() == found.id())
                .map(|position| element_snapshot(position, found))
        })
        .collect()
}

#[async_trait]
impl Page for HtmlSnapshotPage {
    async fn url(&self) -> Result<String, FacetError> {
        Ok(self.url.clone())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, FacetError> {
        let selector = parse_selector(selector)?;
        self.run(|document| {
            let all = elements(document);
            Ok(snapshots_of(&all, document.select(&selector)))
        })
    }

    async fn query_within(
        &self,
        parent: &ElementId,
        selector: &str,
    ) -> Result<Vec<ElementSnapshot>, FacetError> {
        let selector = parse_selector(selector)?;
        let position = position_of(parent)?;
        self.run(|document| {
            let all = elements(document);
            let root = all
                .get(position)
                .copied()
                .ok_or_else(|| FacetError::NotFound(format!("element '{}' is gone", parent)))?;
            let scoped = root.select(&selector).filter(|el| el.id() != root.id());
            Ok(snapshots_of(&all, scoped))
        })
    }

    async fn click(&self, element: &ElementId) -> Result<(), FacetError> {
        Err(FacetError::Interaction(format!(
            "cannot click '{}': HTML snapshots are read-only",
            element
        )))
    }

    async fn scroll_into_view(&self, _element: &ElementId) -> Result<(), FacetError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"<html><head>
        <link rel="canonical" href="https://demo-store.test/women/shoes">
        </head><body>
        <div class="facet-panel">
          <section class="facet-group" data-facet-type="brand">
            <h3 class="facet-group__title">Brand</h3>
            <label class="facet-option" aria-checked="true" data-value="nike">
              <span class="facet-option__label">Nike (23)</span></label>
            <label class="facet-option" data-value="puma">
              <span class="facet-option__label">Puma (4)</span></label>
          </section>
          <section class="facet-group" data-facet-type="size">
            <label class="facet-option" data-checked="true" data-value="uk-8">
              <span class="facet-option__label">UK 8</span></label>
          </section>
        </div></body></html>"#;

    #[tokio::test]
    async fn test_queries() {
        let page = HtmlSnapshotPage::with_discovered_url("file://shop.html", SHOP);
        assert_eq!(page.url().await.unwrap(), "https://demo-store.test/women/shoes");

        let groups = page.query_all(".facet-group").await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].attr("data-facet-type"), Some("brand"));

        let options = page
            .query_within(&groups[0].id, ".facet-option")
            .await
            .unwrap();
        assert_eq!(options.len(), 2);
        assert!(options[0].checked);
        assert!(!options[1].checked);
        assert_eq!(options[1].text, "Puma (4)");
    }

    #[tokio::test]
    async fn test_read_only() {
        let page = HtmlSnapshotPage::new("https://demo-store.test", SHOP);
        let options = page.query_all(".facet-option").await.unwrap();
        assert!(matches!(
            page.click(&options[0].id).await,
            Err(FacetError::Interaction(_))
        ));
        assert!(matches!(
            page.query_all("[[").await,
            Err(FacetError::Page(_))
        ));
    }
}
