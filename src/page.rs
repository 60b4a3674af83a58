//! Page handles loaded from disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use site_adapter::{HtmlSnapshotPage, InMemoryPage, Page, PageFixture};
use tokio::fs;
use url::Url;

/// A loaded page plus, for fixtures, the concrete handle so its state can be
/// written back.
pub struct LoadedPage {
    pub page: Arc<dyn Page>,
    pub fixture: Option<Arc<InMemoryPage>>,
    pub path: PathBuf,
}

impl LoadedPage {
    pub async fn save(&self, target: &Path) -> Result<()> {
        let Some(fixture) = &self.fixture else {
            bail!("{} is a read-only HTML snapshot", self.path.display());
        };
        let json = serde_json::to_string_pretty(&fixture.fixture())?;
        fs::write(target, json)
            .await
            .with_context(|| format!("failed to write {}", target.display()))
    }
}

/// `.json` files are page fixtures; `.html`/`.htm` files are read-only
/// snapshots whose URL comes from `url`, the document itself or the path.
pub async fn load_page(path: &Path, url: Option<&str>) -> Result<LoadedPage> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read page {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => {
            let mut fixture: PageFixture = serde_json::from_str(&raw)
                .with_context(|| format!("invalid page fixture {}", path.display()))?;
            if let Some(url) = url {
                fixture.url = url.to_string();
            }
            let page = Arc::new(InMemoryPage::new(fixture));
            Ok(LoadedPage {
                page: page.clone(),
                fixture: Some(page),
                path: path.to_path_buf(),
            })
        }
        Some("html") | Some("htm") => {
            let page = match url {
                Some(url) => HtmlSnapshotPage::new(url, raw),
                None => HtmlSnapshotPage::with_discovered_url(file_url(path)?, raw),
            };
            Ok(LoadedPage {
                page: Arc::new(page),
                fixture: None,
                path: path.to_path_buf(),
            })
        }
        _ => bail!(
            "unsupported page file {} (expected .json or .html)",
            path.display()
        ),
    }
}

fn file_url(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("cannot resolve working directory")?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| anyhow::anyhow!("cannot express {} as a URL", absolute.display()))
}
