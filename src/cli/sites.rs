use anyhow::Result;
use serde::Serialize;

use super::output::{emit, OutputFormat};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct SiteSummary {
    id: String,
    hosts: Vec<String>,
    anchors: Vec<String>,
    assume_ready_on_exhaustion: bool,
}

pub fn cmd_sites(config: &AppConfig, output: OutputFormat) -> Result<()> {
    let registry = config.registry()?;
    let mut sites = Vec::with_capacity(registry.len());
    for id in registry.site_ids() {
        let profile = registry.get(&id)?.profile().clone();
        sites.push(SiteSummary {
            id: profile.id.to_string(),
            hosts: profile.hosts,
            anchors: profile.anchors,
            assume_ready_on_exhaustion: profile.assume_ready_on_exhaustion,
        });
    }

    emit(output, &sites, |sites: &Vec<SiteSummary>| {
        sites
            .iter()
            .map(|site| {
                let relaxed = if site.assume_ready_on_exhaustion {
                    " (relaxed readiness)"
                } else {
                    ""
                };
                format!("{:<16} {}{}", site.id, site.hosts.join(", "), relaxed)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
