use anyhow::Result;
use clap::ValueEnum;
use facetsync_core_types::{FacetKind, FacetSet};
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Prints `value` in the requested format; `human` renders the default view.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, human: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Human => println!("{}", human(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

pub fn format_facets(facets: &FacetSet) -> String {
    FacetKind::ORDERED
        .iter()
        .map(|kind| {
            let labels = facets.labels(*kind);
            let rendered = if labels.is_empty() {
                "-".to_string()
            } else {
                labels.join(", ")
            };
            format!("  {:<7} {}", kind.group_name(), rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
