use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use facetsync_core_types::CurrentFilters;

use super::output::{emit, format_facets, OutputFormat};
use crate::config::AppConfig;
use crate::page::load_page;

#[derive(Args, Clone, Debug)]
pub struct ExtractArgs {
    /// Page fixture (.json) or saved HTML document (.html)
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// URL to report for the page, overriding the one it carries
    #[arg(long)]
    pub url: Option<String>,
}

pub async fn cmd_extract(args: ExtractArgs, config: &AppConfig, output: OutputFormat) -> Result<()> {
    let loaded = load_page(&args.page, args.url.as_deref()).await?;
    let service = config.service()?;
    let current = service
        .current_filters(loaded.page.as_ref())
        .await
        .with_context(|| format!("extracting facets from {}", args.page.display()))?;

    emit(output, &current, |current: &CurrentFilters| {
        format!("{}\n{}", current.url, format_facets(&current.data))
    })
}
