use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use facet_engine::{ApplyMode, ApplyOutcome};
use facetsync_core_types::FilterInput;
use tokio::fs;
use tracing::info;

use super::output::{emit, format_facets, OutputFormat};
use crate::config::AppConfig;
use crate::page::load_page;

#[derive(Args, Clone, Debug)]
pub struct ApplyArgs {
    /// Page fixture to apply the facets to
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Facet set or saved filter set (JSON)
    #[arg(long, value_name = "FILE")]
    pub filters: PathBuf,

    /// URL to report for the page, overriding the one it carries
    #[arg(long)]
    pub url: Option<String>,

    /// merge (keep active facets) or replace (clear them first)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<ApplyMode>,

    /// Write the resulting page state to this file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Print the per-facet report instead of the bare result
    #[arg(long)]
    pub report: bool,
}

fn parse_mode(raw: &str) -> Result<ApplyMode, String> {
    raw.parse().map_err(|err: facetsync_core_types::FacetError| err.to_string())
}

pub async fn cmd_apply(args: ApplyArgs, config: &AppConfig, output: OutputFormat) -> Result<()> {
    let raw = fs::read_to_string(&args.filters)
        .await
        .with_context(|| format!("failed to read {}", args.filters.display()))?;
    let input: FilterInput = serde_json::from_str(&raw)
        .with_context(|| format!("invalid filter set {}", args.filters.display()))?;
    let requested = input.into_facets();

    let loaded = load_page(&args.page, args.url.as_deref()).await?;
    let service = config.service()?;
    let mode = args.mode.unwrap_or(config.apply_mode);
    let outcome = service
        .apply_filters(loaded.page.as_ref(), &requested, mode)
        .await
        .with_context(|| format!("applying facets to {}", args.page.display()))?;

    if let Some(target) = &args.save {
        loaded.save(target).await?;
        info!(path = %target.display(), "saved resulting page state");
    }

    if args.report {
        emit(output, &outcome, render_report)
    } else {
        emit(output, &outcome.result, |result| {
            format!(
                "success: {}  partial: {}\n{}",
                result.success,
                result.partial_success,
                format_facets(&result.applied_filters)
            )
        })
    }
}

fn render_report(outcome: &ApplyOutcome) -> String {
    let mut lines = vec![format!(
        "success: {}  partial: {}  verified: {} ({:.0}% applied)",
        outcome.result.success,
        outcome.result.partial_success,
        outcome.verified,
        outcome.coverage * 100.0
    )];
    for group in &outcome.groups {
        lines.push(format!("{}:", group.kind.group_name()));
        for facet in &group.facets {
            lines.push(format!(
                "  {:<20} {:?} after {} attempt(s)",
                facet.label, facet.state, facet.attempts
            ));
        }
    }
    lines.join("\n")
}
