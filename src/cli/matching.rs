use anyhow::Result;
use clap::Args;
use facet_normalizer::{classify, fuzzy_match, LabelRules};
use facetsync_core_types::{FacetKind, SiteId};
use serde::Serialize;

use super::output::{emit, OutputFormat};
use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct MatchArgs {
    /// Requested label
    pub wanted: String,

    /// Label found on the page
    pub found: String,

    /// Use this site's label rules instead of the standard ones
    #[arg(long)]
    pub site: Option<String>,
}

#[derive(Debug, Serialize)]
struct LabelView {
    cleaned: String,
    kind: FacetKind,
}

#[derive(Debug, Serialize)]
struct MatchReport {
    matches: bool,
    wanted: LabelView,
    found: LabelView,
}

pub fn cmd_match(args: MatchArgs, config: &AppConfig, output: OutputFormat) -> Result<()> {
    let site_rules = match &args.site {
        Some(site) => {
            let adapter = config.registry()?.get(&SiteId::new(site.as_str()))?;
            Some(LabelRules::from_config(&adapter.profile().label_rules)?)
        }
        None => None,
    };
    let rules = site_rules.as_ref().unwrap_or_else(|| LabelRules::standard());

    let view = |raw: &str| {
        let cleaned = rules.clean(raw);
        LabelView {
            kind: classify(&cleaned, rules),
            cleaned,
        }
    };
    let wanted = view(&args.wanted);
    let found = view(&args.found);
    let report = MatchReport {
        matches: fuzzy_match(&wanted.cleaned, &found.cleaned),
        wanted,
        found,
    };

    emit(output, &report, |report: &MatchReport| {
        format!(
            "{} ({}) {} {} ({})",
            report.wanted.cleaned,
            report.wanted.kind,
            if report.matches { "~" } else { "!~" },
            report.found.cleaned,
            report.found.kind
        )
    })
}
