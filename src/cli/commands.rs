use clap::Subcommand;

use super::apply::ApplyArgs;
use super::extract::ExtractArgs;
use super::matching::MatchArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Read the facets currently applied on a page
    Extract(ExtractArgs),

    /// Apply a facet set to a page
    Apply(ApplyArgs),

    /// Answer popup requests as JSON lines on stdin/stdout
    Serve(ServeArgs),

    /// List the storefronts with a registered adapter
    Sites,

    /// Compare two labels the way the adapters do
    Match(MatchArgs),
}
