use anyhow::Result;

use super::apply::cmd_apply;
use super::commands::Commands;
use super::env::CliArgs;
use super::extract::cmd_extract;
use super::matching::cmd_match;
use super::serve::cmd_serve;
use super::sites::cmd_sites;
use crate::config::AppConfig;

pub async fn dispatch(cli: &CliArgs, config: &AppConfig) -> Result<()> {
    match cli.command.clone() {
        Commands::Extract(args) => cmd_extract(args, config, cli.output).await,
        Commands::Apply(args) => cmd_apply(args, config, cli.output).await,
        Commands::Serve(args) => cmd_serve(args, config).await,
        Commands::Sites => cmd_sites(config, cli.output),
        Commands::Match(args) => cmd_match(args, config, cli.output),
    }
}
