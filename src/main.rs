use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    facetsync_cli::cli::app::run().await
}
