use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

const LOCAL_CONFIG: &str = "config/facetsync.yaml";

pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // stdout carries command output, so logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    installed.context("Failed to initialise logging")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: Option<PathBuf>,
}

/// Priority: `--config` > ./config/facetsync.yaml > ~/.config/facetsync/config.yaml.
/// Environment overrides are applied last.
pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let candidate = match config_path {
        Some(path) => Some(path.clone()),
        None => default_config_path(),
    };

    let mut loaded = match candidate {
        Some(path) if path.exists() => LoadedConfig {
            config: read_config(&path).await?,
            path: Some(path),
        },
        Some(path) if config_path.is_some() => {
            anyhow::bail!("Config file not found: {}", path.display())
        }
        other => {
            if let Some(path) = &other {
                warn!("Config file not found, using defaults: {}", path.display());
            }
            LoadedConfig {
                config: AppConfig::default(),
                path: None,
            }
        }
    };

    loaded.config.apply_env_overrides();
    Ok(loaded)
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|mut path| {
        path.push("facetsync");
        path.push("config.yaml");
        path
    })
}

async fn read_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;
    let config = AppConfig::from_yaml(&content).context("Failed to parse config file")?;
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}
