use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use popup_gateway::{Gateway, GatewayEvent};
use serde_json::{json, Value};
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::page::load_page;
use crate::session::PageSession;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Page fixture or HTML snapshot to serve requests against
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// URL to report for the page, overriding the one it carries
    #[arg(long)]
    pub url: Option<String>,

    /// Response timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write the page state here once stdin closes
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

pub async fn cmd_serve(args: ServeArgs, config: &AppConfig) -> Result<()> {
    let loaded = load_page(&args.page, args.url.as_deref()).await?;
    let mut gateway_config = config.gateway.clone();
    if let Some(ms) = args.timeout_ms {
        gateway_config.response_timeout_ms = ms;
    }

    let session = PageSession::new(config.service()?, loaded.page.clone(), config.apply_mode);
    let gateway = Arc::new(Gateway::spawn(Arc::new(session), gateway_config));
    let monitor = tokio::spawn(log_events(gateway.subscribe()));

    let (out_tx, mut out_rx) = mpsc::channel::<String>(32);
    let writer = tokio::spawn(async move {
        let mut out = stdout();
        while let Some(line) = out_rx.recv().await {
            out.write_all(line.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    info!(page = %args.page.display(), "serving requests on stdin");
    let mut lines = BufReader::new(stdin()).lines();
    let mut inflight = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let gateway = gateway.clone();
        let out = out_tx.clone();
        inflight.spawn(async move {
            let reply = answer_line(&gateway, &line).await;
            if out.send(reply).await.is_err() {
                warn!("stdout writer stopped, dropping reply");
            }
        });
    }
    while inflight.join_next().await.is_some() {}

    drop(out_tx);
    writer.await?.context("failed to write stdout")?;
    if let Ok(gateway) = Arc::try_unwrap(gateway) {
        gateway.shutdown().await;
    }
    monitor.abort();

    if let Some(target) = &args.save {
        loaded.save(target).await?;
    }
    Ok(())
}

/// Answers one request line. An `id` member, when present, is echoed back.
pub async fn answer_line(gateway: &Gateway, line: &str) -> String {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(err) => return json!({ "error": format!("invalid JSON: {err}") }).to_string(),
    };
    let id = raw.get("id").cloned();

    let mut reply = match gateway.handle_json(&raw).await {
        Ok(response) => serde_json::to_value(&response)
            .unwrap_or_else(|err| json!({ "error": format!("unencodable response: {err}") })),
        Err(err) => json!({ "error": err.to_string() }),
    };
    if let (Some(id), Some(object)) = (id, reply.as_object_mut()) {
        object.insert("id".to_string(), id);
    }
    reply.to_string()
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<GatewayEvent>) {
    loop {
        match events.recv().await {
            Ok(GatewayEvent::TimedOut { request, action }) => {
                warn!(%request, %action, "request timed out")
            }
            Ok(GatewayEvent::LateResultDiscarded {
                request,
                action,
                elapsed_ms,
            }) => info!(%request, %action, elapsed_ms, "late result discarded"),
            Ok(event) => debug!(?event, "gateway event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "gateway event monitor lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
