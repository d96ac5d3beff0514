//! Server entry point.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use todograph_core::db::open_db;
use todograph_core::init_logging;
use todograph_server::{router, AppState, PexelsImageProvider, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "todograph-server", version, about = "Todo dependency graph server")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the configured listen address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    init_logging(&config.logging()).context("failed to initialize logging")?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    let images = config
        .pexels_api_key
        .as_deref()
        .map(|key| PexelsImageProvider::new(key, config.image_timeout()))
        .transpose()
        .context("failed to build image client")?;
    let images_enabled = images.is_some();

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind `{}`", config.bind))?;
    info!(
        "event=server_start module=server status=ok bind={} db_path={} images_enabled={}",
        config.bind,
        config.db_path.display(),
        images_enabled
    );

    axum::serve(listener, router(AppState::new(conn, images)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("event=server_stop module=server status=error error={err}");
    }
}
