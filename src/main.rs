pub mod bundle;
pub mod config;
pub mod http;
pub mod maven;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bundle::dir_inventory::DirBundleInventory;
use crate::config::{ConfigHandle, RawConfig, RepoConfig};
use crate::http::AppState;

/// Serves the bundles installed in an OSGi container as a Maven repository
#[derive(Parser, Debug)]
#[command(name = "bundle-vault", version, about)]
struct Cli {
    /// TOML config file; re-read on SIGHUP
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// directory with the installed bundle jars, overrides `bundle_dir`
    #[arg(long)]
    bundle_dir: Option<PathBuf>,

    /// address to listen on, overrides `listen`
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bundle_vault=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut raw = match &cli.config {
        Some(path) => RawConfig::load(path)?,
        None => RawConfig::default(),
    };
    if let Some(bundle_dir) = cli.bundle_dir {
        raw.bundle_dir = bundle_dir;
    }
    if let Some(listen) = cli.listen {
        raw.listen = listen;
    }

    let (repository_path, dependencies_path) = raw.routes()?;
    let addr: SocketAddr = raw.listen.parse()
        .with_context(|| format!("invalid listen address {:?}", raw.listen))?;

    let config = Arc::new(ConfigHandle::new(RepoConfig::from_raw(&raw), cli.config.clone()));
    spawn_reload_on_hangup(config.clone())?;

    let state = AppState {
        inventory: Arc::new(DirBundleInventory::new(raw.bundle_dir.clone())),
        config,
    };
    let app = http::router(state, &repository_path, &dependencies_path);

    info!("serving bundles from {} on {}", raw.bundle_dir.display(), addr);
    info!("repository at {}, dependencies at {}", repository_path, dependencies_path);

    axum::Server::try_bind(&addr)
        .with_context(|| format!("binding {}", addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_hangup(config: Arc<ConfigHandle>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = config.reload() {
                error!("config reload failed, keeping the previous configuration: {}", e);
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_config: Arc<ConfigHandle>) -> anyhow::Result<()> {
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("listening for ctrl-c failed: {}", e);
        std::future::pending::<()>().await;
    }
}
