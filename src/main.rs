//! Hub Cache Manager - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use hub_cache_manager::{
    api,
    config::ManagerConfig,
    diagnostics, metrics,
    models::{
        AcceleratedDownloader, Aria2Downloader, CacheLayout, DownloadManager, HfHubClient,
        HfHubSnapshotDownloader, Verifier,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser, Debug)]
#[command(name = "hub-cache-manager")]
#[command(about = "Local HuggingFace model cache manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override API port
    #[arg(long)]
    port: Option<u16>,

    /// Override cache root
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env is optional
    let dotenv = dotenvy::dotenv();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
    }

    tracing::info!("Starting Hub Cache Manager");
    if let Ok(path) = dotenv {
        tracing::debug!(path = ?path, "Loaded .env file");
    }

    // Load configuration
    let mut config = ManagerConfig::load(cli.config)?;

    // CLI overrides
    if let Some(port) = cli.port {
        config.api_port = port;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }

    config.validate()?;

    tracing::info!(
        api_port = config.api_port,
        cache_dir = ?config.cache_dir,
        hub_endpoint = %config.endpoint(),
        "Configuration loaded"
    );
    if config.hf_token.is_none() {
        tracing::warn!("No HF token configured, private and gated models will be unavailable");
    }

    let config = Arc::new(config);

    // Setup metrics
    let prometheus_handle = metrics::setup_metrics()?;

    // Probe host capabilities once
    let gpu = Arc::new(diagnostics::init().clone());
    let accelerated = Aria2Downloader::detect(&config)
        .map(|tool| Arc::new(tool) as Arc<dyn AcceleratedDownloader>);

    // Wire components
    let layout = CacheLayout::new(&config.cache_dir);
    let hub = Arc::new(HfHubClient::new(&config).context("Failed to build hub client")?);
    let fallback = Arc::new(
        HfHubSnapshotDownloader::new(&config).context("Failed to build snapshot downloader")?,
    );
    let downloads = Arc::new(DownloadManager::new(
        layout.clone(),
        hub.clone(),
        accelerated,
        fallback,
        config.endpoint().to_string(),
        config.hf_token.clone(),
    ));
    let verifier = Verifier::new(layout.clone()).with_config_loading(config.verify_load_config);

    // Setup API
    let app_state = api::AppState {
        config: config.clone(),
        layout,
        hub,
        downloads: downloads.clone(),
        verifier,
        gpu,
        prometheus_handle,
    };

    let app = api::create_router(app_state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API server")?;

    // Graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    tracing::info!("Shutting down...");

    // Partial downloads stay on disk for cleanup to find
    tracing::info!("Cancelling in-flight downloads");
    downloads.cancel_all();

    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
