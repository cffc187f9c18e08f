//! Global Insights - HTTP server entry point

use anyhow::Context;
use global_insights::api;
use global_insights::application::JobManager;
use global_insights::infrastructure::config::resolve_results_dir;
use global_insights::infrastructure::{
    init_logging, ConfigManager, HttpFetcher, ResultsStore, YahooQuoteProvider,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_manager = ConfigManager::new();
    let config = config_manager.load().await?;
    init_logging(&config.logging)?;

    info!("Starting Global Insights server...");

    // A relative results dir sits next to the config file.
    let config_dir = config_manager
        .config_path
        .parent()
        .unwrap_or_else(|| Path::new(""));
    let results_dir = resolve_results_dir(config_dir, &config.storage);
    let store = ResultsStore::initialize(results_dir)
        .await
        .context("Failed to initialize results store")?;
    let fetcher = Arc::new(HttpFetcher::new(config.crawler.clone())?);
    let quotes = Arc::new(YahooQuoteProvider::new()?);
    let manager = Arc::new(JobManager::new(store, fetcher, quotes));

    let app = api::router(manager);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid server host: {}", config.server.host))?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", error);
        return;
    }
    info!("Shutdown signal received");
}
