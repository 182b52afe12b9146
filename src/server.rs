use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api;
use crate::config::ServerConfig;
use crate::registry::ModelRegistry;

/// Load every configured model, then serve HTTP until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let registry = Arc::new(ModelRegistry::load(config)?);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    log::info!(
        "[PredictServer::Serve] Serving {} model(s) [{}] on http://{}",
        registry.len(),
        registry.names().join(", "),
        listener.local_addr().unwrap_or(addr)
    );

    axum::serve(listener, api::router(registry))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    log::info!("[PredictServer::Serve] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[PredictServer::Serve] Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
