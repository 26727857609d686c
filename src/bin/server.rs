//! Price comparison HTTP service.
//!
//! Reads its configuration from the environment, connects to Redis (running
//! uncached if Redis is unreachable), and serves `/search` plus the static
//! front end until Ctrl-C.

use std::sync::Arc;

use pricehound::{ServerConfig, server, telemetry};
use pricehound_search::{Orchestrator, ProductCache};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init()?;
    tracing::info!("pricehound-server starting");

    let config = ServerConfig::from_env()?;
    let search_config = config.search_config();

    let cache = ProductCache::connect(&config.redis_settings(), search_config.cache_ttl()).await;
    let orchestrator = Arc::new(Orchestrator::marketplaces(search_config, cache)?);

    match orchestrator.primary().check_cookie_snapshot().await {
        Ok(count) => tracing::info!(cookies = count, "ozon cookie snapshot loaded"),
        Err(e) => tracing::warn!(error = %e, "ozon searches will fail until the cookie snapshot is fixed"),
    }

    let app = server::router(Arc::clone(&orchestrator), &config.static_dir);
    let listener = TcpListener::bind(config.bind_addr())
        .await
        .map_err(|e| anyhow::anyhow!("bind {} failed: {e}", config.bind_addr()))?;

    let on_shutdown = Arc::clone(&orchestrator);
    server::serve(listener, app, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown requested, cancelling in-flight searches");
        on_shutdown.shutdown();
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "pricehound-server exited with error");
        anyhow::anyhow!("pricehound-server failed: {e}")
    })?;

    tracing::info!("pricehound-server shut down cleanly");
    Ok(())
}
