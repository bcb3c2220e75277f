use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::types::AppState;

mod auth;
mod canvas;
mod config;
mod courses;
mod db;
mod matcher;
mod secrets;
mod server;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(&config)?);

    // Expired token verifications are otherwise only evicted on lookup
    let cleanup_state = state.clone();
    let cleanup_period = config.auth_cache_ttl.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_period);
        loop {
            interval.tick().await;
            cleanup_state.auth.cleanup_cache();
        }
    });

    let router = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
