//! Replica Cache - inspection server
//!
//! Serves a cache-through adapter over an in-memory backing store and
//! exposes its cache over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use replica_cache::api::create_router;
use replica_cache::{AppState, CacheConfig, CacheThroughStore, MemoryBackingStore, ServerConfig};

/// Main entry point for the inspection server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache and server configuration from environment variables
/// 3. Build the adapter and warm the cache from the backing store
/// 4. Serve the router until SIGINT/SIGTERM
/// 5. Dispose the adapter
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "replica_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Replica Cache inspection server");

    let cache_config = CacheConfig::from_env();
    let server_config = ServerConfig::from_env();
    info!(
        "Configuration loaded: max_memory={}B, max_entries={}, default_ttl={}s, policy={:?}, port={}",
        cache_config.max_memory_bytes,
        cache_config.max_entries,
        cache_config.default_ttl.as_secs(),
        cache_config.policy,
        server_config.server_port
    );

    let node_id = std::env::var("NODE_ID").unwrap_or_else(|_| "local".to_string());
    let store = Arc::new(MemoryBackingStore::new(node_id));
    let adapter = CacheThroughStore::new(store, cache_config);
    adapter
        .initialize()
        .await
        .context("failed to initialize backing store")?;

    let state = AppState::new(adapter);
    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state
        .cache
        .dispose()
        .await
        .context("failed to dispose cache")?;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
