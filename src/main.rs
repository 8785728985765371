//! Cache Layer - HTTP server exposing the TTL cache and session store.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_layer::api::{create_router, AppState};
use cache_layer::{spawn_cleanup_task, Config};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the cache and the session store
/// 4. Start the expired-entry sweep unless disabled
/// 5. Serve the Axum router until SIGINT/SIGTERM
/// 6. Stop the sweep and close both stores
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_layer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cache layer server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, session_ttl={}s, sliding_sessions={}, port={}, cleanup_interval={}s",
        config.default_ttl,
        config.session_ttl,
        config.sliding_sessions,
        config.server_port,
        config.cleanup_interval
    );

    let state = AppState::from_config(&config)
        .await
        .context("failed to open cache stores")?;

    let cleanup_handle = if config.cleanup_interval > 0 {
        Some(spawn_cleanup_task(
            state.cache.clone(),
            state.sessions.clone(),
            config.cleanup_interval,
        ))
    } else {
        info!("Background cleanup disabled");
        None
    };

    let shutdown_state = state.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The sweep holds its own handles to both stores
    if let Some(handle) = cleanup_handle {
        handle.abort();
        let _ = handle.await;
        info!("Cleanup task stopped");
    }

    shutdown_state
        .close()
        .await
        .context("failed to close cache stores")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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
