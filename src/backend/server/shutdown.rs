/**
 * Graceful Shutdown
 *
 * The server stops accepting connections on SIGINT or SIGTERM, lets
 * in-flight requests finish, then persists the search indexes and the
 * driver cache.
 */

use tokio::signal;
use tracing::{error, info};

use crate::backend::server::state::AppState;

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

/// Write the search indexes and the driver cache to disk
pub async fn persist(state: &AppState) {
    match state.search.save(None).await {
        Ok(()) => info!("=> Search indexes saved"),
        Err(e) => error!("Failed to save search indexes: {}", e),
    }
    match state.drivers.die().await {
        Ok(()) => info!("=> Driver cache saved"),
        Err(e) => error!("Failed to save driver cache: {}", e),
    }
}
