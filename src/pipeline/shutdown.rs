// src/pipeline/shutdown.rs

//! Shutdown watcher.
//!
//! Waits for the first interrupt-class signal and cancels the process-wide
//! token. In-flight fetches observe the token themselves; a commit that has
//! started always finishes.

use std::future::Future;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a task cancelling `token` on SIGINT (or SIGTERM on Unix).
pub fn spawn_watcher(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(watch(token, interrupt()))
}

/// Cancel `token` once `signal` resolves, unless it was cancelled first.
pub async fn watch<F>(token: CancellationToken, signal: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => {
            log::info!("Interrupt received, finishing current cycle and shutting down");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

/// Resolves on the first interrupt-class signal.
async fn interrupt() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
