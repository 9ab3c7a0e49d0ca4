//! OS signal handling

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `shutdown` on SIGINT, or SIGTERM on Unix
pub fn spawn_signal_watcher(shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown.cancelled() => return,
            signal = wait_for_signal() => info!(signal, "Shutdown signal received"),
        }
        shutdown.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            return wait_for_interrupt().await;
        }
    };

    tokio::select! {
        name = wait_for_interrupt() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_interrupt().await
}

async fn wait_for_interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
