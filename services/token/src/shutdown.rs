//! Graceful shutdown.
//!
//! The HTTP server stops accepting on SIGINT/SIGTERM and then gets a bounded
//! window to finish in-flight rotations.

use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Shutdown trigger for the server plus a receiver that observes it.
///
/// The returned future is handed to the server's graceful shutdown hook.
pub fn shutdown_channel() -> (impl Future<Output = ()> + Send + 'static, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    let trigger = async move {
        wait_for_signal().await;
        let _ = tx.send(true);
    };
    (trigger, rx)
}

/// Runs `server` to completion, but once shutdown has been signalled waits
/// at most `timeout` for it to drain.
pub async fn drain_with_timeout<F, E>(
    server: F,
    mut signalled: watch::Receiver<bool>,
    timeout: Duration,
) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
{
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => return result,
        _ = signalled.changed() => {}
    }

    match tokio::time::timeout(timeout, server).await {
        Ok(result) => {
            info!("Server drained");
            result
        }
        Err(_) => {
            warn!("Shutdown timeout reached, dropping open connections");
            Ok(())
        }
    }
}
