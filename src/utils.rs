//! Process-level helpers.

use std::future::Future;
use std::time::Duration;

use tokio::signal;
use tracing::{error, warn};

/// Resolve once the process is asked to stop (Ctrl+C or SIGTERM).
///
/// A signal source that cannot be installed is logged and ignored; the other
/// one still triggers shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

/// Drive `drain` to completion, giving up after `grace`.
///
/// Returns `true` if `drain` finished in time.
pub async fn drain_within<F>(grace: Duration, drain: F) -> bool
where
    F: Future<Output = ()>,
{
    match tokio::time::timeout(grace, drain).await {
        Ok(()) => true,
        Err(_) => {
            warn!(
                grace_ms = grace.as_millis(),
                "Shutdown grace period elapsed with work still in flight"
            );
            false
        }
    }
}
