//! Graceful shutdown trigger for the server binary.

use std::future::Future;
use std::io;

use tracing::{error, info};

/// Resolve once `signal` fires.
///
/// If the signal listener cannot be installed the error is logged and this
/// never resolves, so the server keeps running instead of shutting down on
/// the spot.
pub async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_when_signal_fires() {
        let fired = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_shutdown(async { Ok(()) }),
        )
        .await;
        assert!(fired.is_ok());
    }

    #[tokio::test]
    async fn failed_listener_never_resolves() {
        let fired = tokio::time::timeout(
            Duration::from_millis(100),
            wait_for_shutdown(async { Err(io::Error::new(io::ErrorKind::Other, "no signals")) }),
        )
        .await;
        assert!(fired.is_err());
    }
}
