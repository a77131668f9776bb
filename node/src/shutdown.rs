//! Graceful shutdown for the DAIV daemon.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to the RPC
//! server and any other task holding the protocol context.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio::sync::broadcast;

/// Coordinates shutdown across the daemon's tasks.
///
/// Tasks call [`ShutdownController::subscribe`] for a receiver or await
/// [`ShutdownController::triggered`]. Shutdown fires once, either from an OS
/// signal or programmatically; later triggers are ignored.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    fired: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: AtomicBool::new(false),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let _ = self.tx.send(());
        }
    }

    /// A future that resolves once shutdown has been triggered, suitable for
    /// `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn triggered(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        let already = self.is_triggered();
        async move {
            if !already {
                let _ = rx.recv().await;
            }
        }
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
