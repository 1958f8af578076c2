//! Graceful shutdown for the replica.
//!
//! The RPC server and the pruning task each hold a receiver; SIGINT, SIGTERM
//! or a programmatic call notifies all of them.

use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A future that resolves once shutdown has been requested, including
    /// when it was requested before the call.
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // An error means the controller is gone, which also ends the wait.
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }

    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = signal::ctrl_c() => { info!("received SIGINT, shutting down"); }
            _ = terminate => { info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
