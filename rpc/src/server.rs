//! Axum-based RPC server.

use axum::routing::{get, post};
use axum::Router;
use quorum_consensus::ConsensusService;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::RpcError;
use crate::handlers;
use crate::metrics::RpcMetrics;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConsensusService>,
    pub metrics: Arc<RpcMetrics>,
}

impl AppState {
    pub fn new(service: Arc<ConsensusService>) -> Self {
        Self {
            service,
            metrics: Arc::new(RpcMetrics::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/consensus/vote", post(handlers::vote))
        .route("/consensus/propose", post(handlers::propose))
        .route("/consensus/status", get(handlers::cluster_status))
        .route("/consensus/operations/:id", get(handlers::get_operation))
        .with_state(state)
}

pub struct RpcServer {
    pub listen_addr: String,
    pub state: AppState,
}

impl RpcServer {
    pub fn new(listen_addr: impl Into<String>, state: AppState) -> Self {
        Self {
            listen_addr: listen_addr.into(),
            state,
        }
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn start(&self) -> Result<(), RpcError> {
        let listener = self.bind().await?;
        self.serve(listener, std::future::pending()).await
    }

    pub async fn bind(&self) -> Result<TcpListener, RpcError> {
        TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|source| RpcError::Bind {
                addr: self.listen_addr.clone(),
                source,
            })
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!(%addr, node = %self.state.service.local_node(), "RPC server listening");
        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}
