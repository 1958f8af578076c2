//! HTTP server for a consensus replica.
//!
//! Provides endpoints for:
//! - Serving votes to proposing peers (`POST /consensus/vote`)
//! - Proposing operations from an out-of-process caller (`POST /consensus/propose`)
//! - Operation lookup and cluster status
//! - Liveness (`GET /health`) and Prometheus metrics (`GET /metrics`)

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use error::RpcError;
pub use metrics::RpcMetrics;
pub use server::{router, AppState, RpcServer};
