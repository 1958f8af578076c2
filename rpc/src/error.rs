//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Operation not found")]
    OperationNotFound,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(String),

    #[error("metrics encoding failed: {0}")]
    Metrics(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::OperationNotFound => StatusCode::NOT_FOUND,
            RpcError::Bind { .. } | RpcError::Server(_) | RpcError::Metrics(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
