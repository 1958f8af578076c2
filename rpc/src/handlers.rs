//! Request handlers and the request/response bodies they exchange.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use quorum_consensus::{ClusterStatus, Operation, ProposalResult, VoteRequest, VoteResponse};
use quorum_types::{OperationId, OperationType, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::server::AppState;
use crate::RpcError;

// ── Proposals ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct ProposeRequest {
    pub operation_type: String,
    pub operation_data: Value,
}

// ── Liveness ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node: String,
    /// Whether this node signs its votes with a secret from the store.
    pub vault_auth: bool,
    /// Unix seconds with fractional part.
    pub timestamp: f64,
}

fn bad_body(rejection: JsonRejection) -> RpcError {
    RpcError::InvalidRequest(format!("Missing required fields: {}", rejection.body_text()))
}

/// `POST /consensus/vote`: validate a peer's proposal and return a signed vote.
pub async fn vote(
    State(state): State<AppState>,
    body: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<VoteResponse>, RpcError> {
    let Json(request) = body.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "malformed vote request");
        bad_body(rejection)
    })?;
    let response = state.service.cast_vote(&request);
    state.metrics.votes_cast.inc();
    Ok(Json(response))
}

/// `POST /consensus/propose`: run a proposal on behalf of the caller.
pub async fn propose(
    State(state): State<AppState>,
    body: Result<Json<ProposeRequest>, JsonRejection>,
) -> Result<Json<ProposalResult>, RpcError> {
    let Json(request) = body.map_err(bad_body)?;
    let operation_type = request
        .operation_type
        .parse::<OperationType>()
        .map_err(|e| RpcError::InvalidRequest(e.to_string()))?;

    let result = state
        .service
        .propose(operation_type, request.operation_data)
        .await;
    state.metrics.observe_proposal(&result);
    Ok(Json(result))
}

/// `GET /consensus/status`
pub async fn cluster_status(State(state): State<AppState>) -> Json<ClusterStatus> {
    let status = state.service.cluster_status().await;
    state
        .metrics
        .quorum_available
        .set(i64::from(status.quorum_available));
    Json(status)
}

/// `GET /consensus/operations/{id}`
pub async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Operation>, RpcError> {
    let id = OperationId::new(id);
    match state.service.get_operation(&id) {
        Some(operation) => Ok(Json(operation)),
        None => {
            debug!(operation_id = %id, "operation lookup missed");
            Err(RpcError::OperationNotFound)
        }
    }
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Timestamp::now();
    Json(HealthResponse {
        status: "healthy".into(),
        node: state.service.local_node().to_string(),
        vault_auth: state.service.is_authenticated(),
        timestamp: now.as_nanos() as f64 / 1e9,
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let body = state.metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
