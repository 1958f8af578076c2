//! Peer RPC seams and the vote wire shapes.

use async_trait::async_trait;
use quorum_types::{Decision, NodeId, OperationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Proposer → peer: "validate and vote on this operation".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub operation_id: OperationId,
    /// Kept as a string so peers can reject kinds they do not know.
    pub operation_type: String,
    pub operation_data: Value,
    pub proposer: NodeId,
}

/// Peer → proposer: a signed decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteResponse {
    /// Identity the voter claims; the signature must verify for it.
    pub node: NodeId,
    pub vote: Decision,
    /// Hex MAC, or the no-auth sentinel.
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<OperationId>,
}

/// Why a peer's vote could not be collected. All variants are recorded as
/// `unreachable`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("peer answered with HTTP status {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Ask the peer at base address `peer` for its vote.
    async fn request_vote(
        &self,
        peer: &str,
        request: &VoteRequest,
    ) -> Result<VoteResponse, TransportError>;
}

/// Liveness classification of one cluster member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeHealth {
    /// Liveness endpoint answered with a success status.
    Healthy,
    /// Reachable, but answered with a non-success status.
    Unhealthy,
    /// Timed out or refused the connection.
    Unreachable,
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, peer: &str) -> NodeHealth;
}
