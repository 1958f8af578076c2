//! Proposal coordinator: the protocol's entry point on the proposing node.
//!
//! `propose` walks one operation through `pending → {committed, rejected}`:
//!
//! 1. derive an id from `(type, canonical data, timestamp, proposer)`,
//! 2. insert the operation as pending,
//! 3. fan a vote request out to every cluster member concurrently, each with
//!    its own timeout,
//! 4. verify every structurally valid answer,
//! 5. tally verified approvals against the quorum and resolve the operation.
//!
//! The coordinator never applies the business side effect; callers do that
//! when [`ProposalResult::success`] is true.

use quorum_crypto::truncated_hex_digest;
use quorum_types::{
    Clock, NodeId, OperationId, OperationStatus, OperationType, Timestamp, VoteRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::signing::{MissingSecretPolicy, Verification, VoteVerifier};
use crate::transport::{PeerTransport, TransportError, VoteRequest, VoteResponse};
use crate::{ClusterConfig, ConsensusError, Operation, OperationLog};

/// Reason attached to an operation that did not gather enough approvals.
pub const QUORUM_NOT_REACHED: &str = "quorum not reached";

/// Hex characters kept from the SHA-256 digest for an operation id.
const OPERATION_ID_HEX_LEN: usize = 16;

/// Attempts at finding an id not already in the local log.
const MAX_ID_ATTEMPTS: u32 = 8;

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Per-peer bound on a single vote request.
    pub vote_timeout: Duration,
    pub missing_secret_policy: MissingSecretPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            vote_timeout: Duration::from_secs(5),
            missing_secret_policy: MissingSecretPolicy::Accept,
        }
    }
}

/// Verdict returned to the caller of [`ProposalCoordinator::propose`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalResult {
    pub success: bool,
    pub operation_id: OperationId,
    pub votes: BTreeMap<String, VoteRecord>,
    pub approved: usize,
    pub quorum_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProposalResult {
    /// A result for a proposal that never reached the vote.
    pub fn failed(operation_id: OperationId, quorum_size: usize, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            operation_id,
            votes: BTreeMap::new(),
            approved: 0,
            quorum_size,
            reason: Some(reason.into()),
        }
    }
}

pub struct ProposalCoordinator {
    cluster: Arc<ClusterConfig>,
    transport: Arc<dyn PeerTransport>,
    verifier: Arc<dyn VoteVerifier>,
    log: Arc<OperationLog>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

impl ProposalCoordinator {
    pub fn new(
        cluster: Arc<ClusterConfig>,
        transport: Arc<dyn PeerTransport>,
        verifier: Arc<dyn VoteVerifier>,
        log: Arc<OperationLog>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            cluster,
            transport,
            verifier,
            log,
            clock,
            config,
        }
    }

    pub fn cluster(&self) -> &ClusterConfig {
        &self.cluster
    }

    pub fn log(&self) -> &Arc<OperationLog> {
        &self.log
    }

    /// Run one proposal to completion.
    ///
    /// Blocks until every peer has answered, failed, or timed out. Peer
    /// failures and bad signatures show up in the returned vote map; nothing
    /// here is reported as an error.
    pub async fn propose(&self, operation_type: OperationType, data: Value) -> ProposalResult {
        let quorum_size = self.cluster.quorum_size();
        let operation_id = match self.register(operation_type, &data) {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, %operation_type, "could not register proposal");
                let reason = e.to_string();
                let id = match e {
                    ConsensusError::DuplicateOperation(id) => id,
                    _ => OperationId::new(String::new()),
                };
                return ProposalResult::failed(id, quorum_size, reason);
            }
        };

        info!(%operation_id, %operation_type, "proposing operation");

        let request = VoteRequest {
            operation_id: operation_id.clone(),
            operation_type: operation_type.as_str().to_string(),
            operation_data: data,
            proposer: self.cluster.local().clone(),
        };
        let replies = self.collect_votes(request).await;
        let votes = self.verify_votes(&operation_id, replies).await;

        let approved = votes.values().filter(|v| v.is_approval()).count();
        let (status, reason) = if approved >= quorum_size {
            (OperationStatus::Committed, None)
        } else {
            (OperationStatus::Rejected, Some(QUORUM_NOT_REACHED.to_string()))
        };

        if let Err(e) = self.log.resolve(
            &operation_id,
            votes.clone(),
            status,
            reason.clone(),
            self.clock.now(),
        ) {
            error!(%operation_id, error = %e, "failed to record proposal outcome");
            return ProposalResult {
                success: false,
                operation_id,
                votes,
                approved,
                quorum_size,
                reason: Some(e.to_string()),
            };
        }

        let cluster_size = self.cluster.cluster_size();
        if status == OperationStatus::Committed {
            info!(%operation_id, approved, cluster_size, "operation committed");
        } else {
            warn!(
                %operation_id,
                approved,
                cluster_size,
                quorum_size,
                "operation rejected: {QUORUM_NOT_REACHED}"
            );
        }

        ProposalResult {
            success: status == OperationStatus::Committed,
            operation_id,
            votes,
            approved,
            quorum_size,
            reason,
        }
    }

    /// Lookup of an operation this node proposed.
    pub fn get_operation(&self, id: &OperationId) -> Option<Operation> {
        self.log.get(id)
    }

    /// Derive an id and insert the pending record, nudging the timestamp on
    /// the rare local collision so a resolved record is never overwritten.
    fn register(
        &self,
        operation_type: OperationType,
        data: &Value,
    ) -> Result<OperationId, ConsensusError> {
        let proposer = self.cluster.local();
        let mut at = self.clock.now();
        let mut last_error = ConsensusError::Other("no operation id attempted".into());

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = derive_operation_id(operation_type, data, at, proposer);
            let pending = Operation::pending(id.clone(), operation_type, data.clone(), proposer.clone(), at);
            match self.log.insert_pending(pending) {
                Ok(()) => return Ok(id),
                Err(e @ ConsensusError::DuplicateOperation(_)) => {
                    debug!(%id, "operation id collision, re-deriving");
                    at = at.saturating_add(Duration::from_nanos(1));
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error)
    }

    /// One task per peer, each bounded by the vote timeout; joined before
    /// returning so the total wait is one timeout, not one per peer.
    async fn collect_votes(
        &self,
        request: VoteRequest,
    ) -> Vec<(String, Result<VoteResponse, TransportError>)> {
        let request = Arc::new(request);
        let timeout = self.config.vote_timeout;
        let mut handles = Vec::with_capacity(self.cluster.cluster_size());

        for peer in self.cluster.peers() {
            let transport = Arc::clone(&self.transport);
            let request = Arc::clone(&request);
            let addr = peer.clone();

            let handle = tokio::spawn(async move {
                match tokio::time::timeout(timeout, transport.request_vote(&addr, &request)).await {
                    Ok(reply) => reply,
                    Err(_) => Err(TransportError::Timeout(format!(
                        "no vote within {}ms",
                        timeout.as_millis()
                    ))),
                }
            });
            handles.push((peer.clone(), handle));
        }

        let mut replies = Vec::with_capacity(handles.len());
        for (peer, handle) in handles {
            let reply = handle
                .await
                .unwrap_or_else(|e| Err(TransportError::Other(format!("vote task failed: {e}"))));
            replies.push((peer, reply));
        }
        replies
    }

    /// Fold replies into the vote map, keeping every voter's entry even when
    /// its vote does not count.
    ///
    /// Every reply is verified before any identity is assigned. A verified
    /// vote owns its voter's slot; a failed claim only lands there if no
    /// verified vote took it, and is otherwise recorded under the responding
    /// peer's address. A second verified claim to the same identity is also
    /// recorded under the peer's address.
    async fn verify_votes(
        &self,
        operation_id: &OperationId,
        replies: Vec<(String, Result<VoteResponse, TransportError>)>,
    ) -> BTreeMap<String, VoteRecord> {
        let mut votes = BTreeMap::new();
        let mut rejected = Vec::new();

        let mut verified = Vec::new();
        for (peer, reply) in replies {
            let response = match reply {
                Ok(response) => response,
                Err(e) => {
                    warn!(%operation_id, %peer, error = %e, "no vote from peer");
                    votes.insert(peer, VoteRecord::Unreachable);
                    continue;
                }
            };

            let voter = response.node.to_string();
            if response.operation_id.as_ref().is_some_and(|id| id != operation_id) {
                error!(
                    target: "security",
                    %operation_id,
                    %peer,
                    %voter,
                    "vote answers a different operation"
                );
                rejected.push((peer, voter));
                continue;
            }

            match self.check_vote(operation_id, &response).await {
                VoteRecord::InvalidSignature => rejected.push((peer, voter)),
                record => verified.push((peer, voter, record)),
            }
        }

        for (peer, voter, record) in verified {
            if votes.contains_key(&voter) {
                error!(
                    target: "security",
                    %operation_id,
                    %peer,
                    %voter,
                    "second vote claiming an identity that already voted"
                );
                votes.insert(peer, VoteRecord::InvalidSignature);
                continue;
            }
            debug!(%operation_id, %voter, vote = record.as_str(), "vote recorded");
            votes.insert(voter, record);
        }

        for (peer, voter) in rejected {
            let key = if votes.contains_key(&voter) { peer } else { voter };
            votes.insert(key, VoteRecord::InvalidSignature);
        }
        votes
    }

    async fn check_vote(&self, operation_id: &OperationId, response: &VoteResponse) -> VoteRecord {
        let verification = self
            .verifier
            .verify(operation_id, response.vote, &response.node, &response.signature)
            .await;

        match (verification, self.config.missing_secret_policy) {
            (Verification::Valid, _) => response.vote.into(),
            (Verification::Invalid, _) => {
                error!(
                    target: "security",
                    %operation_id,
                    voter = %response.node,
                    "vote signature mismatch, possible Byzantine behaviour"
                );
                VoteRecord::InvalidSignature
            }
            (Verification::Unverifiable, MissingSecretPolicy::Accept) => {
                warn!(
                    %operation_id,
                    voter = %response.node,
                    "no secret for voter, counting vote unverified"
                );
                response.vote.into()
            }
            (Verification::Unverifiable, MissingSecretPolicy::Reject) => {
                warn!(
                    %operation_id,
                    voter = %response.node,
                    "no secret for voter, discarding vote"
                );
                VoteRecord::InvalidSignature
            }
        }
    }
}

/// SHA-256 over `"{TYPE}:{canonical data}:{nanos}:{proposer}"`, truncated.
pub fn derive_operation_id(
    operation_type: OperationType,
    data: &Value,
    at: Timestamp,
    proposer: &NodeId,
) -> OperationId {
    let input = format!(
        "{}:{}:{}:{}",
        operation_type.as_str(),
        canonical_json(data),
        at.as_nanos(),
        proposer
    );
    OperationId::new(truncated_hex_digest(input.as_bytes(), OPERATION_ID_HEX_LEN))
}

/// Compact JSON with object keys sorted at every level.
///
/// `serde_json::Map` is a `BTreeMap` unless `preserve_order` is enabled, so
/// plain serialization is already canonical; `canonical_json_sorts_nested_keys`
/// breaks if that feature ever gets unified in.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}
