//! Prometheus metrics for the consensus replica.
//!
//! [`RpcMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};
use quorum_consensus::ProposalResult;
use quorum_types::VoteRecord;

use crate::RpcError;

pub struct RpcMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Proposals this node initiated.
    pub proposals: IntCounter,
    pub committed: IntCounter,
    pub rejected: IntCounter,
    /// Votes this node served to proposing peers.
    pub votes_cast: IntCounter,
    /// Peer votes recorded as `invalid-signature` in this node's proposals.
    pub invalid_signatures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// 1 when the last cluster probe found enough healthy members for a quorum.
    pub quorum_available: IntGauge,
}

impl RpcMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let proposals = register_int_counter_with_registry!(
            Opts::new("quorum_proposals_total", "Total consensus proposals"),
            registry
        )
        .expect("failed to register proposals counter");

        let committed = register_int_counter_with_registry!(
            Opts::new("quorum_operations_committed_total", "Total committed operations"),
            registry
        )
        .expect("failed to register committed counter");

        let rejected = register_int_counter_with_registry!(
            Opts::new("quorum_operations_rejected_total", "Total rejected operations"),
            registry
        )
        .expect("failed to register rejected counter");

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("quorum_votes_cast_total", "Total votes served to peers"),
            registry
        )
        .expect("failed to register votes_cast counter");

        let invalid_signatures = register_int_counter_with_registry!(
            Opts::new(
                "quorum_invalid_signatures_total",
                "Peer votes whose signature did not verify"
            ),
            registry
        )
        .expect("failed to register invalid_signatures counter");

        let quorum_available = register_int_gauge_with_registry!(
            Opts::new(
                "quorum_cluster_quorum_available",
                "Whether enough cluster members are healthy to reach quorum"
            ),
            registry
        )
        .expect("failed to register quorum_available gauge");

        Self {
            registry,
            proposals,
            committed,
            rejected,
            votes_cast,
            invalid_signatures,
            quorum_available,
        }
    }

    /// Account for one finished proposal.
    pub fn observe_proposal(&self, result: &ProposalResult) {
        self.proposals.inc();
        if result.success {
            self.committed.inc();
        } else {
            self.rejected.inc();
        }
        let invalid = result
            .votes
            .values()
            .filter(|v| **v == VoteRecord::InvalidSignature)
            .count();
        self.invalid_signatures.inc_by(invalid as u64);
    }

    /// Render every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, RpcError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| RpcError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| RpcError::Metrics(e.to_string()))
    }
}

impl Default for RpcMetrics {
    fn default() -> Self {
        Self::new()
    }
}
