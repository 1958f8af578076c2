//! Facade exposing the upward interface to the order-management layer and
//! to the RPC server.

use quorum_types::{NodeId, OperationId, OperationType};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::{
    ClusterConfig, ClusterHealthMonitor, ClusterStatus, Operation, OperationLog,
    ProposalCoordinator, ProposalResult, VoteCaster, VoteRequest, VoteResponse,
};

pub struct ConsensusService {
    coordinator: Arc<ProposalCoordinator>,
    monitor: ClusterHealthMonitor,
    caster: VoteCaster,
}

impl ConsensusService {
    pub fn new(
        coordinator: Arc<ProposalCoordinator>,
        monitor: ClusterHealthMonitor,
        caster: VoteCaster,
    ) -> Self {
        Self {
            coordinator,
            monitor,
            caster,
        }
    }

    /// Propose an operation to the cluster.
    ///
    /// The proposal runs on its own task: dropping the returned future (a
    /// disconnected client, say) does not abort the fan-out or leave the
    /// operation pending.
    pub async fn propose(&self, operation_type: OperationType, data: Value) -> ProposalResult {
        let coordinator = Arc::clone(&self.coordinator);
        let quorum_size = self.coordinator.cluster().quorum_size();
        tokio::spawn(async move { coordinator.propose(operation_type, data).await })
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, %operation_type, "proposal task failed");
                ProposalResult::failed(OperationId::new(String::new()), quorum_size, e.to_string())
            })
    }

    pub fn get_operation(&self, id: &OperationId) -> Option<Operation> {
        self.coordinator.get_operation(id)
    }

    pub async fn cluster_status(&self) -> ClusterStatus {
        self.monitor.cluster_status().await
    }

    pub fn cast_vote(&self, request: &VoteRequest) -> VoteResponse {
        self.caster.cast_vote(request)
    }

    pub fn local_node(&self) -> &NodeId {
        self.coordinator.cluster().local()
    }

    pub fn cluster(&self) -> &ClusterConfig {
        self.coordinator.cluster()
    }

    pub fn operation_log(&self) -> &Arc<OperationLog> {
        self.coordinator.log()
    }

    /// Whether this node signs its votes with a real secret.
    pub fn is_authenticated(&self) -> bool {
        self.caster.is_authenticated()
    }
}
