//! Cluster health monitor.
//!
//! Purely observational: probes every member's liveness endpoint and reports
//! whether enough of them are up for a quorum to be structurally reachable.
//! Proposals never consult it.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::transport::{HealthProbe, NodeHealth};
use crate::ClusterConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHealthEntry {
    pub node: String,
    pub status: NodeHealth,
}

/// Snapshot computed on demand; never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub cluster_size: usize,
    pub healthy_nodes: usize,
    pub quorum_size: usize,
    pub quorum_available: bool,
    pub nodes: Vec<NodeHealthEntry>,
}

pub struct ClusterHealthMonitor {
    cluster: Arc<ClusterConfig>,
    probe: Arc<dyn HealthProbe>,
    timeout: Duration,
}

impl ClusterHealthMonitor {
    pub fn new(cluster: Arc<ClusterConfig>, probe: Arc<dyn HealthProbe>, timeout: Duration) -> Self {
        Self {
            cluster,
            probe,
            timeout,
        }
    }

    /// Probe all members concurrently; a probe that outlives the timeout
    /// counts as unreachable.
    pub async fn cluster_status(&self) -> ClusterStatus {
        let probes = self.cluster.peers().iter().map(|peer| async move {
            let status = tokio::time::timeout(self.timeout, self.probe.probe(peer))
                .await
                .unwrap_or(NodeHealth::Unreachable);
            NodeHealthEntry {
                node: peer.clone(),
                status,
            }
        });
        let nodes = join_all(probes).await;

        let healthy_nodes = nodes
            .iter()
            .filter(|entry| entry.status == NodeHealth::Healthy)
            .count();
        let quorum_size = self.cluster.quorum_size();
        debug!(healthy_nodes, quorum_size, "cluster health probed");

        ClusterStatus {
            cluster_size: self.cluster.cluster_size(),
            healthy_nodes,
            quorum_size,
            quorum_available: healthy_nodes >= quorum_size,
            nodes,
        }
    }
}
