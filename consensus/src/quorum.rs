//! Quorum calculation and cluster membership.

use quorum_types::NodeId;

use crate::ConsensusError;

/// Verified approvals needed to commit in a cluster of `cluster_size` nodes.
///
/// `floor(2n / 3) + 1`. Existing deployments depend on this exact formula; at
/// `n = 3` it demands unanimity rather than the classic `2f + 1` with `f = 1`.
pub fn quorum_size(cluster_size: usize) -> usize {
    (2 * cluster_size) / 3 + 1
}

/// Immutable per-node view of the cluster, created once at start-up.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    local: NodeId,
    peers: Vec<String>,
    quorum_size: usize,
}

impl ClusterConfig {
    /// `peers` are the base URLs of every member, this node included, in a
    /// fixed order.
    pub fn new(local: NodeId, peers: Vec<String>) -> Result<Self, ConsensusError> {
        if peers.is_empty() {
            return Err(ConsensusError::EmptyCluster);
        }
        let mut seen = std::collections::HashSet::new();
        for peer in &peers {
            if peer.trim().is_empty() {
                return Err(ConsensusError::InvalidConfig(
                    "peer address must not be empty".into(),
                ));
            }
            if !seen.insert(peer.trim_end_matches('/')) {
                return Err(ConsensusError::InvalidConfig(format!(
                    "duplicate peer address {peer}"
                )));
            }
        }
        let quorum_size = quorum_size(peers.len());
        Ok(Self {
            local,
            peers,
            quorum_size,
        })
    }

    pub fn local(&self) -> &NodeId {
        &self.local
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn cluster_size(&self) -> usize {
        self.peers.len()
    }

    pub fn quorum_size(&self) -> usize {
        self.quorum_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId::new("order-node-1:8002").unwrap()
    }

    #[test]
    fn quorum_formula_reference_values() {
        assert_eq!(quorum_size(1), 1);
        assert_eq!(quorum_size(3), 3);
        assert_eq!(quorum_size(4), 3);
        assert_eq!(quorum_size(7), 5);
    }

    #[test]
    fn config_caches_quorum() {
        let peers = vec![
            "http://order-node-1:8002".to_string(),
            "http://order-node-2:8012".to_string(),
            "http://order-node-3:8022".to_string(),
            "http://order-node-4:8032".to_string(),
        ];
        let config = ClusterConfig::new(node(), peers).unwrap();
        assert_eq!(config.cluster_size(), 4);
        assert_eq!(config.quorum_size(), 3);
        assert_eq!(config.local().as_str(), "order-node-1:8002");
    }

    #[test]
    fn empty_cluster_rejected() {
        assert!(matches!(
            ClusterConfig::new(node(), Vec::new()),
            Err(ConsensusError::EmptyCluster)
        ));
    }

    #[test]
    fn duplicate_peer_rejected() {
        let peers = vec!["http://a:1".to_string(), "http://a:1/".to_string()];
        assert!(matches!(
            ClusterConfig::new(node(), peers),
            Err(ConsensusError::InvalidConfig(_))
        ));
    }
}
