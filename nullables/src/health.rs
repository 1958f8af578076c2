//! Nullable liveness probe: scripted health per peer.

use async_trait::async_trait;
use quorum_consensus::{HealthProbe, NodeHealth};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Peers default to unreachable until scripted otherwise.
#[derive(Default)]
pub struct NullHealthProbe {
    statuses: Mutex<HashMap<String, NodeHealth>>,
    hanging: Mutex<Vec<String>>,
}

impl NullHealthProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, peer: &str, health: NodeHealth) {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.to_string(), health);
    }

    /// Make probes of `peer` never complete.
    pub fn hang(&self, peer: &str) {
        self.hanging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(peer.to_string());
    }
}

#[async_trait]
impl HealthProbe for NullHealthProbe {
    async fn probe(&self, peer: &str) -> NodeHealth {
        let hangs = self
            .hanging
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|p| p == peer);
        if hangs {
            std::future::pending::<()>().await;
        }
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(peer)
            .copied()
            .unwrap_or(NodeHealth::Unreachable)
    }
}
