//! Nullable secret store: an in-memory map that counts lookups.

use async_trait::async_trait;
use quorum_consensus::SecretProvider;
use quorum_crypto::NodeSecret;
use quorum_types::NodeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct NullSecretProvider {
    secrets: Mutex<HashMap<String, String>>,
    lookups: AtomicUsize,
}

impl NullSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue (or rotate) the secret for a node identity.
    pub fn set(&self, node: &str, secret: &str) {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.to_string(), secret.to_string());
    }

    /// Simulate the secret being revoked or the store losing it.
    pub fn remove(&self, node: &str) {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node);
    }

    /// Number of `secret_for` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretProvider for NullSecretProvider {
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let secrets = self.secrets.lock().unwrap_or_else(PoisonError::into_inner);
        secrets
            .get(node.as_str())
            .and_then(|secret| NodeSecret::try_from(secret.as_str()).ok())
    }
}
