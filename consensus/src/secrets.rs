//! Secret provider seam.
//!
//! The proposer needs every voter's secret to recompute vote MACs, and each
//! node needs its own to sign. Lookups never fail loudly: an unavailable store
//! and an unknown node both read as "no secret".

use async_trait::async_trait;
use quorum_crypto::NodeSecret;
use quorum_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// The signing secret issued to `node`, if any.
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret>;

    /// Forget anything cached for `node` (e.g. after a MAC mismatch that may
    /// stem from a rotated secret). No-op for uncached providers.
    async fn invalidate(&self, _node: &NodeId) {}
}

#[async_trait]
impl<T: SecretProvider + ?Sized> SecretProvider for Arc<T> {
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret> {
        (**self).secret_for(node).await
    }

    async fn invalidate(&self, node: &NodeId) {
        (**self).invalidate(node).await
    }
}

/// Secrets supplied up front, typically from the node's config file.
#[derive(Default)]
pub struct StaticSecretProvider {
    secrets: HashMap<NodeId, NodeSecret>,
}

impl StaticSecretProvider {
    pub fn new(secrets: HashMap<NodeId, NodeSecret>) -> Self {
        Self { secrets }
    }

    pub fn insert(&mut self, node: NodeId, secret: NodeSecret) {
        self.secrets.insert(node, secret);
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretProvider for StaticSecretProvider {
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret> {
        self.secrets.get(node).cloned()
    }
}

/// Memoises secrets found by an inner provider.
///
/// Misses are not cached, so a store that was briefly unavailable is asked
/// again on the next verification.
pub struct CachingSecretProvider<P> {
    inner: P,
    cache: RwLock<HashMap<NodeId, NodeSecret>>,
}

impl<P: SecretProvider> CachingSecretProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<P: SecretProvider> SecretProvider for CachingSecretProvider<P> {
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret> {
        if let Some(secret) = self.cache.read().await.get(node) {
            return Some(secret.clone());
        }
        let secret = self.inner.secret_for(node).await?;
        debug!(%node, "caching node secret");
        self.cache
            .write()
            .await
            .insert(node.clone(), secret.clone());
        Some(secret)
    }

    async fn invalidate(&self, node: &NodeId) {
        self.cache.write().await.remove(node);
        self.inner.invalidate(node).await;
    }
}
