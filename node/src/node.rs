//! The replica: every component wired together behind the HTTP server.

use quorum_consensus::{
    CachingSecretProvider, ClusterConfig, ClusterHealthMonitor, ConsensusService,
    HmacVoteSigner, HmacVoteVerifier, OperationLog, ProposalCoordinator, SecretProvider,
    StaticSecretProvider, VoteCaster,
};
use quorum_crypto::NodeSecret;
use quorum_network::{HttpPeerClient, VaultClient, VaultSecretProvider};
use quorum_rpc::{AppState, RpcServer};
use quorum_types::{Clock, NodeId, SystemClock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{NodeConfig, NodeError, ShutdownController};

pub struct ReplicaNode {
    config: NodeConfig,
    service: Arc<ConsensusService>,
    clock: Arc<dyn Clock>,
    server: RpcServer,
}

impl ReplicaNode {
    /// Build every component from `config`.
    ///
    /// This node's own secret is fetched here, once; a node without one
    /// still runs but signs its votes with the no-auth sentinel.
    pub async fn new(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let local = NodeId::new(config.node_id.clone())
            .map_err(|e| NodeError::Config(e.to_string()))?;
        let cluster = Arc::new(ClusterConfig::new(
            local.clone(),
            config.cluster_nodes.clone(),
        )?);

        let secrets = secret_provider(&config)?;
        let own_secret = secrets.secret_for(&local).await;
        if own_secret.is_some() {
            info!(node = %local, vault = config.vault_enabled(), "vote authentication enabled");
        } else {
            warn!(node = %local, "no signing secret for this node, votes will be unauthenticated");
        }

        let peers = Arc::new(HttpPeerClient::with_timeouts(
            config.vote_timeout(),
            config.health_timeout(),
        )?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let coordinator = ProposalCoordinator::new(
            Arc::clone(&cluster),
            peers.clone(),
            Arc::new(HmacVoteVerifier::new(secrets)),
            Arc::new(OperationLog::new()),
            Arc::clone(&clock),
            config.coordinator_config(),
        );
        let monitor = ClusterHealthMonitor::new(
            Arc::clone(&cluster),
            peers,
            config.health_timeout(),
        );
        let caster = VoteCaster::new(local, Arc::new(HmacVoteSigner::new(own_secret)));

        let service = Arc::new(ConsensusService::new(
            Arc::new(coordinator),
            monitor,
            caster,
        ));
        let server = RpcServer::new(
            config.listen_addr.clone(),
            AppState::new(Arc::clone(&service)),
        );

        info!(
            node = %cluster.local(),
            cluster_size = cluster.cluster_size(),
            quorum_size = cluster.quorum_size(),
            policy = ?config.missing_secret_policy,
            "replica initialised"
        );

        Ok(Self {
            config,
            service,
            clock,
            server,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<ConsensusService> {
        &self.service
    }

    pub fn local_node(&self) -> &NodeId {
        self.service.local_node()
    }

    /// Bind the configured listen address.
    pub async fn bind(&self) -> Result<TcpListener, NodeError> {
        Ok(self.server.bind().await?)
    }

    /// Bind and serve until `shutdown` fires.
    pub async fn run(self, shutdown: &ShutdownController) -> Result<(), NodeError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: &ShutdownController,
    ) -> Result<(), NodeError> {
        let pruner = self.config.operation_retention_secs.map(|retention| {
            spawn_pruner(
                Arc::clone(self.service.operation_log()),
                Arc::clone(&self.clock),
                Duration::from_secs(retention),
                Duration::from_secs(self.config.prune_interval_secs),
                shutdown.signal(),
            )
        });

        let served = self.server.serve(listener, shutdown.signal()).await;

        if let Some(pruner) = pruner {
            pruner.abort();
        }
        info!(node = %self.local_node(), "replica stopped");
        Ok(served?)
    }
}

/// Where peer secrets come from: Vault when a token is configured, the
/// static table otherwise.
fn secret_provider(config: &NodeConfig) -> Result<Arc<dyn SecretProvider>, NodeError> {
    if config.vault_enabled() {
        let client = VaultClient::new(config.vault.addr.clone(), config.vault.token.clone())?;
        let vault = VaultSecretProvider::new(client, config.vault.path_prefix.clone());
        return Ok(Arc::new(CachingSecretProvider::new(vault)));
    }

    let mut provider = StaticSecretProvider::default();
    for (node, secret) in &config.secrets {
        let node = NodeId::new(node.clone())
            .map_err(|e| NodeError::Config(format!("secrets: {e}")))?;
        let secret = NodeSecret::try_from(secret.as_str())
            .map_err(|e| NodeError::Config(format!("secrets.{node}: {e}")))?;
        provider.insert(node, secret);
    }
    debug!(count = provider.len(), "using static secret table");
    Ok(Arc::new(provider))
}

fn spawn_pruner(
    log: Arc<OperationLog>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    every: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    let cutoff = clock.now().saturating_sub(retention);
                    let pruned = log.prune_resolved_before(cutoff);
                    if pruned > 0 {
                        info!(pruned, remaining = log.len(), "pruned resolved operations");
                    }
                }
            }
        }
    })
}
