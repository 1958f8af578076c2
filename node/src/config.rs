//! Replica configuration with TOML file support.

use quorum_consensus::{CoordinatorConfig, MissingSecretPolicy};
use quorum_network::DEFAULT_PATH_PREFIX;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{LogFormat, NodeError};

/// Configuration for one replica.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`], overridden by
/// CLI flags, or built programmatically in tests. Every field has a default,
/// so an empty file parses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's identity, `host:port`. Votes are signed under it.
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Address the HTTP server binds.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Base URLs of every cluster member, this node included.
    #[serde(default = "default_cluster_nodes")]
    pub cluster_nodes: Vec<String>,

    /// Bound on each peer's vote, in milliseconds.
    #[serde(default = "default_vote_timeout_ms")]
    pub vote_timeout_ms: u64,

    /// Bound on each liveness probe, in milliseconds.
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,

    #[serde(default)]
    pub missing_secret_policy: MissingSecretPolicy,

    /// Drop resolved operations older than this. Unset keeps them forever.
    #[serde(default)]
    pub operation_retention_secs: Option<u64>,

    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter, e.g. `"info"` or `"debug,security=error"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub vault: VaultConfig,

    /// `node_id -> secret`, used when Vault is not configured.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_vault_addr")]
    pub addr: String,

    /// Vault is disabled when no token is set.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_node_id() -> String {
    "order-node-1:8002".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8002".to_string()
}

fn default_cluster_nodes() -> Vec<String> {
    vec![
        "http://order-node-1:8002".to_string(),
        "http://order-node-2:8012".to_string(),
        "http://order-node-3:8022".to_string(),
    ]
}

fn default_vote_timeout_ms() -> u64 {
    5_000
}

fn default_health_timeout_ms() -> u64 {
    2_000
}

fn default_prune_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_vault_addr() -> String {
    "http://vault:8200".to_string()
}

fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject configurations the replica cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.node_id.trim().is_empty() {
            return Err(NodeError::Config("node_id must not be empty".into()));
        }
        if self.cluster_nodes.is_empty() {
            return Err(NodeError::Config("cluster_nodes must not be empty".into()));
        }
        if self.vote_timeout_ms == 0 || self.health_timeout_ms == 0 {
            return Err(NodeError::Config("timeouts must be non-zero".into()));
        }
        if self.operation_retention_secs.is_some() && self.prune_interval_secs == 0 {
            return Err(NodeError::Config(
                "prune_interval_secs must be non-zero when retention is set".into(),
            ));
        }
        Ok(())
    }

    pub fn vote_timeout(&self) -> Duration {
        Duration::from_millis(self.vote_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            vote_timeout: self.vote_timeout(),
            missing_secret_policy: self.missing_secret_policy,
        }
    }

    pub fn vault_enabled(&self) -> bool {
        self.vault
            .token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            listen_addr: default_listen_addr(),
            cluster_nodes: default_cluster_nodes(),
            vote_timeout_ms: default_vote_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            missing_secret_policy: MissingSecretPolicy::default(),
            vault: VaultConfig::default(),
            secrets: BTreeMap::new(),
            operation_retention_secs: None,
            prune_interval_secs: default_prune_interval_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            addr: default_vault_addr(),
            token: None,
            path_prefix: default_path_prefix(),
        }
    }
}
