//! HashiCorp Vault KV v2 client.
//!
//! Node secrets live at `secret/data/{prefix}/{node-host}` under the
//! `auth_token` key. Every failure (no token, 404, transport error, odd body)
//! reads as "no secret" to callers; the detail goes to the log.

use async_trait::async_trait;
use quorum_consensus::SecretProvider;
use quorum_crypto::NodeSecret;
use quorum_types::NodeId;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::VaultError;

/// Default path under the KV mount holding per-node secrets.
pub const DEFAULT_PATH_PREFIX: &str = "bft-cluster";

/// Key of the signing secret inside a node's Vault entry.
pub const NODE_SECRET_KEY: &str = "auth_token";

const VAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// KV v2 read envelope: the secret's fields are at `data.data`.
#[derive(Debug, Deserialize)]
struct KvEnvelope {
    data: KvData,
}

#[derive(Debug, Deserialize)]
struct KvData {
    #[serde(default)]
    data: Map<String, Value>,
}

pub struct VaultClient {
    http_client: reqwest::Client,
    addr: String,
    token: Option<String>,
}

impl VaultClient {
    /// A blank token disables the client.
    pub fn new(addr: impl Into<String>, token: Option<String>) -> Result<Self, VaultError> {
        let addr = addr.into().trim_end_matches('/').to_string();
        let token = token.filter(|t| !t.trim().is_empty());
        let http_client = reqwest::Client::builder()
            .timeout(VAULT_TIMEOUT)
            .build()
            .map_err(|e| VaultError::Client(e.to_string()))?;
        if token.is_some() {
            info!(%addr, "vault client initialised");
        } else {
            warn!("no vault token provided, vault disabled");
        }
        Ok(Self {
            http_client,
            addr,
            token,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Fields of the secret at `path`, or `None` if it cannot be read.
    pub async fn read_secret(&self, path: &str) -> Option<Map<String, Value>> {
        match self.try_read_secret(path).await {
            Ok(fields) => Some(fields),
            Err(VaultError::Disabled) => {
                debug!(path, "vault disabled, skipping secret read");
                None
            }
            Err(e) => {
                error!(path, error = %e, "failed to read secret from vault");
                None
            }
        }
    }

    pub async fn try_read_secret(&self, path: &str) -> Result<Map<String, Value>, VaultError> {
        let token = self.token.as_deref().ok_or(VaultError::Disabled)?;
        let url = format!("{}/v1/secret/data/{}", self.addr, path.trim_start_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .header("X-Vault-Token", token)
            .send()
            .await
            .map_err(|e| VaultError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VaultError::Status(status.as_u16()));
        }

        let envelope: KvEnvelope = response
            .json()
            .await
            .map_err(|e| VaultError::InvalidResponse(e.to_string()))?;
        Ok(envelope.data.data)
    }

    /// The `auth_token` stored for `host` under `prefix`.
    pub async fn node_secret(&self, prefix: &str, host: &str) -> Option<String> {
        let path = format!("{}/{}", prefix.trim_end_matches('/'), host);
        let fields = self.read_secret(&path).await?;
        match fields.get(NODE_SECRET_KEY) {
            Some(Value::String(secret)) if !secret.is_empty() => Some(secret.clone()),
            _ => {
                warn!(%path, "vault entry has no {NODE_SECRET_KEY}");
                None
            }
        }
    }
}

/// Looks node secrets up in Vault by the host part of the node identity.
///
/// Uncached; wrap in a `CachingSecretProvider` for the verification path.
pub struct VaultSecretProvider {
    client: VaultClient,
    path_prefix: String,
}

impl VaultSecretProvider {
    pub fn new(client: VaultClient, path_prefix: impl Into<String>) -> Self {
        Self {
            client,
            path_prefix: path_prefix.into(),
        }
    }

    pub fn client(&self) -> &VaultClient {
        &self.client
    }
}

#[async_trait]
impl SecretProvider for VaultSecretProvider {
    async fn secret_for(&self, node: &NodeId) -> Option<NodeSecret> {
        let secret = self.client.node_secret(&self.path_prefix, node.host()).await?;
        NodeSecret::try_from(secret.as_str()).ok()
    }
}
