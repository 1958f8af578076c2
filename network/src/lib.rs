//! HTTP plumbing between replicas and towards the secret store.
//!
//! - [`peer_client`]: `reqwest` implementation of the consensus crate's
//!   [`PeerTransport`](quorum_consensus::PeerTransport) and
//!   [`HealthProbe`](quorum_consensus::HealthProbe) seams.
//! - [`vault`]: HashiCorp Vault KV v2 reader and the secret provider built on it.

pub mod error;
pub mod peer_client;
pub mod vault;

pub use error::VaultError;
pub use peer_client::HttpPeerClient;
pub use vault::{VaultClient, VaultSecretProvider, DEFAULT_PATH_PREFIX, NODE_SECRET_KEY};
