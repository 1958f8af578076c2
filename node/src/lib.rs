//! Consensus replica: wires the protocol engine to its HTTP surface.
//!
//! The node:
//! - Loads its identity, cluster membership and timeouts from TOML
//! - Fetches its own signing secret once at start-up
//! - Verifies peer votes against secrets from Vault or a static table
//! - Serves the vote RPC, proposals, health and metrics over HTTP
//! - Optionally prunes old resolved operations

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::{NodeConfig, VaultConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::ReplicaNode;
pub use shutdown::ShutdownController;
