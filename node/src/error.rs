use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("consensus error: {0}")]
    Consensus(#[from] quorum_consensus::ConsensusError),

    #[error("peer transport error: {0}")]
    Transport(#[from] quorum_consensus::TransportError),

    #[error("vault error: {0}")]
    Vault(#[from] quorum_network::VaultError),

    #[error("RPC server error: {0}")]
    Rpc(#[from] quorum_rpc::RpcError),

    #[error("logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
