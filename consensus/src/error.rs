use quorum_types::{OperationId, OperationStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("cluster must contain at least one node")]
    EmptyCluster,

    #[error("invalid cluster configuration: {0}")]
    InvalidConfig(String),

    #[error("operation {0} not found")]
    OperationNotFound(OperationId),

    #[error("operation {0} already exists")]
    DuplicateOperation(OperationId),

    #[error("operation {id} already resolved as {status:?}")]
    AlreadyResolved {
        id: OperationId,
        status: OperationStatus,
    },

    #[error("cannot resolve operation {0} back to pending")]
    InvalidTransition(OperationId),

    #[error("{0}")]
    Other(String),
}
