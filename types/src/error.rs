//! Parse errors for the shared value types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("unknown operation type: {0}")]
    UnknownOperationType(String),

    #[error("unknown order status: {0}")]
    UnknownOrderStatus(String),

    #[error("unknown decision: {0}")]
    UnknownDecision(String),

    #[error("node identity must not be empty")]
    EmptyNodeId,
}
