//! Fundamental types for the quorum voting protocol.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: node identities, operation ids and kinds, vote decisions,
//! operation status and timestamps.

pub mod error;
pub mod node;
pub mod operation;
pub mod time;
pub mod vote;

pub use error::TypesError;
pub use node::NodeId;
pub use operation::{OperationId, OperationStatus, OperationType, OrderStatus};
pub use time::{Clock, SystemClock, Timestamp};
pub use vote::{Decision, VoteRecord};
