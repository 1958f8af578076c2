//! Consensus: quorum-based vote signing for mutating order operations.
//!
//! A proposer fans an operation out to every member of a small fixed cluster,
//! each member validates it and returns a MAC-signed approve/reject vote, and
//! the proposer commits the operation once `floor(2n/3) + 1` verified approvals
//! are in.
//!
//! ## Module overview
//!
//! - [`quorum`]: Quorum size and the immutable [`ClusterConfig`].
//! - [`validator`]: Deterministic per-operation-type validation rules.
//! - [`signing`]: Vote signer/verifier seams and their HMAC implementations.
//! - [`secrets`]: Secret provider seam, static and caching providers.
//! - [`transport`]: Vote RPC and liveness probe seams plus wire shapes.
//! - [`operation_log`]: Reader/writer-locked arena of proposed operations.
//! - [`coordinator`]: Proposal state machine: fan-out, verify, tally, resolve.
//! - [`health`]: Cluster liveness and structural quorum availability.
//! - [`voter`]: The vote-serving path peers invoke over RPC.
//! - [`service`]: Facade bundling the upward interface.
//! - [`error`]: Consensus error types.

pub mod coordinator;
pub mod error;
pub mod health;
pub mod operation_log;
pub mod quorum;
pub mod secrets;
pub mod service;
pub mod signing;
pub mod transport;
pub mod validator;
pub mod voter;

pub use coordinator::{CoordinatorConfig, ProposalCoordinator, ProposalResult, QUORUM_NOT_REACHED};
pub use error::ConsensusError;
pub use health::{ClusterHealthMonitor, ClusterStatus, NodeHealthEntry};
pub use operation_log::{Operation, OperationLog};
pub use quorum::{quorum_size, ClusterConfig};
pub use secrets::{CachingSecretProvider, SecretProvider, StaticSecretProvider};
pub use service::ConsensusService;
pub use signing::{
    HmacVoteSigner, HmacVoteVerifier, MissingSecretPolicy, Verification, VoteSigner,
    VoteVerifier,
};
pub use transport::{
    HealthProbe, NodeHealth, PeerTransport, TransportError, VoteRequest, VoteResponse,
};
pub use validator::{validate, ValidationError};
pub use voter::VoteCaster;
