//! Vote signing and verification.
//!
//! The coordinator only talks to the [`VoteSigner`] and [`VoteVerifier`]
//! traits, so the shared-secret MAC below can be replaced by asymmetric
//! signatures without touching the proposal state machine.

use async_trait::async_trait;
use quorum_crypto::{sign_vote, verify_vote, NodeSecret, NO_AUTH_SIGNATURE};
use quorum_types::{Decision, NodeId, OperationId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::SecretProvider;

pub trait VoteSigner: Send + Sync {
    /// Sign `decision` on `operation_id` as `voter`.
    fn sign(&self, operation_id: &OperationId, decision: Decision, voter: &NodeId) -> String;

    /// Whether signatures carry real authentication (false when emitting the
    /// no-auth sentinel).
    fn is_authenticated(&self) -> bool;
}

/// Outcome of checking one vote's signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
    /// No key material for the claimed voter; the caller applies its
    /// [`MissingSecretPolicy`].
    Unverifiable,
}

#[async_trait]
pub trait VoteVerifier: Send + Sync {
    async fn verify(
        &self,
        operation_id: &OperationId,
        decision: Decision,
        voter: &NodeId,
        signature: &str,
    ) -> Verification;
}

/// What to do with a vote whose voter has no secret in the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSecretPolicy {
    /// Count the vote unverified, favouring availability.
    #[default]
    Accept,
    /// Record the vote as an invalid signature.
    Reject,
}

/// Signs this node's votes with its secret, or the no-auth sentinel without one.
pub struct HmacVoteSigner {
    secret: Option<NodeSecret>,
}

impl HmacVoteSigner {
    pub fn new(secret: Option<NodeSecret>) -> Self {
        Self { secret }
    }
}

impl VoteSigner for HmacVoteSigner {
    fn sign(&self, operation_id: &OperationId, decision: Decision, voter: &NodeId) -> String {
        let Some(secret) = &self.secret else {
            return NO_AUTH_SIGNATURE.to_string();
        };
        match sign_vote(secret, operation_id.as_str(), decision.as_str(), voter.as_str()) {
            Ok(signature) => signature,
            Err(e) => {
                error!(%operation_id, error = %e, "failed to sign vote, sending unsigned");
                NO_AUTH_SIGNATURE.to_string()
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        self.secret.is_some()
    }
}

/// Recomputes a voter's MAC from the secret held by the secret provider.
pub struct HmacVoteVerifier {
    secrets: Arc<dyn SecretProvider>,
}

impl HmacVoteVerifier {
    pub fn new(secrets: Arc<dyn SecretProvider>) -> Self {
        Self { secrets }
    }

    fn check(
        secret: &NodeSecret,
        operation_id: &OperationId,
        decision: Decision,
        voter: &NodeId,
        signature: &str,
    ) -> bool {
        verify_vote(
            secret,
            operation_id.as_str(),
            decision.as_str(),
            voter.as_str(),
            signature,
        )
    }
}

#[async_trait]
impl VoteVerifier for HmacVoteVerifier {
    async fn verify(
        &self,
        operation_id: &OperationId,
        decision: Decision,
        voter: &NodeId,
        signature: &str,
    ) -> Verification {
        let Some(secret) = self.secrets.secret_for(voter).await else {
            return Verification::Unverifiable;
        };
        if Self::check(&secret, operation_id, decision, voter, signature) {
            return Verification::Valid;
        }

        // The cached secret may be stale after a rotation; retry once against
        // a fresh read before calling it a mismatch.
        self.secrets.invalidate(voter).await;
        match self.secrets.secret_for(voter).await {
            Some(fresh) if Self::check(&fresh, operation_id, decision, voter, signature) => {
                debug!(%voter, "vote verified after secret refresh");
                Verification::Valid
            }
            _ => Verification::Invalid,
        }
    }
}
