//! The vote-serving path: validate a peer's proposal and sign the verdict.
//!
//! Stateless apart from the signer; voters keep no record of proposals.

use quorum_types::NodeId;
use std::sync::Arc;
use tracing::info;

use crate::signing::VoteSigner;
use crate::transport::{VoteRequest, VoteResponse};
use crate::validator::validate;

pub struct VoteCaster {
    local: NodeId,
    signer: Arc<dyn VoteSigner>,
}

impl VoteCaster {
    pub fn new(local: NodeId, signer: Arc<dyn VoteSigner>) -> Self {
        Self { local, signer }
    }

    pub fn cast_vote(&self, request: &VoteRequest) -> VoteResponse {
        let decision = validate(&request.operation_type, &request.operation_data);
        let signature = self.signer.sign(&request.operation_id, decision, &self.local);
        info!(
            operation_id = %request.operation_id,
            proposer = %request.proposer,
            operation_type = %request.operation_type,
            %decision,
            "cast vote"
        );
        VoteResponse {
            node: self.local.clone(),
            vote: decision,
            signature,
            operation_id: Some(request.operation_id.clone()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.signer.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::HmacVoteSigner;
    use quorum_crypto::{verify_vote, NodeSecret, NO_AUTH_SIGNATURE};
    use quorum_types::{Decision, OperationId};
    use serde_json::json;

    fn request(operation_type: &str, data: serde_json::Value) -> VoteRequest {
        VoteRequest {
            operation_id: OperationId::new("feedfacecafebeef"),
            operation_type: operation_type.into(),
            operation_data: data,
            proposer: NodeId::new("order-node-1:8002").unwrap(),
        }
    }

    #[test]
    fn signed_approval() {
        let local = NodeId::new("order-node-2:8012").unwrap();
        let secret = NodeSecret::try_from("token-2").unwrap();
        let caster = VoteCaster::new(local.clone(), Arc::new(HmacVoteSigner::new(Some(secret.clone()))));

        let response = caster.cast_vote(&request("CANCEL_ORDER", json!({"order_id": "ORD-1"})));
        assert_eq!(response.node, local);
        assert_eq!(response.vote, Decision::Approve);
        assert!(verify_vote(
            &secret,
            "feedfacecafebeef",
            "approve",
            "order-node-2:8012",
            &response.signature
        ));
        assert!(caster.is_authenticated());
    }

    #[test]
    fn unknown_type_rejected_unsigned() {
        let caster = VoteCaster::new(
            NodeId::new("order-node-2:8012").unwrap(),
            Arc::new(HmacVoteSigner::new(None)),
        );
        let response = caster.cast_vote(&request("REFUND_ORDER", json!({"order_id": "ORD-1"})));
        assert_eq!(response.vote, Decision::Reject);
        assert_eq!(response.signature, NO_AUTH_SIGNATURE);
        assert_eq!(response.operation_id, Some(OperationId::new("feedfacecafebeef")));
    }
}
