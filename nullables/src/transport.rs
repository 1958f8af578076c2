//! Nullable peer transport: scripted vote replies, no sockets.

use async_trait::async_trait;
use quorum_consensus::{
    HmacVoteSigner, PeerTransport, TransportError, VoteCaster, VoteRequest, VoteResponse,
};
use quorum_crypto::NodeSecret;
use quorum_types::NodeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// How a scripted peer answers vote requests.
#[derive(Clone)]
pub enum PeerBehavior {
    /// Validate and sign like a real replica.
    Honest(Arc<VoteCaster>),
    /// Always answer with this exact response.
    Respond(VoteResponse),
    /// Fail the request with this error.
    Fail(TransportError),
    /// Never answer.
    Hang,
}

/// Unscripted peers fail with a connection error.
#[derive(Default)]
pub struct NullTransport {
    peers: Mutex<HashMap<String, PeerBehavior>>,
    requests: Mutex<Vec<(String, VoteRequest)>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, peer: &str, behavior: PeerBehavior) {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(peer.to_string(), behavior);
    }

    /// Script `peer` as an honest replica with identity `node` and an
    /// optional signing secret.
    ///
    /// # Panics
    /// On an invalid `node` or `secret`, so a misconfigured test fails here
    /// rather than as a later connection error.
    pub fn honest(&self, peer: &str, node: &str, secret: Option<&str>) {
        let node = NodeId::new(node)
            .unwrap_or_else(|e| panic!("invalid node id {node:?} scripted for {peer}: {e}"));
        let secret = secret.map(|s| {
            NodeSecret::try_from(s)
                .unwrap_or_else(|e| panic!("invalid secret scripted for {peer}: {e}"))
        });
        let caster = VoteCaster::new(node, Arc::new(HmacVoteSigner::new(secret)));
        self.set(peer, PeerBehavior::Honest(Arc::new(caster)));
    }

    /// Every request received so far, with the peer it was addressed to.
    pub fn requests(&self) -> Vec<(String, VoteRequest)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PeerTransport for NullTransport {
    async fn request_vote(
        &self,
        peer: &str,
        request: &VoteRequest,
    ) -> Result<VoteResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((peer.to_string(), request.clone()));

        let behavior = self
            .peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(peer)
            .cloned();

        match behavior {
            Some(PeerBehavior::Honest(caster)) => Ok(caster.cast_vote(request)),
            Some(PeerBehavior::Respond(response)) => Ok(response),
            Some(PeerBehavior::Fail(e)) => Err(e),
            Some(PeerBehavior::Hang) => {
                std::future::pending::<()>().await;
                Err(TransportError::Other("unreachable".into()))
            }
            None => Err(TransportError::Connect(format!("no route to {peer}"))),
        }
    }
}
