//! HTTP client for the vote RPC and liveness probe.

use async_trait::async_trait;
use quorum_consensus::{
    HealthProbe, NodeHealth, PeerTransport, TransportError, VoteRequest, VoteResponse,
};
use std::time::Duration;
use tracing::debug;

/// Default bound on one vote request.
pub const DEFAULT_VOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on one liveness probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Talks to other replicas over HTTP.
///
/// Sends `POST {peer}/consensus/vote` for votes and `GET {peer}/health` for
/// liveness. One pooled `reqwest::Client` is shared by every request.
#[derive(Clone)]
pub struct HttpPeerClient {
    http_client: reqwest::Client,
    vote_timeout: Duration,
    health_timeout: Duration,
}

impl HttpPeerClient {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeouts(DEFAULT_VOTE_TIMEOUT, DEFAULT_HEALTH_TIMEOUT)
    }

    pub fn with_timeouts(
        vote_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(vote_timeout))
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            vote_timeout,
            health_timeout,
        })
    }
}

fn endpoint(peer: &str, path: &str) -> String {
    format!("{}{}", peer.trim_end_matches('/'), path)
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl PeerTransport for HttpPeerClient {
    async fn request_vote(
        &self,
        peer: &str,
        request: &VoteRequest,
    ) -> Result<VoteResponse, TransportError> {
        let url = endpoint(peer, "/consensus/vote");
        let response = self
            .http_client
            .post(&url)
            .timeout(self.vote_timeout)
            .json(request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.json::<VoteResponse>().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::InvalidResponse(format!("failed to parse vote: {e}"))
            }
        })
    }
}

#[async_trait]
impl HealthProbe for HttpPeerClient {
    async fn probe(&self, peer: &str) -> NodeHealth {
        let url = endpoint(peer, "/health");
        match self
            .http_client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => NodeHealth::Healthy,
            Ok(response) => {
                debug!(%peer, status = %response.status(), "peer unhealthy");
                NodeHealth::Unhealthy
            }
            Err(e) => {
                debug!(%peer, error = %e, "peer unreachable");
                NodeHealth::Unreachable
            }
        }
    }
}
