//! Proposal pipeline tests: coordinator + verifier + operation log wired to
//! nullable peers, exercising the full propose → vote → verify → tally path
//! without sockets.

use quorum_consensus::{
    ClusterConfig, ClusterHealthMonitor, ConsensusService, CoordinatorConfig, HmacVoteSigner,
    HmacVoteVerifier, MissingSecretPolicy, NodeHealth, OperationLog, PeerTransport,
    ProposalCoordinator, TransportError, VoteCaster, VoteResponse, QUORUM_NOT_REACHED,
};
use quorum_crypto::{NodeSecret, NO_AUTH_SIGNATURE};
use quorum_nullables::{NullClock, NullHealthProbe, NullSecretProvider, NullTransport, PeerBehavior};
use quorum_types::{Decision, NodeId, OperationStatus, OperationType, VoteRecord};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PEERS: [&str; 3] = ["http://n1:8002", "http://n2:8012", "http://n3:8022"];
const NODES: [&str; 3] = ["n1:8002", "n2:8012", "n3:8022"];
const SECRETS: [&str; 3] = ["token-1", "token-2", "token-3"];

struct Harness {
    transport: Arc<NullTransport>,
    secrets: Arc<NullSecretProvider>,
    log: Arc<OperationLog>,
    coordinator: ProposalCoordinator,
}

fn cluster() -> Arc<ClusterConfig> {
    let local = NodeId::new(NODES[0]).unwrap();
    Arc::new(ClusterConfig::new(local, PEERS.iter().map(|p| p.to_string()).collect()).unwrap())
}

/// Three honest, authenticated replicas with every secret in the store.
fn honest_cluster(config: CoordinatorConfig) -> Harness {
    let transport = Arc::new(NullTransport::new());
    let secrets = Arc::new(NullSecretProvider::new());
    for i in 0..3 {
        transport.honest(PEERS[i], NODES[i], Some(SECRETS[i]));
        secrets.set(NODES[i], SECRETS[i]);
    }
    let log = Arc::new(OperationLog::new());
    let coordinator = ProposalCoordinator::new(
        cluster(),
        transport.clone(),
        Arc::new(HmacVoteVerifier::new(secrets.clone())),
        Arc::clone(&log),
        Arc::new(NullClock::default()),
        config,
    );
    Harness {
        transport,
        secrets,
        log,
        coordinator,
    }
}

fn create_order() -> Value {
    json!({
        "customer_id": "CUST-7",
        "items": [{"product_id": "SKU-1", "quantity": 2}],
    })
}

fn caster(node: &str, secret: Option<&str>) -> Arc<VoteCaster> {
    let secret = secret.map(|s| NodeSecret::try_from(s).unwrap());
    Arc::new(VoteCaster::new(
        NodeId::new(node).unwrap(),
        Arc::new(HmacVoteSigner::new(secret)),
    ))
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unanimous_cluster_commits() {
    let h = honest_cluster(CoordinatorConfig::default());

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(result.success);
    assert_eq!(result.approved, 3);
    assert_eq!(result.quorum_size, 3);
    assert_eq!(result.reason, None);
    assert_eq!(result.votes.len(), 3);
    for node in NODES {
        assert_eq!(result.votes[node], VoteRecord::Approve);
    }

    let stored = h.coordinator.get_operation(&result.operation_id).unwrap();
    assert_eq!(stored.status, OperationStatus::Committed);
    assert_eq!(stored.votes, result.votes);
    assert!(stored.resolved_at.is_some());
    assert_eq!(h.transport.requests().len(), 3);
}

#[tokio::test]
async fn every_peer_receives_the_same_request() {
    let h = honest_cluster(CoordinatorConfig::default());
    let result = h
        .coordinator
        .propose(OperationType::CancelOrder, json!({"order_id": "ORD-9"}))
        .await;

    let requests = h.transport.requests();
    let mut addressed: Vec<&str> = requests.iter().map(|(peer, _)| peer.as_str()).collect();
    addressed.sort_unstable();
    assert_eq!(addressed, PEERS);
    for (_, request) in &requests {
        assert_eq!(request.operation_id, result.operation_id);
        assert_eq!(request.operation_type, "CANCEL_ORDER");
        assert_eq!(request.proposer.as_str(), NODES[0]);
    }
}

// ---------------------------------------------------------------------------
// 2. Faulty peers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_peer_blocks_quorum_of_three() {
    let h = honest_cluster(CoordinatorConfig::default());
    h.transport.set(
        PEERS[2],
        PeerBehavior::Fail(TransportError::Connect("connection refused".into())),
    );

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(!result.success);
    assert_eq!(result.approved, 2);
    assert_eq!(result.reason.as_deref(), Some(QUORUM_NOT_REACHED));
    assert_eq!(result.votes[PEERS[2]], VoteRecord::Unreachable);

    let stored = h.log.get(&result.operation_id).unwrap();
    assert_eq!(stored.status, OperationStatus::Rejected);
    assert_eq!(stored.reason.as_deref(), Some(QUORUM_NOT_REACHED));
}

#[tokio::test]
async fn tampered_signature_is_not_counted() {
    let h = honest_cluster(CoordinatorConfig::default());
    h.transport.set(
        PEERS[1],
        PeerBehavior::Respond(VoteResponse {
            node: NodeId::new(NODES[1]).unwrap(),
            vote: Decision::Approve,
            signature: "00".repeat(32),
            operation_id: None,
        }),
    );

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(!result.success);
    assert_eq!(result.approved, 2);
    assert_eq!(result.votes[NODES[1]], VoteRecord::InvalidSignature);
}

#[tokio::test]
async fn impersonating_an_already_counted_voter_is_flagged() {
    let h = honest_cluster(CoordinatorConfig::default());
    // Peer 3 answers with peer 1's identity and a vote signed by peer 1's key.
    h.transport
        .set(PEERS[2], PeerBehavior::Honest(caster(NODES[0], Some(SECRETS[0]))));

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(!result.success);
    assert_eq!(result.approved, 2);
    assert_eq!(result.votes[NODES[0]], VoteRecord::Approve);
    assert_eq!(result.votes[PEERS[2]], VoteRecord::InvalidSignature);
}

#[tokio::test]
async fn forged_claim_ahead_of_the_real_voter_does_not_displace_it() {
    // Four replicas, quorum of three. The first peer to answer claims the
    // second replica's identity with a garbage signature.
    let peers = ["http://m:1", "http://a:2", "http://b:3", "http://c:4"];
    let nodes = ["m:1", "a:2", "b:3", "c:4"];
    let secrets = ["token-m", "token-a", "token-b", "token-c"];

    let transport = Arc::new(NullTransport::new());
    let store = Arc::new(NullSecretProvider::new());
    for i in 0..4 {
        transport.honest(peers[i], nodes[i], Some(secrets[i]));
        store.set(nodes[i], secrets[i]);
    }
    transport.set(
        peers[0],
        PeerBehavior::Respond(VoteResponse {
            node: NodeId::new(nodes[1]).unwrap(),
            vote: Decision::Approve,
            signature: "00".repeat(32),
            operation_id: None,
        }),
    );

    let cluster = Arc::new(
        ClusterConfig::new(
            NodeId::new(nodes[1]).unwrap(),
            peers.iter().map(|p| p.to_string()).collect(),
        )
        .unwrap(),
    );
    let coordinator = ProposalCoordinator::new(
        cluster,
        transport,
        Arc::new(HmacVoteVerifier::new(store)),
        Arc::new(OperationLog::new()),
        Arc::new(NullClock::default()),
        CoordinatorConfig::default(),
    );

    let result = coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert_eq!(result.quorum_size, 3);
    assert_eq!(result.approved, 3);
    assert!(result.success);
    assert_eq!(result.votes[nodes[1]], VoteRecord::Approve);
    assert_eq!(result.votes[nodes[2]], VoteRecord::Approve);
    assert_eq!(result.votes[nodes[3]], VoteRecord::Approve);
    assert_eq!(result.votes[peers[0]], VoteRecord::InvalidSignature);
    assert!(!result.votes.contains_key(nodes[0]));
}

#[tokio::test]
async fn vote_for_another_operation_is_flagged() {
    let h = honest_cluster(CoordinatorConfig::default());
    h.transport.set(
        PEERS[1],
        PeerBehavior::Respond(VoteResponse {
            node: NodeId::new(NODES[1]).unwrap(),
            vote: Decision::Approve,
            signature: NO_AUTH_SIGNATURE.into(),
            operation_id: Some(quorum_types::OperationId::new("ffffffffffffffff")),
        }),
    );

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert_eq!(result.votes[NODES[1]], VoteRecord::InvalidSignature);
    assert!(!result.success);
}

#[tokio::test]
async fn hung_peer_costs_one_timeout() {
    let timeout = Duration::from_millis(200);
    let h = honest_cluster(CoordinatorConfig {
        vote_timeout: timeout,
        ..CoordinatorConfig::default()
    });
    h.transport.set(PEERS[1], PeerBehavior::Hang);
    h.transport.set(PEERS[2], PeerBehavior::Hang);

    let started = Instant::now();
    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;
    let elapsed = started.elapsed();

    assert!(elapsed >= timeout);
    assert!(elapsed < timeout * 3, "fan-out is not concurrent: {elapsed:?}");
    assert_eq!(result.votes[PEERS[1]], VoteRecord::Unreachable);
    assert_eq!(result.votes[PEERS[2]], VoteRecord::Unreachable);
    assert_eq!(result.approved, 1);
}

// ---------------------------------------------------------------------------
// 3. Validation and missing secrets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_data_is_rejected_by_every_voter() {
    let h = honest_cluster(CoordinatorConfig::default());

    let result = h
        .coordinator
        .propose(
            OperationType::UpdateStatus,
            json!({"order_id": "ORD-1", "status": "teleported"}),
        )
        .await;

    assert!(!result.success);
    assert_eq!(result.approved, 0);
    assert!(result.votes.values().all(|v| *v == VoteRecord::Reject));
}

#[tokio::test]
async fn missing_secret_is_accepted_by_default() {
    let h = honest_cluster(CoordinatorConfig::default());
    h.secrets.remove(NODES[2]);

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(result.success);
    assert_eq!(result.votes[NODES[2]], VoteRecord::Approve);
}

#[tokio::test]
async fn missing_secret_is_discarded_under_strict_policy() {
    let h = honest_cluster(CoordinatorConfig {
        missing_secret_policy: MissingSecretPolicy::Reject,
        ..CoordinatorConfig::default()
    });
    h.secrets.remove(NODES[2]);

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert!(!result.success);
    assert_eq!(result.votes[NODES[2]], VoteRecord::InvalidSignature);
}

#[tokio::test]
async fn unsigned_voter_with_known_secret_is_invalid() {
    let h = honest_cluster(CoordinatorConfig::default());
    h.transport
        .set(PEERS[1], PeerBehavior::Honest(caster(NODES[1], None)));

    let result = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert_eq!(result.votes[NODES[1]], VoteRecord::InvalidSignature);
}

// ---------------------------------------------------------------------------
// 4. Operation log behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identical_proposals_get_distinct_ids() {
    // The null clock never moves, so the second id comes from the
    // collision bump.
    let h = honest_cluster(CoordinatorConfig::default());

    let first = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;
    let second = h
        .coordinator
        .propose(OperationType::CreateOrder, create_order())
        .await;

    assert_ne!(first.operation_id, second.operation_id);
    assert_eq!(h.log.len(), 2);
    assert_eq!(h.log.pending_count(), 0);
}

#[tokio::test]
async fn lookup_is_idempotent() {
    let h = honest_cluster(CoordinatorConfig::default());
    let result = h
        .coordinator
        .propose(OperationType::CancelOrder, json!({"order_id": 17}))
        .await;

    let a = h.coordinator.get_operation(&result.operation_id);
    let b = h.coordinator.get_operation(&result.operation_id);
    assert!(a.is_some());
    assert_eq!(a, b);
    assert!(h
        .coordinator
        .get_operation(&quorum_types::OperationId::new("0000000000000000"))
        .is_none());
}

// ---------------------------------------------------------------------------
// 5. Cluster health and the service facade
// ---------------------------------------------------------------------------

fn monitor(probe: Arc<NullHealthProbe>) -> ClusterHealthMonitor {
    ClusterHealthMonitor::new(cluster(), probe, Duration::from_millis(100))
}

#[tokio::test]
async fn all_healthy_means_quorum_available() {
    let probe = Arc::new(NullHealthProbe::new());
    for peer in PEERS {
        probe.set(peer, NodeHealth::Healthy);
    }

    let status = monitor(probe).cluster_status().await;
    assert_eq!(status.cluster_size, 3);
    assert_eq!(status.healthy_nodes, 3);
    assert_eq!(status.quorum_size, 3);
    assert!(status.quorum_available);
    assert_eq!(status.nodes.len(), 3);
}

#[tokio::test]
async fn unhealthy_and_hung_members_drop_availability() {
    let probe = Arc::new(NullHealthProbe::new());
    probe.set(PEERS[0], NodeHealth::Healthy);
    probe.set(PEERS[1], NodeHealth::Unhealthy);
    probe.hang(PEERS[2]);

    let status = monitor(probe).cluster_status().await;
    assert_eq!(status.healthy_nodes, 1);
    assert!(!status.quorum_available);
    let hung = status.nodes.iter().find(|n| n.node == PEERS[2]).unwrap();
    assert_eq!(hung.status, NodeHealth::Unreachable);
}

#[tokio::test]
async fn service_runs_proposal_and_serves_votes() {
    let h = honest_cluster(CoordinatorConfig::default());
    let probe = Arc::new(NullHealthProbe::new());
    let service = ConsensusService::new(
        Arc::new(h.coordinator),
        monitor(probe),
        VoteCaster::new(
            NodeId::new(NODES[0]).unwrap(),
            Arc::new(HmacVoteSigner::new(Some(NodeSecret::try_from(SECRETS[0]).unwrap()))),
        ),
    );

    let result = service
        .propose(OperationType::CreateOrder, create_order())
        .await;
    assert!(result.success);
    assert!(service.get_operation(&result.operation_id).is_some());
    assert_eq!(service.local_node().as_str(), NODES[0]);
    assert!(service.is_authenticated());

    let vote = h
        .transport
        .request_vote(PEERS[1], &h.transport.requests()[0].1)
        .await
        .unwrap();
    assert_eq!(vote.vote, Decision::Approve);
}
