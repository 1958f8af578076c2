//! End-to-end tests: real replicas serving HTTP on loopback, proposing to
//! each other with static secrets.

use quorum_node::{NodeConfig, ReplicaNode, ShutdownController};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tokio::net::TcpListener;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Cluster {
    urls: Vec<String>,
    shutdown: Arc<ShutdownController>,
    http: reqwest::Client,
}

impl Cluster {
    async fn post(&self, node: usize, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .http
            .post(format!("{}{path}", self.urls[node]))
            .json(&body)
            .send()
            .await
            .expect("request");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, node: usize, path: &str) -> (u16, Value) {
        let response = self
            .http
            .get(format!("{}{path}", self.urls[node]))
            .send()
            .await
            .expect("request");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

fn node_id(i: usize, port: u16) -> String {
    format!("order-node-{}:{port}", i + 1)
}

/// Start a three-member cluster. `signing[i]` is the secret node `i` signs
/// with; `up[i] = false` leaves that member's port closed.
async fn start_cluster(signing: [&str; 3], up: [bool; 3]) -> Cluster {
    let mut listeners = Vec::new();
    for _ in 0..3 {
        listeners.push(TcpListener::bind("127.0.0.1:0").await.expect("bind"));
    }
    let ports: Vec<u16> = listeners
        .iter()
        .map(|l| l.local_addr().expect("addr").port())
        .collect();
    let urls: Vec<String> = ports.iter().map(|p| format!("http://127.0.0.1:{p}")).collect();

    // Issued secrets are token-1..token-3; a node may sign with something else.
    let table: BTreeMap<String, String> = (0..3)
        .map(|i| (node_id(i, ports[i]), format!("token-{}", i + 1)))
        .collect();

    let shutdown = Arc::new(ShutdownController::new());
    for (i, listener) in listeners.into_iter().enumerate() {
        if !up[i] {
            drop(listener);
            continue;
        }
        let mut secrets = table.clone();
        secrets.insert(node_id(i, ports[i]), signing[i].to_string());
        let config = NodeConfig {
            node_id: node_id(i, ports[i]),
            listen_addr: format!("127.0.0.1:{}", ports[i]),
            cluster_nodes: urls.clone(),
            vote_timeout_ms: 2_000,
            health_timeout_ms: 500,
            secrets,
            ..NodeConfig::default()
        };
        let node = ReplicaNode::new(config).await.expect("node");
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { node.serve(listener, &shutdown).await });
    }

    Cluster {
        urls,
        shutdown,
        http: reqwest::Client::new(),
    }
}

fn create_order() -> Value {
    json!({
        "operation_type": "CREATE_ORDER",
        "operation_data": {
            "customer_id": "CUST-1",
            "items": [{"product_id": "SKU-1", "quantity": 1}],
        },
    })
}

const HONEST: [&str; 3] = ["token-1", "token-2", "token-3"];

// ---------------------------------------------------------------------------
// 1. Proposals over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_honest_nodes_commit() {
    let cluster = start_cluster(HONEST, [true; 3]).await;

    let (status, result) = cluster.post(0, "/consensus/propose", create_order()).await;
    assert_eq!(status, 200);
    assert_eq!(result["success"], true, "{result}");
    assert_eq!(result["approved"], 3);
    assert_eq!(result["quorum_size"], 3);

    let id = result["operation_id"].as_str().unwrap();
    let (status, operation) = cluster.get(0, &format!("/consensus/operations/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(operation["status"], "committed");

    // Only the proposer records the operation.
    let (status, _) = cluster.get(1, &format!("/consensus/operations/{id}")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn down_member_blocks_commit() {
    let cluster = start_cluster(HONEST, [true, true, false]).await;

    let (_, result) = cluster.post(0, "/consensus/propose", create_order()).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["approved"], 2);
    assert_eq!(result["reason"], "quorum not reached");
    assert_eq!(result["votes"][cluster.urls[2].as_str()], "unreachable");
}

#[tokio::test]
async fn forged_signature_is_flagged() {
    let cluster = start_cluster(["token-1", "not-token-2", "token-3"], [true; 3]).await;

    let (_, result) = cluster.post(0, "/consensus/propose", create_order()).await;
    assert_eq!(result["success"], false);
    assert_eq!(result["approved"], 2);
    let invalid: Vec<&Value> = result["votes"]
        .as_object()
        .unwrap()
        .values()
        .filter(|v| *v == "invalid-signature")
        .collect();
    assert_eq!(invalid.len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Observability endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_and_health_reflect_cluster() {
    let cluster = start_cluster(HONEST, [true, true, false]).await;

    let (status, body) = cluster.get(1, "/consensus/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["healthy_nodes"], 2);
    assert_eq!(body["quorum_available"], false);

    let (status, body) = cluster.get(1, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["vault_auth"], true);
}

// ---------------------------------------------------------------------------
// 3. Configuration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn node_builds_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
node_id = "order-node-1:8002"
listen_addr = "127.0.0.1:0"
cluster_nodes = ["http://127.0.0.1:1"]
operation_retention_secs = 600

[secrets]
"order-node-1:8002" = "token-1"
"#
    )
    .unwrap();

    let config = NodeConfig::from_toml_file(file.path()).expect("config");
    assert_eq!(config.operation_retention_secs, Some(600));

    let node = ReplicaNode::new(config).await.expect("node");
    assert_eq!(node.local_node().as_str(), "order-node-1:8002");
    assert!(node.service().is_authenticated());
    assert_eq!(node.service().cluster().quorum_size(), 1);
}

#[tokio::test]
async fn node_without_secret_is_unauthenticated() {
    let config = NodeConfig {
        cluster_nodes: vec!["http://127.0.0.1:1".into()],
        ..NodeConfig::default()
    };
    let node = ReplicaNode::new(config).await.expect("node");
    assert!(!node.service().is_authenticated());
}
