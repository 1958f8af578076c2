//! Quorum daemon: entry point for running one consensus replica.

use anyhow::Context;
use clap::Parser;
use quorum_consensus::MissingSecretPolicy;
use quorum_node::{init_logging, LogFormat, NodeConfig, ReplicaNode, ShutdownController};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum-daemon", about = "Quorum vote-signing consensus replica")]
struct Cli {
    /// This node's identity, "host:port".
    #[arg(long, env = "QUORUM_NODE_ID")]
    node_id: Option<String>,

    /// Address the HTTP server binds, e.g. "0.0.0.0:8002".
    #[arg(long, env = "QUORUM_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Base URLs of every cluster member, this node included (comma-separated).
    #[arg(long, env = "QUORUM_CLUSTER_NODES", value_delimiter = ',')]
    cluster_nodes: Vec<String>,

    /// Per-peer vote timeout in milliseconds.
    #[arg(long, env = "QUORUM_VOTE_TIMEOUT_MS")]
    vote_timeout_ms: Option<u64>,

    /// Per-peer liveness probe timeout in milliseconds.
    #[arg(long, env = "QUORUM_HEALTH_TIMEOUT_MS")]
    health_timeout_ms: Option<u64>,

    /// What to do with a vote from a peer with no known secret: "accept" or "reject".
    #[arg(long, env = "QUORUM_MISSING_SECRET_POLICY", value_parser = parse_policy)]
    missing_secret_policy: Option<MissingSecretPolicy>,

    /// Vault server address.
    #[arg(long, env = "VAULT_ADDR")]
    vault_addr: Option<String>,

    /// Vault token. Vault is disabled without one.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    vault_token: Option<String>,

    /// Path under the KV mount holding per-node secrets.
    #[arg(long, env = "QUORUM_VAULT_PATH_PREFIX")]
    vault_path_prefix: Option<String>,

    /// Drop resolved operations older than this many seconds.
    #[arg(long, env = "QUORUM_OPERATION_RETENTION_SECS")]
    operation_retention_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QUORUM_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QUORUM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "QUORUM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Operate the replica.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the replica until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

fn parse_policy(s: &str) -> Result<MissingSecretPolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "accept" => Ok(MissingSecretPolicy::Accept),
        "reject" => Ok(MissingSecretPolicy::Reject),
        other => Err(format!("expected \"accept\" or \"reject\", got \"{other}\"")),
    }
}

impl Cli {
    /// File config (or defaults) with every given flag applied on top.
    fn into_config(self) -> anyhow::Result<(NodeConfig, Command)> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(node_id) = self.node_id {
            config.node_id = node_id;
        }
        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if !self.cluster_nodes.is_empty() {
            config.cluster_nodes = self.cluster_nodes;
        }
        if let Some(ms) = self.vote_timeout_ms {
            config.vote_timeout_ms = ms;
        }
        if let Some(ms) = self.health_timeout_ms {
            config.health_timeout_ms = ms;
        }
        if let Some(policy) = self.missing_secret_policy {
            config.missing_secret_policy = policy;
        }
        if let Some(addr) = self.vault_addr {
            config.vault.addr = addr;
        }
        if self.vault_token.is_some() {
            config.vault.token = self.vault_token;
        }
        if let Some(prefix) = self.vault_path_prefix {
            config.vault.path_prefix = prefix;
        }
        if self.operation_retention_secs.is_some() {
            config.operation_retention_secs = self.operation_retention_secs;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        config.validate()?;
        Ok((config, self.command))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, command) = Cli::parse().into_config()?;

    match command {
        Command::Node { action } => match action {
            NodeAction::Config => {
                let mut shown = config;
                if shown.vault.token.is_some() {
                    shown.vault.token = Some("<redacted>".into());
                }
                shown.secrets.values_mut().for_each(|s| *s = "<redacted>".into());
                print!("{}", shown.to_toml_string()?);
            }
            NodeAction::Run => {
                init_logging(config.log_format, &config.log_level)?;
                tracing::info!(
                    node_id = %config.node_id,
                    listen_addr = %config.listen_addr,
                    cluster = %config.cluster_nodes.join(","),
                    vault = config.vault_enabled(),
                    "starting quorum replica"
                );

                let node = ReplicaNode::new(config).await?;
                let shutdown = ShutdownController::new();
                let listener = node.bind().await?;

                let serve = node.serve(listener, &shutdown);
                tokio::pin!(serve);
                tokio::select! {
                    result = &mut serve => result?,
                    _ = shutdown.wait_for_signal() => {
                        tracing::info!("shutdown signal received, stopping replica");
                        serve.await?;
                    }
                }

                tracing::info!("quorum daemon exited cleanly");
            }
        },
    }

    Ok(())
}
