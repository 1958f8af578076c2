use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault is disabled (no token configured)")]
    Disabled,

    #[error("vault unreachable: {0}")]
    Unreachable(String),

    #[error("vault returned HTTP status {0}")]
    Status(u16),

    #[error("invalid vault response: {0}")]
    InvalidResponse(String),

    #[error("failed to create vault HTTP client: {0}")]
    Client(String),
}
