use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("node secret must not be empty")]
    EmptySecret,

    #[error("MAC initialisation failed: {0}")]
    MacInit(String),
}
