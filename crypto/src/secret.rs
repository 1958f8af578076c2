//! Per-node shared secret.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::CryptoError;

/// A node's signing secret as issued by the secret store.
///
/// The bytes are zeroed when the value is dropped and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct NodeSecret(Vec<u8>);

impl NodeSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        Ok(Self(bytes))
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for NodeSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeSecret(<redacted>)")
    }
}

impl TryFrom<&str> for NodeSecret {
    type Error = CryptoError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.as_bytes().to_vec())
    }
}
