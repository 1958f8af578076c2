//! Node identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Identity of a replica, conventionally `host:port` (e.g. `order-node-1:8002`).
///
/// Votes are keyed by this identity and the vote MAC covers it, so it must be
/// stable for the lifetime of a deployment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypesError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypesError::EmptyNodeId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host part of the identity, without the trailing `:port`.
    ///
    /// Secret stores index node secrets by host name.
    pub fn host(&self) -> &str {
        match self.0.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
                host
            }
            _ => &self.0,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NodeId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
