//! Operation log: the arena of operations this node proposed.
//!
//! A single reader/writer lock guards the map: lookups take the shared lock,
//! the two writes of a proposal (insert as pending, resolve) take the
//! exclusive one. Readers therefore never observe a half-written record, and
//! [`OperationLog::resolve`] refuses any transition out of a terminal state.

use quorum_types::{NodeId, OperationId, OperationStatus, OperationType, Timestamp, VoteRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::ConsensusError;

/// One proposed state change and, once resolved, its tally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub data: Value,
    pub proposer: NodeId,
    pub status: OperationStatus,
    /// Voter identity (or peer address when unreachable) → recorded outcome.
    pub votes: BTreeMap<String, VoteRecord>,
    pub proposed_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Operation {
    pub fn pending(
        id: OperationId,
        operation_type: OperationType,
        data: Value,
        proposer: NodeId,
        proposed_at: Timestamp,
    ) -> Self {
        Self {
            id,
            operation_type,
            data,
            proposer,
            status: OperationStatus::Pending,
            votes: BTreeMap::new(),
            proposed_at,
            resolved_at: None,
            reason: None,
        }
    }

    /// Number of `approve` entries in the vote map.
    pub fn approvals(&self) -> usize {
        self.votes.values().filter(|v| v.is_approval()).count()
    }
}

#[derive(Default)]
pub struct OperationLog {
    operations: RwLock<HashMap<OperationId, Operation>>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly proposed operation. Never overwrites an existing id.
    pub fn insert_pending(&self, operation: Operation) -> Result<(), ConsensusError> {
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if operations.contains_key(&operation.id) {
            return Err(ConsensusError::DuplicateOperation(operation.id));
        }
        operations.insert(operation.id.clone(), operation);
        Ok(())
    }

    /// Write the final tally and status. Succeeds exactly once per id.
    pub fn resolve(
        &self,
        id: &OperationId,
        votes: BTreeMap<String, VoteRecord>,
        status: OperationStatus,
        reason: Option<String>,
        resolved_at: Timestamp,
    ) -> Result<Operation, ConsensusError> {
        if !status.is_terminal() {
            return Err(ConsensusError::InvalidTransition(id.clone()));
        }
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let operation = operations
            .get_mut(id)
            .ok_or_else(|| ConsensusError::OperationNotFound(id.clone()))?;
        if operation.status.is_terminal() {
            return Err(ConsensusError::AlreadyResolved {
                id: id.clone(),
                status: operation.status,
            });
        }
        operation.votes = votes;
        operation.status = status;
        operation.reason = reason;
        operation.resolved_at = Some(resolved_at);
        Ok(operation.clone())
    }

    /// Snapshot of one operation.
    pub fn get(&self, id: &OperationId) -> Option<Operation> {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &OperationId) -> bool {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of operations still awaiting their tally.
    pub fn pending_count(&self) -> usize {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|op| !op.status.is_terminal())
            .count()
    }

    /// Drop resolved operations that were resolved before `cutoff`.
    ///
    /// Pending operations are always kept. Returns how many were removed.
    pub fn prune_resolved_before(&self, cutoff: Timestamp) -> usize {
        let mut operations = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = operations.len();
        operations.retain(|_, op| match op.resolved_at {
            Some(resolved_at) if op.status.is_terminal() => resolved_at >= cutoff,
            _ => true,
        });
        before - operations.len()
    }
}
