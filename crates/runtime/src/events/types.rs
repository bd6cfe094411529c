//! Notification payloads.

use client_blockchain_core::{ActionId, ContractMethod};
use serde::{Deserialize, Serialize};

/// Lifecycle of a user action, from initiation to its terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentEvent {
    /// Validated and handed to the pipeline
    Created {
        action_id: ActionId,
        method: ContractMethod,
    },
    /// Proof generated (or not needed) and call arguments ready
    Proved { action_id: ActionId },
    /// Accepted into the mempool
    Submitted { action_id: ActionId, tx_hash: String },
    /// Mined successfully
    Confirmed { action_id: ActionId, tx_hash: String },
    /// Mined and reverted
    Reverted { action_id: ActionId, reason: String },
    /// Witness, proof, or submission failed before reaching the chain
    Failed { action_id: ActionId, error: String },
}

impl IntentEvent {
    pub fn action_id(&self) -> &ActionId {
        match self {
            IntentEvent::Created { action_id, .. }
            | IntentEvent::Proved { action_id }
            | IntentEvent::Submitted { action_id, .. }
            | IntentEvent::Confirmed { action_id, .. }
            | IntentEvent::Reverted { action_id, .. }
            | IntentEvent::Failed { action_id, .. } => action_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentEvent::Confirmed { .. } | IntentEvent::Reverted { .. } | IntentEvent::Failed { .. }
        )
    }
}
