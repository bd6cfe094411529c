//! Per-action state machine.
//!
//! ```text
//! Pending ──► Ready(args) ──► Submitted(hash) ──► Confirmed
//!    │             │                 │        └──► Reverted
//!    └─────────────┴─────────────────┴──────────► Failed
//! ```
//!
//! Terminal states never change. Late or duplicate notifications for an
//! action (for example a revert reported both by the receipt and by the
//! executor's event stream) are ignored. Only the most recent terminal
//! records are kept; older ones are forgotten.

use std::collections::{HashMap, VecDeque};

use client_blockchain_core::{ActionId, CallArg, ContractMethod};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IntentStatus {
    /// Witness or proof still being computed
    Pending,
    /// Call arguments assembled, not yet accepted by the executor
    Ready(Vec<CallArg>),
    Submitted { tx_hash: String },
    Confirmed { tx_hash: String },
    Reverted { reason: String },
    Failed { error: String },
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntentStatus::Confirmed { .. } | IntentStatus::Reverted { .. } | IntentStatus::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentRecord {
    pub method: ContractMethod,
    pub status: IntentStatus,
}

/// Terminal records kept for status queries.
pub const DEFAULT_TERMINAL_HISTORY: usize = 256;

#[derive(Debug)]
pub struct IntentTracker {
    intents: HashMap<ActionId, IntentRecord>,
    /// Terminal actions, oldest first.
    finished: VecDeque<ActionId>,
    history: usize,
}

impl Default for IntentTracker {
    fn default() -> Self {
        Self::with_history(DEFAULT_TERMINAL_HISTORY)
    }
}

impl IntentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(history: usize) -> Self {
        Self {
            intents: HashMap::new(),
            finished: VecDeque::new(),
            history,
        }
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn create(&mut self, action_id: ActionId, method: ContractMethod) {
        self.intents.insert(
            action_id,
            IntentRecord {
                method,
                status: IntentStatus::Pending,
            },
        );
    }

    pub fn get(&self, action_id: &ActionId) -> Option<&IntentRecord> {
        self.intents.get(action_id)
    }

    pub fn status(&self, action_id: &ActionId) -> Option<&IntentStatus> {
        self.get(action_id).map(|record| &record.status)
    }

    pub fn contains(&self, action_id: &ActionId) -> bool {
        self.intents.contains_key(action_id)
    }

    /// `Pending → Ready`.
    pub fn ready(&mut self, action_id: &ActionId, args: Vec<CallArg>) -> bool {
        self.transition(action_id, |status| match status {
            IntentStatus::Pending => Some(IntentStatus::Ready(args)),
            _ => None,
        })
    }

    /// `Ready → Submitted`. A submission seen before the ready ack is also
    /// accepted from `Pending`.
    pub fn submitted(&mut self, action_id: &ActionId, tx_hash: String) -> bool {
        self.transition(action_id, |status| match status {
            IntentStatus::Pending | IntentStatus::Ready(_) => {
                Some(IntentStatus::Submitted { tx_hash })
            }
            _ => None,
        })
    }

    /// `Submitted → Confirmed`.
    pub fn confirmed(&mut self, action_id: &ActionId, tx_hash: String) -> bool {
        self.transition(action_id, |status| match status {
            IntentStatus::Ready(_) | IntentStatus::Submitted { .. } => {
                Some(IntentStatus::Confirmed { tx_hash })
            }
            _ => None,
        })
    }

    /// `Submitted → Reverted`.
    pub fn reverted(&mut self, action_id: &ActionId, reason: String) -> bool {
        self.transition(action_id, |status| match status {
            IntentStatus::Ready(_) | IntentStatus::Submitted { .. } => {
                Some(IntentStatus::Reverted { reason })
            }
            _ => None,
        })
    }

    /// Any non-terminal state `→ Failed`.
    pub fn failed(&mut self, action_id: &ActionId, error: String) -> bool {
        self.transition(action_id, |status| {
            (!status.is_terminal()).then_some(IntentStatus::Failed { error })
        })
    }

    fn transition(
        &mut self,
        action_id: &ActionId,
        next: impl FnOnce(&IntentStatus) -> Option<IntentStatus>,
    ) -> bool {
        let Some(record) = self.intents.get_mut(action_id) else {
            return false;
        };
        let Some(status) = next(&record.status) else {
            return false;
        };
        let terminal = status.is_terminal();
        record.status = status;
        if terminal {
            self.finished.push_back(action_id.clone());
            self.prune();
        }
        true
    }

    fn prune(&mut self) {
        while self.finished.len() > self.history {
            if let Some(oldest) = self.finished.pop_front() {
                self.intents.remove(&oldest);
            }
        }
    }
}
