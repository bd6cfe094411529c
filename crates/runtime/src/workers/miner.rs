//! Tile mining: brute-forcing location commitments around a start position.
//!
//! A run walks a bounded square spiral around the start cell and, for every
//! in-bounds cell, hashes each candidate `(blockhash, salt)` pair. Each spiral
//! step's commitments are streamed back as one batch so tiles can be revealed
//! incrementally. The search runs on a blocking thread and only talks to the
//! game worker through [`MinerMessage`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info};
use zk::{Fr, RawCommitment, candidate_pairs};

use super::spiral::SpiralOffsets;
use crate::state::WorldCoords;

#[derive(Debug, Clone)]
pub struct MiningParams {
    pub grid_upper_bound: u64,
    pub salt_upper_bound: u64,
    pub start: WorldCoords,
    pub blockhashes: Vec<Fr>,
    /// Spiral steps to walk before the run finishes on its own.
    pub steps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinerMessage {
    Mined {
        run_id: u64,
        commitments: Vec<RawCommitment>,
    },
    /// The search space was exhausted. Cancelled runs never send this.
    Finished { run_id: u64 },
}

impl MinerMessage {
    pub fn run_id(&self) -> u64 {
        match self {
            Self::Mined { run_id, .. } | Self::Finished { run_id } => *run_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Exploring { run_id: u64 },
}

/// Runs the search synchronously, handing each non-empty step to `emit`.
///
/// Stops early when `cancelled` is set or `emit` returns `false`. Returns
/// whether the whole walk completed.
pub fn explore(
    params: &MiningParams,
    cancelled: &AtomicBool,
    mut emit: impl FnMut(Vec<RawCommitment>) -> bool,
) -> bool {
    let grid = params.grid_upper_bound;
    let bound = i64::try_from(grid / 2).unwrap_or(i64::MAX);

    for (dx, dy) in SpiralOffsets::new(params.steps, bound) {
        let (Some(x), Some(y)) = (
            params.start.x.checked_add_signed(dx),
            params.start.y.checked_add_signed(dy),
        ) else {
            continue;
        };
        if x >= grid || y >= grid {
            continue;
        }

        let mut batch = Vec::new();
        for secret in candidate_pairs(&params.blockhashes, params.salt_upper_bound) {
            if cancelled.load(Ordering::Relaxed) {
                return false;
            }
            batch.push(RawCommitment::compute(x, y, secret));
        }

        if !batch.is_empty() && !emit(batch) {
            return false;
        }
    }
    true
}

/// Owns at most one background mining run.
pub struct Miner {
    results: mpsc::Sender<MinerMessage>,
    state: MinerState,
    next_run_id: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl Miner {
    pub fn new(results: mpsc::Sender<MinerMessage>) -> Self {
        Self {
            results,
            state: MinerState::Idle,
            next_run_id: 1,
            cancel: None,
        }
    }

    pub fn state(&self) -> MinerState {
        self.state
    }

    /// Starts a new run, cancelling the current one first. Returns the run id.
    pub fn start(&mut self, params: MiningParams) -> u64 {
        self.stop();

        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let results = self.results.clone();

        info!(
            run_id,
            x = params.start.x,
            y = params.start.y,
            steps = params.steps,
            hashes = params.blockhashes.len(),
            "mining started"
        );

        tokio::task::spawn_blocking(move || {
            let completed = explore(&params, &flag, |commitments| {
                results
                    .blocking_send(MinerMessage::Mined {
                        run_id,
                        commitments,
                    })
                    .is_ok()
            });
            if completed {
                let _ = results.blocking_send(MinerMessage::Finished { run_id });
            } else {
                debug!(run_id, "mining run aborted");
            }
        });

        self.cancel = Some(cancel);
        self.state = MinerState::Exploring { run_id };
        run_id
    }

    /// Cancels the current run; anything it has not reported yet is lost.
    ///
    /// Returns `false` if no run was active.
    pub fn stop(&mut self) -> bool {
        let Some(cancel) = self.cancel.take() else {
            return false;
        };
        cancel.store(true, Ordering::Relaxed);
        if let MinerState::Exploring { run_id } = self.state {
            info!(run_id, "mining stopped");
        }
        self.state = MinerState::Idle;
        true
    }

    /// Filters a message from the background run.
    ///
    /// Returns `false` for messages of a run that was stopped or replaced;
    /// those must be discarded.
    pub fn accept(&mut self, message: &MinerMessage) -> bool {
        let MinerState::Exploring { run_id } = self.state else {
            return false;
        };
        if message.run_id() != run_id {
            return false;
        }
        if let MinerMessage::Finished { .. } = message {
            info!(run_id, "mining finished");
            self.cancel = None;
            self.state = MinerState::Idle;
        }
        true
    }
}

impl Drop for Miner {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
    }
}
