//! Reconciliation core: optimistic self state, confirmed events, and mining
//! discoveries folded into one view.
//!
//! Everything here is synchronous. The game worker owns the only instance and
//! calls into it as messages arrive.

use client_blockchain_core::{ActionId, Address};
use tracing::{debug, info};
use zk::{Commitment, RawCommitment};

use super::ledger::CommitmentLedger;
use super::tiles::{MAX_GRID_UPPER_BOUND, TileGrid};
use crate::api::{GameError, Result};
use super::types::{CommitmentInfo, OptimisticCommitmentInfo, Tile};

/// What a `PlayerUpdated` event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerUpdate {
    /// The poster's location was already known and its tile was touched.
    pub revealed: bool,
    /// The event confirmed the local optimistic location.
    pub promoted: bool,
}

#[derive(Debug, Clone)]
pub struct GameState {
    account: Address,
    grid_upper_bound: u64,
    salt_upper_bound: u64,
    self_info: Option<CommitmentInfo>,
    optimistic_self_info: Option<OptimisticCommitmentInfo>,
    /// Unconfirmed location intents, oldest first.
    pending: Vec<OptimisticCommitmentInfo>,
    ledger: CommitmentLedger,
    tiles: TileGrid,
    latest_event_block: u64,
    wins: u64,
}

impl GameState {
    pub fn new(
        account: Address,
        grid_upper_bound: u64,
        salt_upper_bound: u64,
        baseline_block: u64,
    ) -> Result<Self> {
        let tiles = TileGrid::new(grid_upper_bound).ok_or(GameError::GridTooLarge {
            grid_upper_bound,
            max: MAX_GRID_UPPER_BOUND,
        })?;
        Ok(Self {
            account,
            grid_upper_bound,
            salt_upper_bound,
            self_info: None,
            optimistic_self_info: None,
            pending: Vec::new(),
            ledger: CommitmentLedger::new(),
            tiles,
            latest_event_block: baseline_block,
            wins: 0,
        })
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn grid_upper_bound(&self) -> u64 {
        self.grid_upper_bound
    }

    pub fn salt_upper_bound(&self) -> u64 {
        self.salt_upper_bound
    }

    pub fn self_info(&self) -> Option<&CommitmentInfo> {
        self.self_info.as_ref()
    }

    pub fn optimistic_self_info(&self) -> Option<&OptimisticCommitmentInfo> {
        self.optimistic_self_info.as_ref()
    }

    pub fn ledger(&self) -> &CommitmentLedger {
        &self.ledger
    }

    pub fn tile_grid(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn latest_event_block(&self) -> u64 {
        self.latest_event_block
    }

    pub fn wins(&self) -> u64 {
        self.wins
    }

    pub fn set_wins(&mut self, wins: u64) {
        self.wins = wins;
    }

    pub fn in_bounds(&self, x: u64, y: u64) -> bool {
        self.tiles.contains(x, y)
    }

    /// Applies a `PlayerUpdated` contract event.
    ///
    /// `latest_block` is the chain head observed while handling the event; the
    /// reconciliation baseline only moves forward.
    pub fn apply_player_updated(
        &mut self,
        mover: Address,
        commitment: Commitment,
        block_num: u64,
        latest_block: u64,
    ) -> PlayerUpdate {
        self.latest_event_block = self.latest_event_block.max(latest_block).max(block_num);

        if let Some(previous) = self.ledger.record_posted(mover, commitment, block_num) {
            debug!(%mover, %previous, "commitment superseded");
        }

        let mut update = PlayerUpdate::default();
        if let Some(raw) = self.ledger.mined(&commitment).copied() {
            self.tiles.reveal(raw.x, raw.y);
            self.tiles.attach(raw.x, raw.y, commitment);
            update.revealed = true;
        }

        let confirmed = self
            .pending
            .iter()
            .position(|pending| pending.info.commitment == commitment);
        if let Some(index) = confirmed {
            let pending = self.pending.remove(index);
            info!(x = pending.info.x, y = pending.info.y, action_id = %pending.action_id, "own location confirmed");
            self.reveal(&[pending.info.raw()]);
            self.self_info = Some(pending.info);
            self.refresh_optimistic();
            update.promoted = true;
        }

        update
    }

    /// Folds mined preimages into the ledger and the grid.
    ///
    /// Returns how many tiles turned known.
    pub fn apply_mined(&mut self, commitments: &[RawCommitment]) -> usize {
        self.reveal(commitments)
    }

    fn reveal(&mut self, commitments: &[RawCommitment]) -> usize {
        let mut newly_known = 0;
        for raw in commitments {
            if !self.tiles.contains(raw.x, raw.y) {
                continue;
            }
            self.ledger.record_mined(*raw);
            if self.tiles.reveal(raw.x, raw.y) {
                newly_known += 1;
            }
            if self.ledger.metadata(&raw.commitment).is_some() {
                self.tiles.attach(raw.x, raw.y, raw.commitment);
            }
        }
        newly_known
    }

    /// Installs the speculative location for a pending action.
    ///
    /// Overlapping actions queue up; the newest one is the optimistic view.
    pub fn set_optimistic(&mut self, info: CommitmentInfo, action_id: ActionId) {
        self.pending.push(OptimisticCommitmentInfo { info, action_id });
        self.refresh_optimistic();
    }

    /// Number of location actions still awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops the speculative state of a failed action.
    ///
    /// Returns false if `action_id` holds no pending location. The optimistic
    /// view falls back to the newest remaining pending action, else to the
    /// confirmed location with no pending action.
    pub fn rollback(&mut self, action_id: &ActionId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| &pending.action_id != action_id);
        if self.pending.len() == before {
            return false;
        }
        self.refresh_optimistic();
        true
    }

    fn refresh_optimistic(&mut self) {
        self.optimistic_self_info = self.pending.last().cloned().or_else(|| {
            self.self_info.clone().map(|info| OptimisticCommitmentInfo {
                info,
                action_id: ActionId::none(),
            })
        });
    }

    pub fn tiles(&self) -> Vec<Vec<Tile>> {
        self.tiles.snapshot(&self.ledger, self.latest_event_block)
    }
}
