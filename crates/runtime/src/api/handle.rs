//! Cloneable façade for driving the game.
//!
//! [`GameHandle`] hides channel plumbing: writes are balance-checked and then
//! handed to the game worker, reads are answered from the worker's state, and
//! notifications are available per topic.
use std::sync::Arc;

use client_blockchain_core::{ActionId, Address, ChainExecutor, ensure_can_transact};
use tokio::sync::{broadcast, mpsc, oneshot};

use super::errors::{GameError, Result};
use crate::config::MinerConfig;
use crate::events::{Event, EventBus, Topic};
use crate::intent::IntentStatus;
use crate::snark::fetch_hash_window;
use crate::state::{
    BattlePower, CommitmentInfo, OptimisticCommitmentInfo, Tile, WorldCoords, decode_battle_power,
};
use crate::workers::{Command, IntentRequest, MiningParams};

/// Client-facing handle to interact with the game runtime
#[derive(Clone)]
pub struct GameHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
    chain: Arc<dyn ChainExecutor>,
    grid_upper_bound: u64,
    salt_upper_bound: u64,
    min_balance_wei: u128,
    miner: MinerConfig,
}

impl GameHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
        chain: Arc<dyn ChainExecutor>,
        grid_upper_bound: u64,
        salt_upper_bound: u64,
        min_balance_wei: u128,
        miner: MinerConfig,
    ) -> Self {
        Self {
            command_tx,
            event_bus,
            chain,
            grid_upper_bound,
            salt_upper_bound,
            min_balance_wei,
            miner,
        }
    }

    /// Joins the game at `(x, y)`.
    pub async fn init_player(&self, x: u64, y: u64) -> Result<ActionId> {
        self.submit(IntentRequest::Init { x, y }).await
    }

    /// Moves the confirmed location to `(x, y)`.
    ///
    /// The optimistic location switches once the proof is ready; it falls
    /// back to the confirmed one if the action fails.
    pub async fn move_player(&self, x: u64, y: u64) -> Result<ActionId> {
        self.submit(IntentRequest::Move { x, y }).await
    }

    /// Attacks a player whose current location has been mined.
    pub async fn battle_player(&self, opponent: Address) -> Result<ActionId> {
        self.submit(IntentRequest::Battle { opponent }).await
    }

    pub async fn claim_treasure(&self, x: u64, y: u64) -> Result<ActionId> {
        self.submit(IntentRequest::Claim { x, y }).await
    }

    /// Returns once the action is validated and its pipeline started; follow
    /// its progress on [`Topic::Intent`] or through [`GameHandle::intent_status`].
    async fn submit(&self, request: IntentRequest) -> Result<ActionId> {
        ensure_can_transact(self.chain.as_ref(), self.min_balance_wei).await?;
        self.query(|reply| Command::Intent { request, reply })
            .await?
    }

    /// Starts brute-forcing commitments around `start`, replacing any running
    /// search. Returns the run id.
    pub async fn start_mining(&self, start: WorldCoords) -> Result<u64> {
        if start.x >= self.grid_upper_bound || start.y >= self.grid_upper_bound {
            return Err(GameError::OutOfBounds {
                x: start.x,
                y: start.y,
                grid_upper_bound: self.grid_upper_bound,
            });
        }

        // Young chains have fewer blocks than the configured window.
        let latest = self.chain.block_number().await?;
        let size = self.miner.hash_window.min(latest + 1);
        let window = fetch_hash_window(self.chain.as_ref(), size).await?;

        let params = MiningParams {
            grid_upper_bound: self.grid_upper_bound,
            salt_upper_bound: self.salt_upper_bound,
            start,
            blockhashes: window.hashes,
            steps: self.miner.steps_for(self.grid_upper_bound),
        };
        self.query(|reply| Command::StartMining { params, reply })
            .await
    }

    /// Cancels the running search. Returns `false` if none was running.
    pub async fn stop_mining(&self) -> Result<bool> {
        self.query(|reply| Command::StopMining { reply }).await
    }

    /// Snapshot of the grid, indexed `[x][y]`.
    pub async fn tiles(&self) -> Result<Vec<Vec<Tile>>> {
        self.query(|reply| Command::QueryTiles { reply }).await
    }

    /// Confirmed own location.
    pub async fn self_info(&self) -> Result<Option<CommitmentInfo>> {
        self.query(|reply| Command::QuerySelfInfo { reply }).await
    }

    pub async fn optimistic_self_info(&self) -> Result<Option<OptimisticCommitmentInfo>> {
        self.query(|reply| Command::QueryOptimisticSelfInfo { reply })
            .await
    }

    pub async fn wins(&self) -> Result<u64> {
        self.query(|reply| Command::QueryWins { reply }).await
    }

    pub async fn intent_status(&self, action_id: ActionId) -> Result<Option<IntentStatus>> {
        self.query(|reply| Command::QueryIntent { action_id, reply })
            .await
    }

    /// Reads and decodes a player's battle power straight from the chain.
    pub async fn battle_power(&self, player: Address) -> Result<Vec<BattlePower>> {
        let words = self.chain.battle_power(player).await?;
        Ok(words.iter().map(decode_battle_power).collect())
    }

    pub async fn current_block_number(&self) -> Result<u64> {
        Ok(self.chain.block_number().await?)
    }

    pub fn grid_upper_bound(&self) -> u64 {
        self.grid_upper_bound
    }

    pub fn salt_upper_bound(&self) -> u64 {
        self.salt_upper_bound
    }

    /// Subscribe to events from a specific topic
    ///
    /// Dropping the receiver unsubscribes.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use runtime::{Event, Topic};
    ///
    /// let mut tiles_rx = handle.subscribe(Topic::MinedTilesUpdated);
    /// while let Ok(Event::MinedTilesUpdated) = tiles_rx.recv().await {
    ///     let tiles = handle.tiles().await?;
    /// }
    /// ```
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn query<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| GameError::CommandChannelClosed)?;

        reply_rx.await.map_err(GameError::ReplyChannelClosed)
    }
}
