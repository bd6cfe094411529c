//! Game worker that owns the authoritative [`GameState`].
//!
//! Receives commands from [`crate::GameHandle`], contract and transaction
//! events from the chain executor, mining batches from the [`Miner`], and
//! progress reports from intent pipelines. All of them are folded into the
//! state here, one message at a time, and announced on the [`EventBus`].

mod pipeline;

use std::sync::Arc;

use client_blockchain_core::{ActionId, Address, ChainExecutor, ContractEvent, TxEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use zk::Commitment;

use self::pipeline::{Internal, IntentJob, PipelineContext};
use super::miner::{Miner, MinerMessage, MiningParams};
use super::prover::ProofQueue;
use crate::api::{GameError, Result};
use crate::events::{Event, EventBus, IntentEvent};
use crate::intent::{IntentStatus, IntentTracker};
use crate::state::{CommitmentInfo, GameState, OptimisticCommitmentInfo, Tile};

/// What the caller wants to do on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRequest {
    Init { x: u64, y: u64 },
    Move { x: u64, y: u64 },
    Battle { opponent: Address },
    Claim { x: u64, y: u64 },
}

/// Commands that can be sent to the game worker
pub enum Command {
    /// Validate an intent and start its pipeline.
    Intent {
        request: IntentRequest,
        reply: oneshot::Sender<Result<ActionId>>,
    },
    /// Replace any running mining search with a new one.
    StartMining {
        params: MiningParams,
        reply: oneshot::Sender<u64>,
    },
    StopMining { reply: oneshot::Sender<bool> },
    QueryTiles { reply: oneshot::Sender<Vec<Vec<Tile>>> },
    QuerySelfInfo {
        reply: oneshot::Sender<Option<CommitmentInfo>>,
    },
    QueryOptimisticSelfInfo {
        reply: oneshot::Sender<Option<OptimisticCommitmentInfo>>,
    },
    QueryWins { reply: oneshot::Sender<u64> },
    QueryIntent {
        action_id: ActionId,
        reply: oneshot::Sender<Option<IntentStatus>>,
    },
}

/// Background task that reconciles local intents with the chain.
pub struct GameWorker {
    state: GameState,
    intents: IntentTracker,
    chain: Arc<dyn ChainExecutor>,
    event_bus: EventBus,
    command_rx: mpsc::Receiver<Command>,
    contract_events: broadcast::Receiver<ContractEvent>,
    contract_events_open: bool,
    tx_events: broadcast::Receiver<TxEvent>,
    tx_events_open: bool,
    miner: Miner,
    miner_rx: mpsc::Receiver<MinerMessage>,
    internal_rx: mpsc::Receiver<Internal>,
    pipeline: PipelineContext,
    rng: StdRng,
}

impl GameWorker {
    pub(crate) fn new(
        state: GameState,
        chain: Arc<dyn ChainExecutor>,
        proofs: ProofQueue,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        snark_hash_window: u64,
        channel_capacity: usize,
    ) -> Self {
        let (miner_tx, miner_rx) = mpsc::channel(channel_capacity);
        let (internal_tx, internal_rx) = mpsc::channel(channel_capacity);

        let pipeline = PipelineContext {
            chain: Arc::clone(&chain),
            proofs,
            internal: internal_tx,
            account: state.account(),
            grid_upper_bound: state.grid_upper_bound(),
            salt_upper_bound: state.salt_upper_bound(),
            hash_window: snark_hash_window,
        };

        info!(
            account = %state.account(),
            grid_upper_bound = state.grid_upper_bound(),
            salt_upper_bound = state.salt_upper_bound(),
            chain = chain.name(),
            "GameWorker initialized"
        );

        Self {
            contract_events: chain.subscribe_contract_events(),
            contract_events_open: true,
            tx_events: chain.subscribe_tx_events(),
            tx_events_open: true,
            state,
            intents: IntentTracker::new(),
            chain,
            event_bus,
            command_rx,
            miner: Miner::new(miner_tx),
            miner_rx,
            internal_rx,
            pipeline,
            rng: StdRng::from_entropy(),
        }
    }

    /// Main worker loop. Ends once every handle is dropped.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message);
                }
                event = self.contract_events.recv(), if self.contract_events_open => {
                    match event {
                        Ok(event) => self.handle_contract_event(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "contract event stream lagged");
                        }
                        Err(RecvError::Closed) => {
                            warn!("contract event stream closed");
                            self.contract_events_open = false;
                        }
                    }
                }
                event = self.tx_events.recv(), if self.tx_events_open => {
                    match event {
                        Ok(event) => self.handle_tx_event(event),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "transaction event stream lagged");
                        }
                        Err(RecvError::Closed) => {
                            warn!("transaction event stream closed");
                            self.tx_events_open = false;
                        }
                    }
                }
                Some(message) = self.miner_rx.recv() => {
                    self.handle_miner_message(message);
                }
            }
        }

        self.miner.stop();
        info!("GameWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Intent { request, reply } => {
                let result = self.start_intent(request);
                if reply.send(result).is_err() {
                    debug!("Intent reply channel closed (caller dropped)");
                }
            }
            Command::StartMining { params, reply } => {
                let run_id = self.miner.start(params);
                if reply.send(run_id).is_err() {
                    debug!("StartMining reply channel closed (caller dropped)");
                }
            }
            Command::StopMining { reply } => {
                let stopped = self.miner.stop();
                if reply.send(stopped).is_err() {
                    debug!("StopMining reply channel closed (caller dropped)");
                }
            }
            Command::QueryTiles { reply } => {
                if reply.send(self.state.tiles()).is_err() {
                    debug!("QueryTiles reply channel closed (caller dropped)");
                }
            }
            Command::QuerySelfInfo { reply } => {
                if reply.send(self.state.self_info().cloned()).is_err() {
                    debug!("QuerySelfInfo reply channel closed (caller dropped)");
                }
            }
            Command::QueryOptimisticSelfInfo { reply } => {
                if reply
                    .send(self.state.optimistic_self_info().cloned())
                    .is_err()
                {
                    debug!("QueryOptimisticSelfInfo reply channel closed (caller dropped)");
                }
            }
            Command::QueryWins { reply } => {
                if reply.send(self.state.wins()).is_err() {
                    debug!("QueryWins reply channel closed (caller dropped)");
                }
            }
            Command::QueryIntent { action_id, reply } => {
                let status = self.intents.status(&action_id).cloned();
                if reply.send(status).is_err() {
                    debug!("QueryIntent reply channel closed (caller dropped)");
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------------

    /// Validates `request` against the current state and launches its pipeline.
    fn start_intent(&mut self, request: IntentRequest) -> Result<ActionId> {
        let job = self.validate(request)?;
        let method = job.method();
        let action_id = ActionId::random(&mut self.rng);

        self.intents.create(action_id.clone(), method);
        info!(%action_id, %method, "intent created");
        self.event_bus
            .publish(Event::Intent(IntentEvent::Created {
                action_id: action_id.clone(),
                method,
            }));

        pipeline::spawn(self.pipeline.clone(), action_id.clone(), job);
        Ok(action_id)
    }

    fn validate(&self, request: IntentRequest) -> Result<IntentJob> {
        match request {
            IntentRequest::Init { x, y } => {
                self.check_bounds(x, y)?;
                Ok(IntentJob::Init { x, y })
            }
            IntentRequest::Move { x, y } => {
                self.check_bounds(x, y)?;
                let from = self.confirmed_self()?;
                Ok(IntentJob::Move { from, x, y })
            }
            IntentRequest::Battle { opponent } => {
                let mine = self.confirmed_self()?;
                let theirs = self
                    .state
                    .ledger()
                    .current_location(&opponent)
                    .copied()
                    .ok_or(GameError::UnknownOpponent(opponent))?;
                Ok(IntentJob::Battle {
                    mine,
                    opponent,
                    theirs,
                })
            }
            IntentRequest::Claim { x, y } => {
                self.check_bounds(x, y)?;
                let mine = self.confirmed_self()?;
                Ok(IntentJob::Claim { mine, x, y })
            }
        }
    }

    fn check_bounds(&self, x: u64, y: u64) -> Result<()> {
        if self.state.in_bounds(x, y) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds {
                x,
                y,
                grid_upper_bound: self.state.grid_upper_bound(),
            })
        }
    }

    fn confirmed_self(&self) -> Result<CommitmentInfo> {
        self.state
            .self_info()
            .cloned()
            .ok_or(GameError::NotInitialized)
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Proved {
                action_id,
                optimistic,
                args,
                ack,
            } => {
                if let Some(info) = optimistic {
                    debug!(%action_id, x = info.x, y = info.y, "optimistic location set");
                    self.state.set_optimistic(info, action_id.clone());
                }
                if self.intents.ready(&action_id, args) {
                    self.publish_intent(IntentEvent::Proved {
                        action_id: action_id.clone(),
                    });
                }
                if ack.send(()).is_err() {
                    debug!(%action_id, "intent pipeline gone before ack");
                }
            }
            Internal::Submitted { action_id, tx_hash } => {
                self.on_submitted(action_id, tx_hash);
            }
            Internal::Confirmed { action_id, tx_hash } => {
                self.on_confirmed(action_id, tx_hash);
            }
            Internal::Reverted { action_id, reason } => {
                self.on_reverted(action_id, reason);
            }
            Internal::Failed { action_id, error } => {
                self.state.rollback(&action_id);
                if self.intents.failed(&action_id, error.clone()) {
                    error!(%action_id, %error, "intent failed");
                    self.publish_intent(IntentEvent::Failed { action_id, error });
                }
            }
        }
    }

    fn handle_tx_event(&mut self, event: TxEvent) {
        if !self.intents.contains(event.action_id()) {
            return;
        }
        match event {
            TxEvent::Submitted(tx) => self.on_submitted(tx.intent.action_id, tx.tx_hash),
            TxEvent::Confirmed(tx) => self.on_confirmed(tx.intent.action_id, tx.tx_hash),
            TxEvent::Reverted { intent, reason, .. } => self.on_reverted(intent.action_id, reason),
        }
    }

    fn on_submitted(&mut self, action_id: ActionId, tx_hash: String) {
        if self.intents.submitted(&action_id, tx_hash.clone()) {
            info!(%action_id, %tx_hash, "transaction submitted");
            self.publish_intent(IntentEvent::Submitted { action_id, tx_hash });
        }
    }

    fn on_confirmed(&mut self, action_id: ActionId, tx_hash: String) {
        if self.intents.confirmed(&action_id, tx_hash.clone()) {
            info!(%action_id, %tx_hash, "transaction confirmed");
            self.publish_intent(IntentEvent::Confirmed { action_id, tx_hash });
        }
    }

    fn on_reverted(&mut self, action_id: ActionId, reason: String) {
        self.state.rollback(&action_id);
        if self.intents.reverted(&action_id, reason.clone()) {
            warn!(%action_id, %reason, "transaction reverted");
            self.publish_intent(IntentEvent::Reverted { action_id, reason });
        }
    }

    fn publish_intent(&self, event: IntentEvent) {
        self.event_bus.publish(Event::Intent(event));
    }

    // ------------------------------------------------------------------------
    // Chain and miner events
    // ------------------------------------------------------------------------

    async fn handle_contract_event(&mut self, event: ContractEvent) {
        match event {
            ContractEvent::PlayerUpdated {
                mover,
                commitment,
                block_number,
            } => self.on_player_updated(mover, commitment, block_number).await,
            ContractEvent::BattleUpdated { player1, player2 } => {
                self.on_battle_updated(player1, player2).await
            }
        }
    }

    async fn on_player_updated(&mut self, mover: Address, commitment: Commitment, block: u64) {
        let latest = match self.chain.block_number().await {
            Ok(latest) => latest,
            Err(err) => {
                warn!(error = %err, "block number unavailable, using event block");
                block
            }
        };

        let update = self
            .state
            .apply_player_updated(mover, commitment, block, latest);
        debug!(
            %mover,
            %commitment,
            block,
            revealed = update.revealed,
            promoted = update.promoted,
            "player updated"
        );
        self.event_bus.publish(Event::PlayerUpdated);
    }

    /// Any battle may settle a pending result for this account, so wins are
    /// re-read on every event.
    async fn on_battle_updated(&mut self, player1: Address, player2: Address) {
        debug!(%player1, %player2, "battle updated");
        match self.chain.wins(self.state.account()).await {
            Ok(wins) => {
                if wins != self.state.wins() {
                    info!(wins, "battle result recorded");
                }
                self.state.set_wins(wins);
            }
            Err(err) => error!(error = %err, "failed to refresh wins"),
        }
        self.event_bus.publish(Event::BattleUpdated);
    }

    fn handle_miner_message(&mut self, message: MinerMessage) {
        if !self.miner.accept(&message) {
            debug!(run_id = message.run_id(), "dropping stale mining result");
            return;
        }
        if let MinerMessage::Mined { commitments, .. } = message {
            let revealed = self.state.apply_mined(&commitments);
            debug!(batch = commitments.len(), revealed, "mined batch applied");
            self.event_bus.publish(Event::MinedTilesUpdated);
        }
    }
}
