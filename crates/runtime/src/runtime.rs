//! High-level runtime orchestrator.
//!
//! The runtime reads the game bounds from the chain, spawns the proof queue
//! and the game worker, wires up command/event channels, and exposes a
//! [`GameHandle`] for clients.

use std::sync::Arc;

use client_blockchain_core::ChainExecutor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;
use zk::{CircuitRegistry, ProvingEngine};

use crate::api::{GameError, GameHandle, Result};
use crate::config::RuntimeConfig;
use crate::events::EventBus;
use crate::state::GameState;
use crate::workers::{GameWorker, ProofMetrics, ProofQueue};

/// Main runtime that owns the background workers
///
/// [`GameHandle`] provides a cloneable façade for clients.
pub struct GameRuntime {
    handle: GameHandle,
    proofs: ProofQueue,
    game_worker: JoinHandle<()>,
    prover_worker: JoinHandle<()>,
}

impl GameRuntime {
    /// Connects to the game and starts the workers.
    ///
    /// Fails with [`GameError::NoAccount`] if the chain connection has no
    /// signer; nothing can be played without one.
    pub async fn start(
        chain: Arc<dyn ChainExecutor>,
        prover: Arc<dyn ProvingEngine>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let account = chain.account().ok_or(GameError::NoAccount)?;
        let grid_upper_bound = chain.grid_upper_bound().await?;
        let salt_upper_bound = chain.salt_upper_bound().await?;
        let baseline_block = chain.block_number().await?;

        info!(
            %account,
            chain = chain.name(),
            grid_upper_bound,
            salt_upper_bound,
            baseline_block,
            "starting game runtime"
        );

        let state = GameState::new(account, grid_upper_bound, salt_upper_bound, baseline_block)?;

        let registry = CircuitRegistry::from_dir(&config.artifacts_dir);
        let (proofs, prover_worker) =
            ProofQueue::spawn(prover, registry, config.proof_queue_capacity);

        let event_bus = EventBus::with_capacity(config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size);

        let worker = GameWorker::new(
            state,
            Arc::clone(&chain),
            proofs.clone(),
            command_rx,
            event_bus.clone(),
            config.snark_hash_window,
            config.command_buffer_size,
        );
        let game_worker = tokio::spawn(worker.run());

        let handle = GameHandle::new(
            command_tx,
            event_bus,
            chain,
            grid_upper_bound,
            salt_upper_bound,
            config.min_balance_wei,
            config.miner,
        );

        Ok(Self {
            handle,
            proofs,
            game_worker,
            prover_worker,
        })
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> GameHandle {
        self.handle.clone()
    }

    pub fn proof_metrics(&self) -> Arc<ProofMetrics> {
        self.proofs.metrics()
    }

    /// Shutdown the runtime gracefully
    ///
    /// Waits for the game worker, which exits once every [`GameHandle`] clone
    /// is dropped. A proof still in flight is abandoned.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);
        drop(self.proofs);

        self.game_worker.await.map_err(GameError::WorkerJoin)?;

        // Pipelines still waiting on receipts keep queue handles alive.
        self.prover_worker.abort();
        match self.prover_worker.await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => {}
            Err(err) => return Err(GameError::WorkerJoin(err)),
        }

        info!("game runtime stopped");
        Ok(())
    }
}
