//! Client-side game engine for the location commitment game.
//!
//! This crate turns player actions into proved contract calls and folds
//! optimistic updates, mining discoveries, and confirmed chain events into one
//! consistent view of the grid. Consumers start a [`GameRuntime`] against a
//! chain executor and a proving engine and drive it through [`GameHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator
//! - [`api`] exposes the handle and error types downstream clients interact with
//! - [`events`] provides the topic-based notification bus
//! - [`state`] is the synchronous reconciliation core
//! - [`intent`] tracks each action from creation to its terminal state
//! - [`snark`] assembles hash windows and verifier call arguments
//! - `workers` keeps the game worker, proof queue, and miner internal to the crate
pub mod api;
pub mod config;
pub mod events;
pub mod intent;
pub mod runtime;
pub mod snark;
pub mod state;

mod workers;

pub use api::{GameError, GameHandle, ProofQueueError, Result};
pub use config::{MinerConfig, RuntimeConfig};
pub use events::{Event, EventBus, IntentEvent, Topic};
pub use intent::{IntentRecord, IntentStatus, IntentTracker};
pub use runtime::GameRuntime;
pub use state::{
    BattlePower, CommitmentInfo, CommitmentMetadata, GameState, OptimisticCommitmentInfo, Tile,
    TileKnowledge, WorldCoords, decode_battle_power,
};
pub use workers::{
    IntentRequest, Miner, MinerMessage, MinerState, MetricsSnapshot, MiningParams, ProofMetrics,
    ProofQueue, SpiralOffsets, explore,
};
