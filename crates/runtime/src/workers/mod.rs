//! Worker tasks that back the game runtime.
//!
//! The game worker owns all game state and reacts to commands and chain
//! events. The proof queue and the miner offload CPU-heavy work to blocking
//! threads and report back through channels.

mod game;
mod metrics;
mod miner;
mod prover;
mod spiral;

pub use game::{Command, GameWorker, IntentRequest};
pub use metrics::{MetricsSnapshot, ProofMetrics};
pub use miner::{Miner, MinerMessage, MinerState, MiningParams, explore};
pub use prover::ProofQueue;
pub use spiral::SpiralOffsets;
