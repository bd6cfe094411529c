//! Game state owned by the game worker.
//!
//! - [`GameState`] folds events, mining results and optimistic updates together
//! - [`CommitmentLedger`] tracks posted commitments and known preimages
//! - [`TileGrid`] tracks per-cell knowledge
//! - [`decode_battle_power`] undoes the contract's fixed-point encoding

mod game;
mod ledger;
mod power;
mod tiles;
mod types;

pub use game::{GameState, PlayerUpdate};
pub use ledger::CommitmentLedger;
pub use power::{BattlePower, POWER_DECIMALS, decode_battle_power};
pub use tiles::{MAX_GRID_UPPER_BOUND, TileGrid};
pub use types::{
    CommitmentInfo, CommitmentMetadata, OptimisticCommitmentInfo, Tile, TileKnowledge, WorldCoords,
};
