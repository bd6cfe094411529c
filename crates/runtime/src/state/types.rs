//! Plain data records held by the game state.

use client_blockchain_core::{ActionId, Address};
use serde::{Deserialize, Serialize};
use zk::{Commitment, Fr, LocationSecret, RawCommitment, codec::fr_decimal};

/// Grid cell coordinates, each in `[0, gridUpperBound)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldCoords {
    pub x: u64,
    pub y: u64,
}

impl WorldCoords {
    pub const fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// Plaintext preimage of a commitment together with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentInfo {
    pub x: u64,
    pub y: u64,
    #[serde(with = "fr_decimal")]
    pub blockhash: Fr,
    pub salt: u64,
    pub commitment: Commitment,
    pub address: Address,
}

impl CommitmentInfo {
    pub fn from_raw(raw: &RawCommitment, address: Address) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            blockhash: raw.blockhash,
            salt: raw.salt,
            commitment: raw.commitment,
            address,
        }
    }

    pub fn raw(&self) -> RawCommitment {
        RawCommitment {
            x: self.x,
            y: self.y,
            blockhash: self.blockhash,
            salt: self.salt,
            commitment: self.commitment,
        }
    }

    pub fn coords(&self) -> WorldCoords {
        WorldCoords::new(self.x, self.y)
    }

    pub fn secret(&self) -> LocationSecret {
        LocationSecret {
            blockhash: self.blockhash,
            salt: self.salt,
        }
    }
}

/// Speculative self location awaiting on-chain confirmation.
///
/// `action_id` is [`ActionId::none`] once nothing is pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimisticCommitmentInfo {
    #[serde(flatten)]
    pub info: CommitmentInfo,
    pub action_id: ActionId,
}

impl OptimisticCommitmentInfo {
    pub fn is_pending(&self) -> bool {
        !self.action_id.is_none()
    }
}

/// Public record of a posted commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentMetadata {
    pub commitment: Commitment,
    pub address: Address,
    /// Absolute block number in the ledger; "blocks ago" in tile snapshots.
    pub block_num: u64,
    pub is_current: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, Default,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TileKnowledge {
    #[default]
    Unknown,
    Known,
}

/// Read-side view of one grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub coords: WorldCoords,
    pub tile_type: TileKnowledge,
    pub metas: Vec<CommitmentMetadata>,
}
