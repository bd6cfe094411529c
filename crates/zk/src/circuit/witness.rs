//! Witness layouts for the init, move, and battle circuits.
//!
//! Field names and order are fixed by the circom sources; every value is a
//! decimal string. Public signals are listed in circuit declaration order.

use serde::{Deserialize, Serialize};

use super::CircuitId;
use crate::codec::{Fr, RawCommitment, hash_of_hashes, to_decimal};

/// Witness for `init`: place a fresh location commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitWitness {
    pub x: String,
    pub y: String,
    pub blockhash: String,
    pub possible_hashes: Vec<String>,
    pub possible_hashes_hash: String,
    pub salt: String,
    pub salt_upper_bound: String,
    pub grid_upper_bound: String,
    pub commitment: String,
}

impl InitWitness {
    pub fn new(
        location: &RawCommitment,
        possible_hashes: &[Fr],
        salt_upper_bound: u64,
        grid_upper_bound: u64,
    ) -> Self {
        Self {
            x: location.x.to_string(),
            y: location.y.to_string(),
            blockhash: to_decimal(&location.blockhash),
            possible_hashes: possible_hashes.iter().map(to_decimal).collect(),
            possible_hashes_hash: to_decimal(&hash_of_hashes(possible_hashes)),
            salt: location.salt.to_string(),
            salt_upper_bound: salt_upper_bound.to_string(),
            grid_upper_bound: grid_upper_bound.to_string(),
            commitment: location.commitment.to_string(),
        }
    }

    pub fn public_signals(&self) -> Vec<String> {
        vec![
            self.commitment.clone(),
            self.possible_hashes_hash.clone(),
            self.salt_upper_bound.clone(),
            self.grid_upper_bound.clone(),
        ]
    }
}

/// Witness for `move`: old location and new location, both committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveWitness {
    pub old_x: String,
    pub old_y: String,
    pub old_blockhash: String,
    pub old_salt: String,
    pub old_commitment: String,
    pub new_x: String,
    pub new_y: String,
    pub new_blockhash: String,
    pub new_salt: String,
    pub new_commitment: String,
    pub possible_hashes: Vec<String>,
    pub possible_hashes_hash: String,
    pub salt_upper_bound: String,
    pub grid_upper_bound: String,
}

impl MoveWitness {
    pub fn new(
        old: &RawCommitment,
        new: &RawCommitment,
        possible_hashes: &[Fr],
        salt_upper_bound: u64,
        grid_upper_bound: u64,
    ) -> Self {
        Self {
            old_x: old.x.to_string(),
            old_y: old.y.to_string(),
            old_blockhash: to_decimal(&old.blockhash),
            old_salt: old.salt.to_string(),
            old_commitment: old.commitment.to_string(),
            new_x: new.x.to_string(),
            new_y: new.y.to_string(),
            new_blockhash: to_decimal(&new.blockhash),
            new_salt: new.salt.to_string(),
            new_commitment: new.commitment.to_string(),
            possible_hashes: possible_hashes.iter().map(to_decimal).collect(),
            possible_hashes_hash: to_decimal(&hash_of_hashes(possible_hashes)),
            salt_upper_bound: salt_upper_bound.to_string(),
            grid_upper_bound: grid_upper_bound.to_string(),
        }
    }

    pub fn public_signals(&self) -> Vec<String> {
        vec![
            self.old_commitment.clone(),
            self.new_commitment.clone(),
            self.possible_hashes_hash.clone(),
            self.salt_upper_bound.clone(),
            self.grid_upper_bound.clone(),
        ]
    }
}

/// Witness for `battle`: both fighters' revealed preimages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleWitness {
    pub my_x: String,
    pub my_y: String,
    pub my_blockhash: String,
    pub my_salt: String,
    pub my_commitment: String,
    pub your_x: String,
    pub your_y: String,
    pub your_blockhash: String,
    pub your_salt: String,
    pub your_commitment: String,
}

impl BattleWitness {
    pub fn new(mine: &RawCommitment, yours: &RawCommitment) -> Self {
        Self {
            my_x: mine.x.to_string(),
            my_y: mine.y.to_string(),
            my_blockhash: to_decimal(&mine.blockhash),
            my_salt: mine.salt.to_string(),
            my_commitment: mine.commitment.to_string(),
            your_x: yours.x.to_string(),
            your_y: yours.y.to_string(),
            your_blockhash: to_decimal(&yours.blockhash),
            your_salt: yours.salt.to_string(),
            your_commitment: yours.commitment.to_string(),
        }
    }

    pub fn public_signals(&self) -> Vec<String> {
        vec![self.my_commitment.clone(), self.your_commitment.clone()]
    }
}

/// Any witness the proof queue accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WitnessInput {
    Init(InitWitness),
    Move(MoveWitness),
    Battle(BattleWitness),
}

impl WitnessInput {
    pub fn circuit(&self) -> CircuitId {
        match self {
            WitnessInput::Init(_) => CircuitId::Init,
            WitnessInput::Move(_) => CircuitId::Move,
            WitnessInput::Battle(_) => CircuitId::Battle,
        }
    }

    pub fn public_signals(&self) -> Vec<String> {
        match self {
            WitnessInput::Init(w) => w.public_signals(),
            WitnessInput::Move(w) => w.public_signals(),
            WitnessInput::Battle(w) => w.public_signals(),
        }
    }

    /// The JSON object handed to the witness generator.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<InitWitness> for WitnessInput {
    fn from(witness: InitWitness) -> Self {
        WitnessInput::Init(witness)
    }
}

impl From<MoveWitness> for WitnessInput {
    fn from(witness: MoveWitness) -> Self {
        WitnessInput::Move(witness)
    }
}

impl From<BattleWitness> for WitnessInput {
    fn from(witness: BattleWitness) -> Self {
        WitnessInput::Battle(witness)
    }
}
