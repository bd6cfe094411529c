//! Circuit identifiers, compiled artifacts, and witness layouts.
//!
//! Each game action has its own circom circuit compiled to a `.wasm` witness
//! generator and a `.zkey` proving key. The registry only records where those
//! live; loading them is the proving engine's job.

mod witness;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use witness::{BattleWitness, InitWitness, MoveWitness, WitnessInput};

/// One circuit per proof-gated contract method.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CircuitId {
    /// First placement of a player on the grid
    Init,
    /// Transition from a committed location to an adjacent one
    Move,
    /// Proof that two committed locations can fight
    Battle,
}

/// Compiled artifact pair for one circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArtifacts {
    /// Witness generator (`.wasm`)
    pub wasm: PathBuf,
    /// Groth16 proving key (`.zkey`)
    pub zkey: PathBuf,
}

/// Maps each circuit to its compiled artifacts.
#[derive(Clone, Debug, Default)]
pub struct CircuitRegistry {
    artifacts: HashMap<CircuitId, CircuitArtifacts>,
}

impl CircuitRegistry {
    /// Empty registry; every lookup fails until artifacts are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `<dir>/<circuit>.wasm` and `<dir>/<circuit>.zkey` for every circuit.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        use strum::IntoEnumIterator;

        let dir = dir.as_ref();
        let artifacts = CircuitId::iter()
            .map(|id| {
                let artifacts = CircuitArtifacts {
                    wasm: dir.join(format!("{id}.wasm")),
                    zkey: dir.join(format!("{id}.zkey")),
                };
                (id, artifacts)
            })
            .collect();

        Self { artifacts }
    }

    /// Overrides the artifacts of a single circuit.
    pub fn with(mut self, id: CircuitId, artifacts: CircuitArtifacts) -> Self {
        self.artifacts.insert(id, artifacts);
        self
    }

    pub fn get(&self, id: CircuitId) -> Option<&CircuitArtifacts> {
        self.artifacts.get(&id)
    }
}
