//! Location commitments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::mimc::sponge;
use super::{CodecError, Fr, parse_decimal, to_decimal};

/// Rounds used for location commitments (matches the init/move circuits).
pub const COMMITMENT_ROUNDS: usize = 220;

/// Rounds used for the hash over candidate block hashes.
pub const HASH_OF_HASHES_ROUNDS: usize = 22;

/// Sponge key shared by both hashes.
pub const SPONGE_KEY: u64 = 123;

/// Hash binding `(x, y, blockhash, salt)` without revealing it.
///
/// Serialized as a decimal string; usable as a map key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Commitment(Fr);

impl Commitment {
    pub const fn from_field(value: Fr) -> Self {
        Self(value)
    }

    pub fn as_field(&self) -> Fr {
        self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_decimal(&self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self)
    }
}

impl FromStr for Commitment {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s).map(Self)
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Commitment to a location: `MiMC([x, y, blockhash, salt], rounds = 220, key = 123)`.
pub fn commitment(x: u64, y: u64, blockhash: Fr, salt: u64) -> Commitment {
    let inputs = [Fr::from(x), Fr::from(y), blockhash, Fr::from(salt)];
    Commitment(sponge(&inputs, 1, COMMITMENT_ROUNDS, SPONGE_KEY)[0])
}

/// Hash over the candidate block-hash window, a public input of init/move.
pub fn hash_of_hashes(candidates: &[Fr]) -> Fr {
    sponge(candidates, 1, HASH_OF_HASHES_ROUNDS, SPONGE_KEY)[0]
}
