//! Commitment codec.
//!
//! Pure functions over the BN254 scalar field. Everything here is part of the
//! contract with the circuits and the on-chain verifier: the sponge parameters,
//! the round constants, and the order in which inputs are absorbed.

mod commitment;
mod field;
mod mimc;
mod preimage;
mod secret;

use thiserror::Error;

pub use commitment::{
    COMMITMENT_ROUNDS, Commitment, HASH_OF_HASHES_ROUNDS, SPONGE_KEY, commitment, hash_of_hashes,
};
pub use field::{Fr, fr_decimal, parse_blockhash, parse_decimal, reduce, to_biguint, to_decimal};
pub use mimc::{MAX_ROUNDS, mimc_sponge, round_constants};
pub use preimage::RawCommitment;
pub use secret::{LocationSecret, candidate_pairs, choose_secret};

/// Errors raised while encoding or decoding codec values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("invalid decimal field element: {0:?}")]
    InvalidDecimal(String),

    #[error("invalid hex block hash: {0:?}")]
    InvalidBlockhash(String),

    #[error("MiMC rounds must be in 1..={max}, got {rounds}")]
    InvalidRounds { rounds: usize, max: usize },

    #[error("sponge must squeeze at least one output")]
    NoOutputs,

    #[error("no candidate block hashes to choose from")]
    NoCandidates,

    #[error("salt upper bound must be positive")]
    EmptySaltRange,
}
