//! ZK primitives shared by the game client.
//!
//! This crate owns every piece that must agree bit-for-bit with the on-chain
//! verifier and the circom circuits:
//! - **Codec**: MiMC sponge over the BN254 scalar field, location commitments,
//!   the hash-of-hashes binding a proof to a window of observed block hashes
//! - **Circuits**: circuit identifiers, compiled artifact locations, and the
//!   exact witness layouts each circuit expects
//! - **Prover**: the proving engine interface plus a stub engine for
//!   development and testing
//!
//! # Feature Flags
//!
//! - `stub` (default): enables [`StubProver`]
//!
//! # Examples
//!
//! ```toml
//! # Production: plug in a real engine behind `ProvingEngine`
//! zk = { path = "../zk", default-features = false }
//!
//! # Development / tests
//! zk = { path = "../zk", features = ["stub"] }
//! ```

pub mod circuit;
pub mod codec;
pub mod prover;

pub use circuit::{
    BattleWitness, CircuitArtifacts, CircuitId, CircuitRegistry, InitWitness, MoveWitness,
    WitnessInput,
};
pub use codec::{
    CodecError, Commitment, Fr, LocationSecret, RawCommitment, candidate_pairs, choose_secret, commitment,
    hash_of_hashes, mimc_sponge, parse_blockhash, parse_decimal, to_decimal,
};
pub use prover::{Groth16Proof, ProofData, ProofError, ProvingEngine, VerifierArgs};

#[cfg(feature = "stub")]
pub use prover::StubProver;
