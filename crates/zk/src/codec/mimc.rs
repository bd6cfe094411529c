//! MiMC sponge over the BN254 scalar field.
//!
//! Feistel construction with an x^5 S-box, matching circomlib's `MiMCSponge`
//! template:
//! - round constants: `c[0] = 0`, `c[i] = keccak256^(i+1)("mimcsponge") mod p`
//! - every round but the last swaps the halves and adds `c[i]`
//! - the last round adds no constant and does not swap
//!
//! Inputs are absorbed by adding them to the left half and mixing; each extra
//! output costs one more mix.
//!
//! # Performance
//!
//! Round constants are derived once and cached in a `OnceLock`.

use std::sync::OnceLock;

use ark_ff::{Field, PrimeField, Zero};
use tiny_keccak::{Hasher, Keccak};

use super::{CodecError, Fr};

/// Number of constants circomlib generates (the commitment round count).
pub const MAX_ROUNDS: usize = 220;

const SEED: &[u8] = b"mimcsponge";

static ROUND_CONSTANTS: OnceLock<Vec<Fr>> = OnceLock::new();

/// Cached round constants shared by every sponge instance.
pub fn round_constants() -> &'static [Fr] {
    ROUND_CONSTANTS.get_or_init(|| {
        let mut constants = Vec::with_capacity(MAX_ROUNDS);
        constants.push(Fr::zero());

        let mut digest = keccak256(SEED);
        for _ in 1..MAX_ROUNDS {
            digest = keccak256(&digest);
            constants.push(Fr::from_be_bytes_mod_order(&digest));
        }

        // never read by the mix; circomlib pins it to zero
        constants[MAX_ROUNDS - 1] = Fr::zero();
        constants
    })
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

#[inline]
fn pow5(value: Fr) -> Fr {
    let squared = value.square();
    squared.square() * value
}

struct FeistelState {
    left: Fr,
    right: Fr,
    key: Fr,
    rounds: usize,
}

impl FeistelState {
    fn new(rounds: usize, key: u64) -> Self {
        Self {
            left: Fr::zero(),
            right: Fr::zero(),
            key: Fr::from(key),
            rounds,
        }
    }

    fn inject(&mut self, element: Fr) {
        self.left += element;
    }

    fn mix(&mut self) {
        let constants = round_constants();
        for constant in &constants[..self.rounds - 1] {
            let t = self.left + self.key + constant;
            let next = self.right + pow5(t);
            self.right = self.left;
            self.left = next;
        }

        let t = self.left + self.key;
        self.right += pow5(t);
    }
}

/// Sponge with pre-validated parameters.
pub(crate) fn sponge(inputs: &[Fr], n_outputs: usize, rounds: usize, key: u64) -> Vec<Fr> {
    let mut state = FeistelState::new(rounds, key);
    for input in inputs {
        state.inject(*input);
        state.mix();
    }

    let mut outputs = Vec::with_capacity(n_outputs);
    outputs.push(state.left);
    for _ in 1..n_outputs {
        state.mix();
        outputs.push(state.left);
    }
    outputs
}

/// MiMC sponge hash of `inputs`, squeezing `n_outputs` field elements.
pub fn mimc_sponge(
    inputs: &[Fr],
    n_outputs: usize,
    rounds: usize,
    key: u64,
) -> Result<Vec<Fr>, CodecError> {
    if rounds == 0 || rounds > MAX_ROUNDS {
        return Err(CodecError::InvalidRounds {
            rounds,
            max: MAX_ROUNDS,
        });
    }
    if n_outputs == 0 {
        return Err(CodecError::NoOutputs);
    }
    Ok(sponge(inputs, n_outputs, rounds, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn felts(values: &[u64]) -> Vec<Fr> {
        values.iter().copied().map(Fr::from).collect()
    }

    #[test]
    fn constants_are_pinned_at_both_ends() {
        let constants = round_constants();
        assert_eq!(constants.len(), MAX_ROUNDS);
        assert!(constants[0].is_zero());
        assert!(constants[MAX_ROUNDS - 1].is_zero());
        assert!(constants[1..MAX_ROUNDS - 1].iter().all(|c| !c.is_zero()));
    }

    #[test]
    fn constants_follow_keccak_chain() {
        let first = keccak256(&keccak256(SEED));
        assert_eq!(round_constants()[1], Fr::from_be_bytes_mod_order(&first));

        let second = keccak256(&first);
        assert_eq!(round_constants()[2], Fr::from_be_bytes_mod_order(&second));
    }

    #[test]
    fn sponge_is_deterministic() {
        let inputs = felts(&[1, 2, 3, 4]);
        let a = mimc_sponge(&inputs, 1, 220, 123).unwrap();
        let b = mimc_sponge(&inputs, 1, 220, 123).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn key_and_rounds_change_the_output() {
        let inputs = felts(&[1, 2, 3, 4]);
        let base = mimc_sponge(&inputs, 1, 220, 123).unwrap();
        assert_ne!(base, mimc_sponge(&inputs, 1, 220, 0).unwrap());
        assert_ne!(base, mimc_sponge(&inputs, 1, 22, 123).unwrap());
    }

    #[test]
    fn input_order_matters() {
        let a = mimc_sponge(&felts(&[1, 2]), 1, 220, 123).unwrap();
        let b = mimc_sponge(&felts(&[2, 1]), 1, 220, 123).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn extra_outputs_extend_the_first() {
        let inputs = felts(&[9, 9]);
        let one = mimc_sponge(&inputs, 1, 220, 123).unwrap();
        let three = mimc_sponge(&inputs, 3, 220, 123).unwrap();
        assert_eq!(three.len(), 3);
        assert_eq!(one[0], three[0]);
        assert_ne!(three[1], three[2]);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            mimc_sponge(&[], 1, 0, 0),
            Err(CodecError::InvalidRounds {
                rounds: 0,
                max: MAX_ROUNDS
            })
        );
        assert!(mimc_sponge(&[], 1, MAX_ROUNDS + 1, 0).is_err());
        assert_eq!(mimc_sponge(&[], 0, 220, 0), Err(CodecError::NoOutputs));
    }
}
