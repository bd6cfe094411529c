//! Private location randomness: which observed block hash and which salt.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{CodecError, Fr};

/// The private half of a location commitment's preimage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationSecret {
    pub blockhash: Fr,
    pub salt: u64,
}

/// Picks a block hash uniformly from `candidates` and a salt uniformly from
/// `[0, salt_upper_bound)`. Deterministic for a seeded `rng`.
pub fn choose_secret<R: Rng + ?Sized>(
    rng: &mut R,
    candidates: &[Fr],
    salt_upper_bound: u64,
) -> Result<LocationSecret, CodecError> {
    if salt_upper_bound == 0 {
        return Err(CodecError::EmptySaltRange);
    }
    let blockhash = *candidates.choose(rng).ok_or(CodecError::NoCandidates)?;
    let salt = rng.gen_range(0..salt_upper_bound);
    Ok(LocationSecret { blockhash, salt })
}

/// Every `(blockhash, salt)` pair a location could have been committed with,
/// blockhash-major.
pub fn candidate_pairs(
    candidates: &[Fr],
    salt_upper_bound: u64,
) -> impl Iterator<Item = LocationSecret> + '_ {
    candidates.iter().flat_map(move |blockhash| {
        (0..salt_upper_bound).map(move |salt| LocationSecret {
            blockhash: *blockhash,
            salt,
        })
    })
}
