//! Plaintext preimages of location commitments.

use serde::{Deserialize, Serialize};

use super::{Commitment, Fr, LocationSecret, commitment, field::fr_decimal};

/// `(x, y, blockhash, salt)` together with the commitment it hashes to.
///
/// Known to a location's owner, or recovered by brute force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCommitment {
    pub x: u64,
    pub y: u64,
    #[serde(with = "fr_decimal")]
    pub blockhash: Fr,
    pub salt: u64,
    pub commitment: Commitment,
}

impl RawCommitment {
    /// Hashes a location with its secret.
    pub fn compute(x: u64, y: u64, secret: LocationSecret) -> Self {
        Self {
            x,
            y,
            blockhash: secret.blockhash,
            salt: secret.salt,
            commitment: commitment(x, y, secret.blockhash, secret.salt),
        }
    }

    pub fn secret(&self) -> LocationSecret {
        LocationSecret {
            blockhash: self.blockhash,
            salt: self.salt,
        }
    }

    /// Recomputes the hash and checks it against the stored commitment.
    pub fn is_consistent(&self) -> bool {
        commitment(self.x, self.y, self.blockhash, self.salt) == self.commitment
    }
}
