//! Commitment bookkeeping across every observed address.

use std::collections::HashMap;

use client_blockchain_core::Address;
use zk::{Commitment, RawCommitment};

use super::types::CommitmentMetadata;

/// Who posted which commitment, and which preimages are known.
///
/// `address_to_latest_commitment[a]` always names the single metadata entry
/// for `a` with `is_current = true`. Known preimages are never evicted.
#[derive(Debug, Default, Clone)]
pub struct CommitmentLedger {
    address_to_latest_commitment: HashMap<Address, Commitment>,
    commitment_to_metadata: HashMap<Commitment, CommitmentMetadata>,
    commitment_to_mined_commitment: HashMap<Commitment, RawCommitment>,
}

impl CommitmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an on-chain commitment and supersedes the poster's previous one.
    ///
    /// Returns the superseded commitment, if any.
    pub fn record_posted(
        &mut self,
        address: Address,
        commitment: Commitment,
        block_num: u64,
    ) -> Option<Commitment> {
        let previous = self.address_to_latest_commitment.insert(address, commitment);
        if let Some(previous) = previous {
            if let Some(meta) = self.commitment_to_metadata.get_mut(&previous) {
                if meta.address == address {
                    meta.is_current = false;
                }
            }
        }

        // A commitment reposted under another address leaves that address
        // without a current entry.
        if let Some(existing) = self.commitment_to_metadata.get(&commitment) {
            if existing.address != address
                && self.address_to_latest_commitment.get(&existing.address) == Some(&commitment)
            {
                let stale = existing.address;
                self.address_to_latest_commitment.remove(&stale);
            }
        }

        self.commitment_to_metadata.insert(
            commitment,
            CommitmentMetadata {
                commitment,
                address,
                block_num,
                is_current: true,
            },
        );

        previous.filter(|prev| *prev != commitment)
    }

    /// Stores a discovered preimage. Returns `false` if it was already known.
    pub fn record_mined(&mut self, raw: RawCommitment) -> bool {
        use std::collections::hash_map::Entry;

        match self.commitment_to_mined_commitment.entry(raw.commitment) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(raw);
                true
            }
        }
    }

    pub fn latest_commitment(&self, address: &Address) -> Option<&Commitment> {
        self.address_to_latest_commitment.get(address)
    }

    pub fn metadata(&self, commitment: &Commitment) -> Option<&CommitmentMetadata> {
        self.commitment_to_metadata.get(commitment)
    }

    pub fn mined(&self, commitment: &Commitment) -> Option<&RawCommitment> {
        self.commitment_to_mined_commitment.get(commitment)
    }

    /// Preimage of `address`'s current location, if it has been revealed.
    pub fn current_location(&self, address: &Address) -> Option<&RawCommitment> {
        self.latest_commitment(address)
            .and_then(|commitment| self.mined(commitment))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.address_to_latest_commitment.keys()
    }

    pub fn metadata_entries(&self) -> impl Iterator<Item = &CommitmentMetadata> {
        self.commitment_to_metadata.values()
    }

    pub fn mined_count(&self) -> usize {
        self.commitment_to_mined_commitment.len()
    }
}
