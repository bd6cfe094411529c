//! Snark input assembly and verifier call arguments.

use client_blockchain_core::{CallArg, ContractReader};
use zk::{Fr, ProofData, ProofError, parse_blockhash};

use crate::api::{GameError, Result};

/// Recent block hashes a location commitment may draw its randomness from.
#[derive(Debug, Clone)]
pub struct HashWindow {
    pub first_block: u64,
    pub latest_block: u64,
    /// Oldest first, reduced into the field.
    pub hashes: Vec<Fr>,
}

/// Reads the `size` most recent block hashes, ending at the current head.
pub async fn fetch_hash_window<C>(chain: &C, size: u64) -> Result<HashWindow>
where
    C: ContractReader + ?Sized,
{
    let latest_block = chain.block_number().await?;
    let Some(first_block) = (latest_block + 1).checked_sub(size) else {
        return Err(GameError::ChainTooShort {
            latest_block,
            window: size,
        });
    };

    let blocks = chain.blocks(first_block..=latest_block).await?;
    let hashes = blocks
        .iter()
        .map(|block| parse_blockhash(&block.hash))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(HashWindow {
        first_block,
        latest_block,
        hashes,
    })
}

/// Verifier arguments `[a, b, c, publicSignals]` as the contract expects them.
pub fn proof_call_args(proof: &ProofData) -> std::result::Result<Vec<CallArg>, ProofError> {
    let args = proof.verifier_args()?;
    Ok(vec![
        CallArg::array(args.a),
        CallArg::Array(args.b.into_iter().map(CallArg::array).collect()),
        CallArg::array(args.c),
        CallArg::array(args.signals),
    ])
}

/// `[firstBlock, latestBlock, a, b, c, publicSignals]` for init and move.
pub fn location_call_args(
    window: &HashWindow,
    proof: &ProofData,
) -> std::result::Result<Vec<CallArg>, ProofError> {
    let mut args = vec![
        CallArg::uint(window.first_block),
        CallArg::uint(window.latest_block),
    ];
    args.extend(proof_call_args(proof)?);
    Ok(args)
}
