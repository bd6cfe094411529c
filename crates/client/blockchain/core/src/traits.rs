//! Chain executor abstraction traits.
//!
//! This module defines a layered chain abstraction:
//! - Layer 0: ContractReader, TransactionExecutor, EventSource
//! - Layer 1: ChainExecutor (composite trait)

use std::ops::RangeInclusive;

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio::sync::broadcast;

use crate::types::{Address, BlockInfo, ContractEvent, TxEvent, TxIntent, TxReceipts};

// ============================================================================
// Error Types
// ============================================================================

/// Read-side and connectivity errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract call failed: {0}")]
    Contract(String),

    #[error("Block {0} is not available")]
    UnknownBlock(u64),

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Write-side errors, from the local guard up to on-chain reverts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    #[error("no signer")]
    NoSigner,

    #[error("balance too low: {balance} wei < {required} wei")]
    InsufficientBalance { balance: u128, required: u128 },

    #[error("transaction rejected before submission: {0}")]
    Rejected(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("executor dropped the transaction")]
    Dropped,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

// ============================================================================
// Layer 0: Capabilities
// ============================================================================

/// View calls against the game contract and block queries.
#[async_trait]
pub trait ContractReader: Send + Sync {
    async fn grid_upper_bound(&self) -> Result<u64, TransportError>;

    async fn salt_upper_bound(&self) -> Result<u64, TransportError>;

    async fn wins(&self, player: Address) -> Result<u64, TransportError>;

    /// Raw two's complement words as returned by the contract.
    async fn battle_power(&self, player: Address) -> Result<Vec<BigUint>, TransportError>;

    async fn block_number(&self) -> Result<u64, TransportError>;

    async fn block(&self, number: u64) -> Result<BlockInfo, TransportError>;

    /// Fetches a contiguous range of blocks, oldest first.
    ///
    /// The default issues one request per block; backends with batch RPC
    /// should override it.
    async fn blocks(&self, range: RangeInclusive<u64>) -> Result<Vec<BlockInfo>, TransportError> {
        let mut blocks = Vec::new();
        for number in range {
            blocks.push(self.block(number).await?);
        }
        Ok(blocks)
    }
}

/// Signs, submits and tracks contract writes.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
    /// Signing account, if a wallet is connected.
    fn account(&self) -> Option<Address>;

    async fn balance(&self, account: Address) -> Result<u128, TransportError>;

    /// Hands an intent to the executor. Lifecycle outcomes arrive through the
    /// returned receipts and through [`TransactionExecutor::subscribe_tx_events`].
    async fn queue_transaction(&self, intent: TxIntent) -> Result<TxReceipts, TxError>;

    fn subscribe_tx_events(&self) -> broadcast::Receiver<TxEvent>;
}

/// Contract event stream.
pub trait EventSource: Send + Sync {
    fn subscribe_contract_events(&self) -> broadcast::Receiver<ContractEvent>;
}

// ============================================================================
// Layer 1: Composite Trait
// ============================================================================

/// Everything the game engine needs from a chain.
pub trait ChainExecutor: ContractReader + TransactionExecutor + EventSource + Send + Sync {
    /// Backend name (e.g., "xDai", "mock").
    fn name(&self) -> &str;
}
