//! Chain executor abstraction for the zkgrid client.
//!
//! # Architecture
//!
//! ```text
//! Layer 1: ChainExecutor (composite trait)
//!          ├── ContractReader       view calls, blocks
//!          ├── TransactionExecutor  signer, balance, tx lifecycle
//!          └── EventSource          contract events
//! ```
//!
//! The engine never talks to an RPC node directly. A backend implements the
//! three capability traits; the game runtime only sees `Arc<dyn ChainExecutor>`.
//!
//! # Usage
//!
//! ```ignore
//! use client_blockchain_core::{ChainExecutor, ensure_can_transact};
//!
//! async fn submit(chain: &dyn ChainExecutor, intent: TxIntent) -> Result<(), TxError> {
//!     ensure_can_transact(chain, 2_000_000_000_000_000).await?;
//!     let mut receipts = chain.queue_transaction(intent).await?;
//!     receipts.submitted().await?;
//!     receipts.confirmed().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `mock`: enables [`MockChain`], an in-memory executor for local sessions and tests

pub mod guard;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use guard::ensure_can_transact;
pub use traits::{
    ChainExecutor, ContractReader, EventSource, TransactionExecutor, TransportError, TxError,
};
pub use types::{
    ActionId, Address, BlockInfo, CallArg, ContractEvent, ContractMethod, ParseAddressError,
    SubmittedTx, TxEvent, TxIntent, TxReceipts,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::{ConfirmHook, MockChain, echo_contract_events};
