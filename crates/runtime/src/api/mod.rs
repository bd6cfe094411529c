//! Public API surface of the game runtime.
//!
//! Re-exports the error types and the [`GameHandle`] façade.
mod errors;
mod handle;

pub use errors::{GameError, ProofQueueError, Result};
pub use handle::GameHandle;
