//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, the chain executor, the proof
//! queue and the codec so clients can bubble them up with consistent context.
use client_blockchain_core::{Address, TransportError, TxError};
use thiserror::Error;
use tokio::sync::oneshot;
use zk::{CodecError, ProofError};

pub type Result<T> = std::result::Result<T, GameError>;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("no account on chain connection")]
    NoAccount,

    #[error("game worker command channel closed")]
    CommandChannelClosed,

    #[error("game worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("game worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("player has no confirmed location yet")]
    NotInitialized,

    #[error("({x}, {y}) is outside the {grid_upper_bound}x{grid_upper_bound} grid")]
    OutOfBounds { x: u64, y: u64, grid_upper_bound: u64 },

    #[error("a {grid_upper_bound}x{grid_upper_bound} grid exceeds the supported {max}x{max}")]
    GridTooLarge { grid_upper_bound: u64, max: u64 },

    #[error("location of {0} is not known")]
    UnknownOpponent(Address),

    #[error("chain head {latest_block} is too low for a {window}-block hash window")]
    ChainTooShort { latest_block: u64, window: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    ProofQueue(#[from] ProofQueueError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<ProofError> for GameError {
    fn from(error: ProofError) -> Self {
        GameError::ProofQueue(ProofQueueError::Proof(error))
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProofQueueError {
    #[error("proof queue is shut down")]
    Closed,

    #[error("proof task {task_id} was dropped before completion")]
    Dropped { task_id: u64 },

    #[error("proof task {task_id} panicked: {message}")]
    Panicked { task_id: u64, message: String },

    #[error(transparent)]
    Proof(#[from] ProofError),
}
