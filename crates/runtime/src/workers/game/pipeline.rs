//! The asynchronous half of an intent: hashes, witness, proof, submission.
//!
//! Runs in its own task so the game worker keeps serving commands and chain
//! events while a proof is computed or a transaction is pending. Every state
//! change is reported back to the worker as an [`Internal`] message; the task
//! itself never touches game state.

use std::sync::Arc;

use client_blockchain_core::{
    ActionId, Address, CallArg, ChainExecutor, ContractMethod, TxError, TxIntent,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use zk::{
    BattleWitness, InitWitness, MoveWitness, RawCommitment, WitnessInput, choose_secret,
    to_decimal,
};

use crate::api::{GameError, Result};
use crate::snark::{HashWindow, fetch_hash_window, location_call_args, proof_call_args};
use crate::state::CommitmentInfo;
use crate::workers::ProofQueue;

/// Validated work for one action, with every read it needs captured up front.
#[derive(Debug, Clone)]
pub(crate) enum IntentJob {
    Init {
        x: u64,
        y: u64,
    },
    Move {
        from: CommitmentInfo,
        x: u64,
        y: u64,
    },
    Battle {
        mine: CommitmentInfo,
        opponent: Address,
        theirs: RawCommitment,
    },
    Claim {
        mine: CommitmentInfo,
        x: u64,
        y: u64,
    },
}

impl IntentJob {
    pub(crate) fn method(&self) -> ContractMethod {
        match self {
            IntentJob::Init { .. } => ContractMethod::InitPlayer,
            IntentJob::Move { .. } => ContractMethod::MovePlayer,
            IntentJob::Battle { .. } => ContractMethod::BattlePlayer,
            IntentJob::Claim { .. } => ContractMethod::ClaimTreasure,
        }
    }
}

/// Pipeline progress reported to the game worker.
#[derive(Debug)]
pub(crate) enum Internal {
    /// Arguments are ready. The worker installs `optimistic` and acks before
    /// the transaction is queued.
    Proved {
        action_id: ActionId,
        optimistic: Option<CommitmentInfo>,
        args: Vec<CallArg>,
        ack: oneshot::Sender<()>,
    },
    Submitted {
        action_id: ActionId,
        tx_hash: String,
    },
    Confirmed {
        action_id: ActionId,
        tx_hash: String,
    },
    Reverted {
        action_id: ActionId,
        reason: String,
    },
    Failed {
        action_id: ActionId,
        error: String,
    },
}

/// Shared, cheaply cloneable inputs of every pipeline run.
#[derive(Clone)]
pub(crate) struct PipelineContext {
    pub chain: Arc<dyn ChainExecutor>,
    pub proofs: ProofQueue,
    pub internal: mpsc::Sender<Internal>,
    pub account: Address,
    pub grid_upper_bound: u64,
    pub salt_upper_bound: u64,
    pub hash_window: u64,
}

/// Spawns the pipeline for `job`; any error ends up as [`Internal::Failed`].
pub(crate) fn spawn(ctx: PipelineContext, action_id: ActionId, job: IntentJob) {
    tokio::spawn(async move {
        if let Err(err) = run(&ctx, &action_id, job).await {
            warn!(%action_id, error = %err, "intent failed");
            let failed = Internal::Failed {
                action_id,
                error: err.to_string(),
            };
            if ctx.internal.send(failed).await.is_err() {
                debug!("game worker gone before intent failure was reported");
            }
        }
    });
}

async fn run(ctx: &PipelineContext, action_id: &ActionId, job: IntentJob) -> Result<()> {
    let method = job.method();
    let (optimistic, args) = prepare(ctx, job).await?;

    let (ack, acked) = oneshot::channel();
    report(
        ctx,
        Internal::Proved {
            action_id: action_id.clone(),
            optimistic,
            args: args.clone(),
            ack,
        },
    )
    .await?;
    acked.await.map_err(GameError::ReplyChannelClosed)?;

    let intent = TxIntent {
        action_id: action_id.clone(),
        method,
        args,
    };
    let mut receipts = ctx.chain.queue_transaction(intent).await?;

    let submitted = receipts.submitted().await?;
    report(
        ctx,
        Internal::Submitted {
            action_id: action_id.clone(),
            tx_hash: submitted.tx_hash,
        },
    )
    .await?;

    let outcome = match receipts.confirmed().await {
        Ok(confirmed) => Internal::Confirmed {
            action_id: action_id.clone(),
            tx_hash: confirmed.tx_hash,
        },
        Err(TxError::Reverted(reason)) => Internal::Reverted {
            action_id: action_id.clone(),
            reason,
        },
        Err(err) => return Err(err.into()),
    };
    report(ctx, outcome).await
}

/// Builds the call arguments, proving where the method needs it.
async fn prepare(
    ctx: &PipelineContext,
    job: IntentJob,
) -> Result<(Option<CommitmentInfo>, Vec<CallArg>)> {
    match job {
        IntentJob::Init { x, y } => {
            let window = fetch_hash_window(ctx.chain.as_ref(), ctx.hash_window).await?;
            let location = commit_location(ctx, &window, x, y)?;
            let witness = InitWitness::new(
                &location,
                &window.hashes,
                ctx.salt_upper_bound,
                ctx.grid_upper_bound,
            );
            let proof = ctx.proofs.enqueue(witness.into()).await?;
            let args = location_call_args(&window, &proof)?;
            Ok((Some(CommitmentInfo::from_raw(&location, ctx.account)), args))
        }
        IntentJob::Move { from, x, y } => {
            let window = fetch_hash_window(ctx.chain.as_ref(), ctx.hash_window).await?;
            let location = commit_location(ctx, &window, x, y)?;
            let witness = MoveWitness::new(
                &from.raw(),
                &location,
                &window.hashes,
                ctx.salt_upper_bound,
                ctx.grid_upper_bound,
            );
            let proof = ctx.proofs.enqueue(witness.into()).await?;
            let args = location_call_args(&window, &proof)?;
            Ok((Some(CommitmentInfo::from_raw(&location, ctx.account)), args))
        }
        IntentJob::Battle {
            mine,
            opponent,
            theirs,
        } => {
            let witness = WitnessInput::from(BattleWitness::new(&mine.raw(), &theirs));
            let proof = ctx.proofs.enqueue(witness).await?;
            let mut args = vec![CallArg::Address(opponent)];
            args.extend(proof_call_args(&proof)?);
            Ok((None, args))
        }
        IntentJob::Claim { mine, x, y } => {
            let args = vec![
                CallArg::uint(x),
                CallArg::uint(y),
                CallArg::uint(to_decimal(&mine.blockhash)),
                CallArg::uint(mine.salt),
            ];
            Ok((None, args))
        }
    }
}

/// Picks fresh randomness for `(x, y)` from the window and commits to it.
fn commit_location(
    ctx: &PipelineContext,
    window: &HashWindow,
    x: u64,
    y: u64,
) -> Result<RawCommitment> {
    let mut rng = StdRng::from_entropy();
    let secret = choose_secret(&mut rng, &window.hashes, ctx.salt_upper_bound)?;
    Ok(RawCommitment::compute(x, y, secret))
}

async fn report(ctx: &PipelineContext, message: Internal) -> Result<()> {
    ctx.internal
        .send(message)
        .await
        .map_err(|_| GameError::CommandChannelClosed)
}
