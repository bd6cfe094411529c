//! Scripted local session: join, move, mine for a rival, and fight it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use client_blockchain_core::{
    ActionId, Address, ChainExecutor, ContractEvent, ContractReader, MockChain,
};
use runtime::{
    Event, GameHandle, GameRuntime, IntentEvent, RuntimeConfig, TileKnowledge, Topic, WorldCoords,
};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{info, warn};
use zk::{StubProver, commitment, parse_blockhash};

use crate::config::SessionConfig;

const STEP_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn run(config: SessionConfig, runtime_config: RuntimeConfig) -> Result<()> {
    let chain = MockChain::new(config.player)
        .with_bounds(config.grid_upper_bound, config.salt_upper_bound)
        .with_auto_confirm(true)
        .with_contract_echo();
    let prover = StubProver::new().with_delay(config.prover_delay);

    let executor: Arc<dyn ChainExecutor> = Arc::new(chain.clone());
    let runtime = GameRuntime::start(executor, Arc::new(prover), runtime_config)
        .await
        .context("starting game runtime")?;
    let handle = runtime.handle();
    let mut intents = handle.subscribe(Topic::Intent);
    let mut players = handle.subscribe(Topic::PlayerUpdated);

    let spawn = config.spawn;
    let id = handle.init_player(spawn.x, spawn.y).await?;
    settle(&mut intents, &id).await?;
    wait_for_location(&handle, &mut players, spawn).await?;
    info!(x = spawn.x, y = spawn.y, "joined the grid");

    let grid = handle.grid_upper_bound();
    let rival_at = WorldCoords::new((spawn.x + 1) % grid, spawn.y);
    post_rival(&chain, config.rival, rival_at, config.salt_upper_bound).await?;

    let next = WorldCoords::new(spawn.x, (spawn.y + 1) % grid);
    let id = handle.move_player(next.x, next.y).await?;
    settle(&mut intents, &id).await?;
    wait_for_location(&handle, &mut players, next).await?;
    info!(x = next.x, y = next.y, "moved");

    if mine_for(&handle, spawn, rival_at).await? {
        chain.set_wins(config.player, 1);
        let mut battles = handle.subscribe(Topic::BattleUpdated);
        let id = handle.battle_player(config.rival).await?;
        settle(&mut intents, &id).await?;
        timeout(STEP_TIMEOUT, battles.recv())
            .await
            .context("waiting for battle result")??;
        info!(wins = handle.wins().await?, "battle settled");
    } else {
        warn!(rival = %config.rival, "rival not found nearby, skipping battle");
    }

    for (index, power) in handle.battle_power(config.player).await?.iter().enumerate() {
        info!(index, %power, "battle power");
    }

    let metrics = runtime.proof_metrics().snapshot();
    info!(
        generated = metrics.generated,
        failed = metrics.failed,
        peak_queue_depth = metrics.peak_queue_depth,
        avg_proving_ms = metrics.avg_proving_time.as_millis() as u64,
        "proof queue summary"
    );

    drop(handle);
    runtime.shutdown().await?;
    Ok(())
}

/// Waits for the action to reach a terminal state; anything but confirmation
/// ends the session.
async fn settle(intents: &mut broadcast::Receiver<Event>, action_id: &ActionId) -> Result<()> {
    let outcome = timeout(STEP_TIMEOUT, async {
        loop {
            if let Event::Intent(event) = intents.recv().await? {
                if event.action_id() == action_id && event.is_terminal() {
                    return Ok::<_, broadcast::error::RecvError>(event);
                }
            }
        }
    })
    .await
    .with_context(|| format!("action {action_id} did not settle"))??;

    match outcome {
        IntentEvent::Confirmed { tx_hash, .. } => {
            info!(%action_id, %tx_hash, "action confirmed");
            Ok(())
        }
        other => bail!("action {action_id} did not confirm: {other:?}"),
    }
}

async fn wait_for_location(
    handle: &GameHandle,
    players: &mut broadcast::Receiver<Event>,
    expected: WorldCoords,
) -> Result<()> {
    timeout(STEP_TIMEOUT, async {
        loop {
            let confirmed = handle.self_info().await?.map(|info| info.coords());
            if confirmed == Some(expected) {
                return Ok::<_, anyhow::Error>(());
            }
            players.recv().await?;
        }
    })
    .await
    .context("waiting for own location update")?
}

/// Has the rival post a location committed against the current head.
async fn post_rival(chain: &MockChain, rival: Address, at: WorldCoords, salt_upper_bound: u64) -> Result<()> {
    let head = chain.block_number().await?;
    let hash = chain.block(head).await?.hash;
    let salt = head % salt_upper_bound.max(1);
    let posted = commitment(at.x, at.y, parse_blockhash(&hash)?, salt);
    chain.emit(ContractEvent::PlayerUpdated {
        mover: rival,
        commitment: posted,
        block_number: head,
    });
    info!(%rival, %posted, "rival posted a location");
    Ok(())
}

/// Mines around `origin` until `target` resolves to a posted commitment.
async fn mine_for(handle: &GameHandle, origin: WorldCoords, target: WorldCoords) -> Result<bool> {
    let mut mined = handle.subscribe(Topic::MinedTilesUpdated);
    let run_id = handle.start_mining(origin).await?;
    info!(run_id, "mining");

    let found = timeout(STEP_TIMEOUT, async {
        loop {
            mined.recv().await?;
            let tiles = handle.tiles().await?;
            let tile = &tiles[target.x as usize][target.y as usize];
            if tile.tile_type == TileKnowledge::Known && !tile.metas.is_empty() {
                return Ok::<_, anyhow::Error>(());
            }
        }
    })
    .await;

    handle.stop_mining().await?;
    match found {
        Ok(result) => result.map(|()| true),
        Err(_) => Ok(false),
    }
}
