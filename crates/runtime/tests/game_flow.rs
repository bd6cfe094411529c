//! End-to-end game flows against the in-memory chain and the stub prover.

use std::sync::{Arc, Mutex};

use client_blockchain_core::{
    ActionId, Address, CallArg, ChainExecutor, ContractEvent, ContractMethod, ContractReader,
    MockChain, TxError,
};
use num_bigint::BigUint;
use runtime::{
    Event, GameError, GameHandle, GameRuntime, IntentEvent, IntentStatus, MinerConfig,
    RuntimeConfig, TileKnowledge, Topic, WorldCoords,
};
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};
use zk::{
    CircuitArtifacts, CircuitId, Commitment, ProofData, ProofError, ProvingEngine, StubProver,
    WitnessInput, commitment, parse_blockhash,
};

const WAIT: Duration = Duration::from_secs(10);

fn me() -> Address {
    Address::from_low_u64(0xA11CE)
}

fn them() -> Address {
    Address::from_low_u64(0xB0B)
}

fn small_mining() -> RuntimeConfig {
    RuntimeConfig {
        miner: MinerConfig {
            search_steps: Some(9),
            hash_window: 4,
        },
        ..Default::default()
    }
}

async fn start(chain: &MockChain, prover: StubProver, config: RuntimeConfig) -> GameRuntime {
    start_with(chain, Arc::new(prover), config).await
}

async fn start_with(
    chain: &MockChain,
    prover: Arc<dyn ProvingEngine>,
    config: RuntimeConfig,
) -> GameRuntime {
    let chain: Arc<dyn ChainExecutor> = Arc::new(chain.clone());
    GameRuntime::start(chain, prover, config)
        .await
        .expect("runtime should start")
}

/// Stub prover that keeps every witness it was asked to prove.
#[derive(Default)]
struct WitnessLog {
    witnesses: Mutex<Vec<WitnessInput>>,
}

impl ProvingEngine for WitnessLog {
    fn full_prove(
        &self,
        input: &WitnessInput,
        artifacts: &CircuitArtifacts,
    ) -> Result<ProofData, ProofError> {
        self.witnesses.lock().unwrap().push(input.clone());
        StubProver::new().full_prove(input, artifacts)
    }
}

async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event bus closed")
}

/// Skips intent events until `action_id` reaches a state accepted by `done`.
async fn wait_intent(
    rx: &mut broadcast::Receiver<Event>,
    action_id: &ActionId,
    done: impl Fn(&IntentEvent) -> bool,
) -> IntentEvent {
    loop {
        if let Event::Intent(event) = next_event(rx).await {
            if event.action_id() == action_id && done(&event) {
                return event;
            }
        }
    }
}

async fn wait_terminal(rx: &mut broadcast::Receiver<Event>, action_id: &ActionId) -> IntentEvent {
    wait_intent(rx, action_id, IntentEvent::is_terminal).await
}

async fn wait_submitted(rx: &mut broadcast::Receiver<Event>, action_id: &ActionId) {
    wait_intent(rx, action_id, |event| {
        matches!(event, IntentEvent::Submitted { .. })
    })
    .await;
}

/// Joins at `(x, y)` on an auto-confirming chain and waits until the worker
/// has recorded the confirmed location.
async fn join(handle: &GameHandle, x: u64, y: u64) {
    let mut intents = handle.subscribe(Topic::Intent);
    let mut players = handle.subscribe(Topic::PlayerUpdated);
    let id = handle.init_player(x, y).await.unwrap();
    let outcome = wait_terminal(&mut intents, &id).await;
    assert!(matches!(outcome, IntentEvent::Confirmed { .. }), "{outcome:?}");
    assert_eq!(next_event(&mut players).await, Event::PlayerUpdated);
}

/// Posts a location for `who` committed against the current head's hash.
async fn post_location(chain: &MockChain, who: Address, x: u64, y: u64, salt: u64) -> Commitment {
    let head = chain.block_number().await.unwrap();
    let hash = chain.block(head).await.unwrap().hash;
    let posted = commitment(x, y, parse_blockhash(&hash).unwrap(), salt);
    chain.emit(ContractEvent::PlayerUpdated {
        mover: who,
        commitment: posted,
        block_number: head,
    });
    posted
}

#[tokio::test]
async fn init_then_move_confirms_and_reveals_own_tile() {
    let chain = MockChain::new(me())
        .with_auto_confirm(true)
        .with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();

    join(&handle, 5, 5).await;

    let confirmed = handle.self_info().await.unwrap().expect("joined");
    assert_eq!((confirmed.x, confirmed.y), (5, 5));
    assert_eq!(confirmed.address, me());

    let tiles = handle.tiles().await.unwrap();
    assert_eq!(tiles.len(), 32);
    assert_eq!(tiles[5][5].tile_type, TileKnowledge::Known);
    assert_eq!(tiles[5][5].metas[0].commitment, confirmed.commitment);
    assert_eq!(tiles[6][5].tile_type, TileKnowledge::Unknown);

    let mut intents = handle.subscribe(Topic::Intent);
    let mut players = handle.subscribe(Topic::PlayerUpdated);
    let id = handle.move_player(6, 5).await.unwrap();
    let outcome = wait_terminal(&mut intents, &id).await;
    assert!(matches!(outcome, IntentEvent::Confirmed { .. }), "{outcome:?}");
    next_event(&mut players).await;

    let moved = handle.self_info().await.unwrap().expect("moved");
    assert_eq!((moved.x, moved.y), (6, 5));
    let optimistic = handle.optimistic_self_info().await.unwrap().unwrap();
    assert_eq!(optimistic.info, moved);
    assert!(matches!(
        handle.intent_status(id.clone()).await.unwrap(),
        Some(IntentStatus::Confirmed { .. })
    ));

    let sent = chain.queued_intents();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, ContractMethod::InitPlayer);
    assert_eq!(sent[1].method, ContractMethod::MovePlayer);
    assert_eq!(sent[1].action_id, id);

    // [firstBlock, latestBlock, a, b, c, publicSignals]
    let args = &sent[1].args;
    assert_eq!(args.len(), 6);
    let first: u64 = args[0].as_uint().unwrap().parse().unwrap();
    let latest: u64 = args[1].as_uint().unwrap().parse().unwrap();
    assert_eq!(latest - first + 1, 32);
    let signals = args[5].as_array().unwrap();
    assert_eq!(signals[0], CallArg::Uint(confirmed.commitment.to_string()));
    assert_eq!(signals[1], CallArg::Uint(moved.commitment.to_string()));

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn move_witness_binds_old_and_new_location() {
    let chain = MockChain::new(me())
        .with_auto_confirm(true)
        .with_contract_echo();
    let log = Arc::new(WitnessLog::default());
    let runtime = start_with(&chain, log.clone(), RuntimeConfig::default()).await;
    let handle = runtime.handle();

    join(&handle, 5, 5).await;
    let old = handle.self_info().await.unwrap().unwrap();

    let mut intents = handle.subscribe(Topic::Intent);
    let id = handle.move_player(6, 5).await.unwrap();
    wait_terminal(&mut intents, &id).await;

    let witnesses = log.witnesses.lock().unwrap().clone();
    assert_eq!(witnesses.len(), 2);
    assert_eq!(witnesses[0].circuit(), CircuitId::Init);
    let WitnessInput::Move(witness) = &witnesses[1] else {
        panic!("expected a move witness, got {:?}", witnesses[1]);
    };
    assert_eq!((witness.old_x.as_str(), witness.old_y.as_str()), ("5", "5"));
    assert_eq!((witness.new_x.as_str(), witness.new_y.as_str()), ("6", "5"));
    assert_eq!(witness.old_commitment, old.commitment.to_string());
    assert_eq!(witness.old_salt, old.salt.to_string());
    assert_eq!(witness.possible_hashes.len(), 32);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn revert_rolls_back_optimistic_location() {
    let chain = MockChain::new(me()).with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut intents = handle.subscribe(Topic::Intent);
    let mut players = handle.subscribe(Topic::PlayerUpdated);

    let init = handle.init_player(5, 5).await.unwrap();
    wait_submitted(&mut intents, &init).await;
    assert!(chain.confirm(&init).is_some());
    wait_terminal(&mut intents, &init).await;
    next_event(&mut players).await;

    let moving = handle.move_player(9, 9).await.unwrap();
    wait_submitted(&mut intents, &moving).await;

    let pending = handle.optimistic_self_info().await.unwrap().unwrap();
    assert_eq!(pending.action_id, moving);
    assert_eq!((pending.info.x, pending.info.y), (9, 9));
    assert_eq!(handle.self_info().await.unwrap().unwrap().x, 5);

    assert!(chain.revert(&moving, "stale hash window"));
    let outcome = wait_terminal(&mut intents, &moving).await;
    assert_eq!(
        outcome,
        IntentEvent::Reverted {
            action_id: moving.clone(),
            reason: "stale hash window".to_string(),
        }
    );

    let rolled_back = handle.optimistic_self_info().await.unwrap().unwrap();
    assert!(rolled_back.action_id.is_none());
    assert_eq!((rolled_back.info.x, rolled_back.info.y), (5, 5));
    assert_eq!(
        handle.intent_status(moving).await.unwrap(),
        Some(IntentStatus::Reverted {
            reason: "stale hash window".to_string()
        })
    );

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn overlapping_moves_promote_the_confirmed_one() {
    let chain = MockChain::new(me()).with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut intents = handle.subscribe(Topic::Intent);
    let mut players = handle.subscribe(Topic::PlayerUpdated);

    let init = handle.init_player(5, 5).await.unwrap();
    wait_submitted(&mut intents, &init).await;
    assert!(chain.confirm(&init).is_some());
    wait_terminal(&mut intents, &init).await;
    next_event(&mut players).await;

    let first = handle.move_player(6, 5).await.unwrap();
    wait_submitted(&mut intents, &first).await;
    let second = handle.move_player(5, 6).await.unwrap();
    wait_submitted(&mut intents, &second).await;
    assert_eq!(
        handle.optimistic_self_info().await.unwrap().unwrap().action_id,
        second
    );

    assert!(chain.confirm(&first).is_some());
    wait_terminal(&mut intents, &first).await;
    next_event(&mut players).await;

    let confirmed = handle.self_info().await.unwrap().unwrap();
    assert_eq!((confirmed.x, confirmed.y), (6, 5));
    let pending = handle.optimistic_self_info().await.unwrap().unwrap();
    assert_eq!(pending.action_id, second);
    assert_eq!((pending.info.x, pending.info.y), (5, 6));

    assert!(chain.revert(&second, "stale location"));
    wait_terminal(&mut intents, &second).await;

    let settled = handle.optimistic_self_info().await.unwrap().unwrap();
    assert!(settled.action_id.is_none());
    assert_eq!((settled.info.x, settled.info.y), (6, 5));
    assert_eq!(settled.info, confirmed);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn proof_failure_never_reaches_the_chain() {
    let chain = MockChain::new(me())
        .with_auto_confirm(true)
        .with_contract_echo();
    let prover = StubProver::new().failing_on(CircuitId::Move);
    let runtime = start(&chain, prover, RuntimeConfig::default()).await;
    let handle = runtime.handle();

    join(&handle, 3, 4).await;

    let mut intents = handle.subscribe(Topic::Intent);
    let id = handle.move_player(4, 4).await.unwrap();
    match wait_terminal(&mut intents, &id).await {
        IntentEvent::Failed { error, .. } => assert!(error.contains("move"), "{error}"),
        other => panic!("expected failure, got {other:?}"),
    }

    assert_eq!(chain.queued_intents().len(), 1);
    let optimistic = handle.optimistic_self_info().await.unwrap().unwrap();
    assert_eq!((optimistic.info.x, optimistic.info.y), (3, 4));
    assert_eq!(runtime.proof_metrics().failed(), 1);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn rejected_submission_fails_the_intent() {
    let chain = MockChain::new(me()).with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut intents = handle.subscribe(Topic::Intent);

    chain.reject_next("nonce too low");
    let id = handle.init_player(1, 1).await.unwrap();
    let outcome = wait_terminal(&mut intents, &id).await;
    assert!(
        matches!(&outcome, IntentEvent::Failed { error, .. } if error.contains("nonce too low")),
        "{outcome:?}"
    );

    // The optimistic location was installed before submission and is gone again.
    assert!(handle.optimistic_self_info().await.unwrap().is_none());
    assert!(handle.self_info().await.unwrap().is_none());

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_intents_are_refused_up_front() {
    let chain = MockChain::new(me())
        .with_auto_confirm(true)
        .with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();

    assert!(matches!(
        handle.init_player(32, 0).await,
        Err(GameError::OutOfBounds {
            x: 32,
            y: 0,
            grid_upper_bound: 32
        })
    ));
    assert!(matches!(
        handle.move_player(1, 1).await,
        Err(GameError::NotInitialized)
    ));
    assert!(matches!(
        handle.claim_treasure(1, 1).await,
        Err(GameError::NotInitialized)
    ));

    join(&handle, 2, 2).await;
    assert!(matches!(
        handle.battle_player(them()).await,
        Err(GameError::UnknownOpponent(addr)) if addr == them()
    ));

    chain.set_balance(me(), 1_000);
    assert!(matches!(
        handle.move_player(3, 3).await,
        Err(GameError::Tx(TxError::InsufficientBalance {
            balance: 1_000,
            ..
        }))
    ));
    assert_eq!(chain.queued_intents().len(), 1);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn start_requires_an_account() {
    let chain: Arc<dyn ChainExecutor> = Arc::new(MockChain::without_account());
    let result = GameRuntime::start(chain, Arc::new(StubProver::new()), RuntimeConfig::default()).await;
    assert!(matches!(result, Err(GameError::NoAccount)));
}

#[tokio::test]
async fn start_refuses_an_oversized_grid() {
    let chain: Arc<dyn ChainExecutor> = Arc::new(MockChain::new(me()).with_bounds(u64::MAX, 4));
    let result = GameRuntime::start(chain, Arc::new(StubProver::new()), RuntimeConfig::default()).await;
    assert!(matches!(result, Err(GameError::GridTooLarge { .. })));
}

#[tokio::test]
async fn mining_reveals_a_posted_location() {
    let chain = MockChain::new(me()).with_bounds(10, 2);
    let runtime = start(&chain, StubProver::new(), small_mining()).await;
    let handle = runtime.handle();
    let mut players = handle.subscribe(Topic::PlayerUpdated);
    let mut mined = handle.subscribe(Topic::MinedTilesUpdated);

    let posted = post_location(&chain, them(), 6, 5, 1).await;
    next_event(&mut players).await;
    assert_eq!(handle.tiles().await.unwrap()[6][5].tile_type, TileKnowledge::Unknown);

    handle.start_mining(WorldCoords::new(5, 5)).await.unwrap();
    let tile = timeout(WAIT, async {
        loop {
            assert_eq!(next_event(&mut mined).await, Event::MinedTilesUpdated);
            let tile = handle.tiles().await.unwrap()[6][5].clone();
            if !tile.metas.is_empty() {
                return tile;
            }
        }
    })
    .await
    .expect("mining should find the posted location");

    assert_eq!(tile.tile_type, TileKnowledge::Known);
    assert_eq!(tile.metas[0].commitment, posted);
    assert_eq!(tile.metas[0].address, them());
    assert!(tile.metas[0].is_current);

    // Cells the spiral never reached stay unknown.
    assert_eq!(handle.tiles().await.unwrap()[0][0].tile_type, TileKnowledge::Unknown);
    assert!(matches!(
        handle.start_mining(WorldCoords::new(10, 0)).await,
        Err(GameError::OutOfBounds { .. })
    ));

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn battle_refreshes_wins() {
    let chain = MockChain::new(me())
        .with_bounds(10, 2)
        .with_auto_confirm(true)
        .with_contract_echo();
    let runtime = start(&chain, StubProver::new(), small_mining()).await;
    let handle = runtime.handle();

    join(&handle, 5, 5).await;

    let mut mined = handle.subscribe(Topic::MinedTilesUpdated);
    let mut players = handle.subscribe(Topic::PlayerUpdated);
    post_location(&chain, them(), 5, 6, 0).await;
    next_event(&mut players).await;
    handle.start_mining(WorldCoords::new(5, 5)).await.unwrap();
    timeout(WAIT, async {
        loop {
            next_event(&mut mined).await;
            if !handle.tiles().await.unwrap()[5][6].metas.is_empty() {
                break;
            }
        }
    })
    .await
    .expect("opponent should be mined");

    chain.set_wins(me(), 3);
    let mut intents = handle.subscribe(Topic::Intent);
    let mut battles = handle.subscribe(Topic::BattleUpdated);
    let id = handle.battle_player(them()).await.unwrap();
    let outcome = wait_terminal(&mut intents, &id).await;
    assert!(matches!(outcome, IntentEvent::Confirmed { .. }), "{outcome:?}");
    assert_eq!(next_event(&mut battles).await, Event::BattleUpdated);
    assert_eq!(handle.wins().await.unwrap(), 3);

    let battle = chain.queued_intents().pop().unwrap();
    assert_eq!(battle.method, ContractMethod::BattlePlayer);
    assert_eq!(battle.args[0], CallArg::Address(them()));
    assert_eq!(battle.args.len(), 5);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn claim_sends_own_preimage_without_proof() {
    let chain = MockChain::new(me())
        .with_auto_confirm(true)
        .with_contract_echo();
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();

    join(&handle, 7, 8).await;
    let mine = handle.self_info().await.unwrap().unwrap();
    let generated = runtime.proof_metrics().generated();

    let mut intents = handle.subscribe(Topic::Intent);
    let id = handle.claim_treasure(7, 8).await.unwrap();
    wait_terminal(&mut intents, &id).await;

    let claim = chain.queued_intents().pop().unwrap();
    assert_eq!(claim.method, ContractMethod::ClaimTreasure);
    assert_eq!(
        claim.args,
        vec![
            CallArg::uint(7),
            CallArg::uint(8),
            CallArg::uint(zk::to_decimal(&mine.blockhash)),
            CallArg::uint(mine.salt),
        ]
    );
    assert_eq!(runtime.proof_metrics().generated(), generated);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn any_battle_refreshes_wins() {
    let chain = MockChain::new(me());
    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();
    let mut battles = handle.subscribe(Topic::BattleUpdated);

    chain.set_wins(me(), 2);
    chain.emit(ContractEvent::BattleUpdated {
        player1: them(),
        player2: Address::from_low_u64(0xCAFE),
    });
    assert_eq!(next_event(&mut battles).await, Event::BattleUpdated);
    assert_eq!(handle.wins().await.unwrap(), 2);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn battle_power_is_decoded() {
    let chain = MockChain::new(me());
    let half = BigUint::from(5_000_000_000_000_000u64);
    let minus_tenth = (BigUint::from(1u8) << 256u32) - BigUint::from(1_000_000_000_000_000u64);
    chain.set_battle_power(me(), vec![half, minus_tenth]);

    let runtime = start(&chain, StubProver::new(), RuntimeConfig::default()).await;
    let handle = runtime.handle();

    let powers = handle.battle_power(me()).await.unwrap();
    assert_eq!(powers.len(), 2);
    assert!(!powers[0].negative);
    assert!((powers[0].as_f64() - 0.5).abs() < 1e-12);
    assert!(powers[1].negative);
    assert!((powers[1].as_f64() + 0.1).abs() < 1e-12);
    assert_eq!(handle.current_block_number().await.unwrap(), 100);

    drop(handle);
    runtime.shutdown().await.unwrap();
}
