//! In-memory chain for local sessions and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info};
use zk::Commitment;

use crate::traits::{
    ChainExecutor, ContractReader, EventSource, TransactionExecutor, TransportError, TxError,
};
use crate::types::{
    ActionId, Address, BlockInfo, CallArg, ContractEvent, ContractMethod, SubmittedTx, TxEvent,
    TxIntent, TxReceipts,
};

/// Called when a transaction is mined; returns the contract events it emits.
///
/// Arguments: the intent, the sender, and the block it landed in.
pub type ConfirmHook = Arc<dyn Fn(&TxIntent, Address, u64) -> Vec<ContractEvent> + Send + Sync>;

const EVENT_BUFFER: usize = 256;
const DEFAULT_BALANCE: u128 = 1_000_000_000_000_000_000;

struct PendingTx {
    tx: SubmittedTx,
    sender: Address,
    confirmed: oneshot::Sender<Result<SubmittedTx, TxError>>,
}

struct MockState {
    grid_upper_bound: u64,
    salt_upper_bound: u64,
    block_number: u64,
    account: Option<Address>,
    balances: HashMap<Address, u128>,
    wins: HashMap<Address, u64>,
    battle_powers: HashMap<Address, Vec<BigUint>>,
    pending: Vec<PendingTx>,
    history: Vec<TxIntent>,
    auto_confirm: bool,
    reject_next: Option<String>,
    tx_counter: u64,
    confirm_hook: Option<ConfirmHook>,
}

/// Mock chain executor.
///
/// Simulates the game contract in memory. Transactions are submitted
/// immediately; they confirm either automatically or when the test calls
/// [`MockChain::confirm`]. A [`ConfirmHook`] decides which contract events a
/// mined transaction emits.
#[derive(Clone)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
    tx_events: broadcast::Sender<TxEvent>,
    contract_events: broadcast::Sender<ContractEvent>,
}

impl MockChain {
    /// Chain with a funded signer, a 32x32 grid and 16 salts, at block 100.
    pub fn new(account: Address) -> Self {
        let chain = Self::without_account();
        {
            let mut state = chain.state();
            state.account = Some(account);
            state.balances.insert(account, DEFAULT_BALANCE);
        }
        chain
    }

    /// Chain with no connected wallet.
    pub fn without_account() -> Self {
        let (tx_events, _) = broadcast::channel(EVENT_BUFFER);
        let (contract_events, _) = broadcast::channel(EVENT_BUFFER);
        let state = MockState {
            grid_upper_bound: 32,
            salt_upper_bound: 16,
            block_number: 100,
            account: None,
            balances: HashMap::new(),
            wins: HashMap::new(),
            battle_powers: HashMap::new(),
            pending: Vec::new(),
            history: Vec::new(),
            auto_confirm: false,
            reject_next: None,
            tx_counter: 0,
            confirm_hook: None,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            tx_events,
            contract_events,
        }
    }

    pub fn with_bounds(self, grid_upper_bound: u64, salt_upper_bound: u64) -> Self {
        {
            let mut state = self.state();
            state.grid_upper_bound = grid_upper_bound;
            state.salt_upper_bound = salt_upper_bound;
        }
        self
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.state().block_number = block_number;
        self
    }

    /// Confirms every transaction right after submission.
    pub fn with_auto_confirm(self, auto_confirm: bool) -> Self {
        self.state().auto_confirm = auto_confirm;
        self
    }

    pub fn with_confirm_hook(self, hook: ConfirmHook) -> Self {
        self.state().confirm_hook = Some(hook);
        self
    }

    /// Installs [`echo_contract_events`] as the confirmation hook.
    pub fn with_contract_echo(self) -> Self {
        self.with_confirm_hook(Arc::new(echo_contract_events))
    }

    pub fn set_balance(&self, account: Address, balance: u128) {
        self.state().balances.insert(account, balance);
    }

    pub fn set_wins(&self, player: Address, wins: u64) {
        self.state().wins.insert(player, wins);
    }

    pub fn set_battle_power(&self, player: Address, words: Vec<BigUint>) {
        self.state().battle_powers.insert(player, words);
    }

    /// Makes the next `queue_transaction` fail before submission.
    pub fn reject_next(&self, reason: impl Into<String>) {
        self.state().reject_next = Some(reason.into());
    }

    pub fn mine_blocks(&self, count: u64) -> u64 {
        let mut state = self.state();
        state.block_number += count;
        state.block_number
    }

    /// Every intent handed to the executor, in order.
    pub fn queued_intents(&self) -> Vec<TxIntent> {
        self.state().history.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    /// Broadcasts a contract event as if another client caused it.
    pub fn emit(&self, event: ContractEvent) {
        let _ = self.contract_events.send(event);
    }

    /// Mines the pending transaction for `action_id`.
    pub fn confirm(&self, action_id: &ActionId) -> Option<SubmittedTx> {
        let (pending, block, events) = {
            let mut state = self.state();
            let index = state
                .pending
                .iter()
                .position(|p| &p.tx.intent.action_id == action_id)?;
            let pending = state.pending.remove(index);
            state.block_number += 1;
            let block = state.block_number;
            let events = state
                .confirm_hook
                .as_ref()
                .map(|hook| hook(&pending.tx.intent, pending.sender, block))
                .unwrap_or_default();
            (pending, block, events)
        };

        info!(action_id = %action_id, block, tx_hash = %pending.tx.tx_hash, "mock transaction confirmed");
        for event in events {
            let _ = self.contract_events.send(event);
        }
        let tx = pending.tx;
        let _ = pending.confirmed.send(Ok(tx.clone()));
        let _ = self.tx_events.send(TxEvent::Confirmed(tx.clone()));
        Some(tx)
    }

    /// Reverts the pending transaction for `action_id`.
    pub fn revert(&self, action_id: &ActionId, reason: impl Into<String>) -> bool {
        let pending = {
            let mut state = self.state();
            match state
                .pending
                .iter()
                .position(|p| &p.tx.intent.action_id == action_id)
            {
                Some(index) => state.pending.remove(index),
                None => return false,
            }
        };

        let reason = reason.into();
        info!(action_id = %action_id, %reason, "mock transaction reverted");
        let _ = pending.confirmed.send(Err(TxError::Reverted(reason.clone())));
        let _ = self.tx_events.send(TxEvent::Reverted {
            intent: pending.tx.intent,
            tx_hash: Some(pending.tx.tx_hash),
            reason,
        });
        true
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn block_hash(number: u64) -> String {
        let mixed = u128::from(number).wrapping_mul(0x9E37_79B9_7F4A_7C15_F39C_C060_5CED_C835);
        format!("0x{mixed:064x}")
    }
}

#[async_trait]
impl ContractReader for MockChain {
    async fn grid_upper_bound(&self) -> Result<u64, TransportError> {
        Ok(self.state().grid_upper_bound)
    }

    async fn salt_upper_bound(&self) -> Result<u64, TransportError> {
        Ok(self.state().salt_upper_bound)
    }

    async fn wins(&self, player: Address) -> Result<u64, TransportError> {
        Ok(self.state().wins.get(&player).copied().unwrap_or(0))
    }

    async fn battle_power(&self, player: Address) -> Result<Vec<BigUint>, TransportError> {
        Ok(self
            .state()
            .battle_powers
            .get(&player)
            .cloned()
            .unwrap_or_default())
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        Ok(self.state().block_number)
    }

    async fn block(&self, number: u64) -> Result<BlockInfo, TransportError> {
        if number > self.state().block_number {
            return Err(TransportError::UnknownBlock(number));
        }
        Ok(BlockInfo {
            number,
            hash: Self::block_hash(number),
        })
    }
}

#[async_trait]
impl TransactionExecutor for MockChain {
    fn account(&self) -> Option<Address> {
        self.state().account
    }

    async fn balance(&self, account: Address) -> Result<u128, TransportError> {
        Ok(self.state().balances.get(&account).copied().unwrap_or(0))
    }

    async fn queue_transaction(&self, intent: TxIntent) -> Result<TxReceipts, TxError> {
        let (submitted_tx, submitted_rx) = oneshot::channel();
        let (confirmed_tx, confirmed_rx) = oneshot::channel();

        let (tx, auto_confirm) = {
            let mut state = self.state();
            let sender = state.account.ok_or(TxError::NoSigner)?;
            state.history.push(intent.clone());
            if let Some(reason) = state.reject_next.take() {
                return Err(TxError::Rejected(reason));
            }

            state.tx_counter += 1;
            let tx = SubmittedTx {
                intent,
                tx_hash: format!("0x{:064x}", state.tx_counter),
                sent_at: now_millis(),
            };
            state.pending.push(PendingTx {
                tx: tx.clone(),
                sender,
                confirmed: confirmed_tx,
            });
            (tx, state.auto_confirm)
        };

        debug!(action_id = %tx.intent.action_id, method = %tx.intent.method, tx_hash = %tx.tx_hash, "mock transaction submitted");
        let _ = submitted_tx.send(Ok(tx.clone()));
        let _ = self.tx_events.send(TxEvent::Submitted(tx.clone()));

        if auto_confirm {
            self.confirm(&tx.intent.action_id);
        }

        Ok(TxReceipts {
            submitted: submitted_rx,
            confirmed: confirmed_rx,
        })
    }

    fn subscribe_tx_events(&self) -> broadcast::Receiver<TxEvent> {
        self.tx_events.subscribe()
    }
}

impl EventSource for MockChain {
    fn subscribe_contract_events(&self) -> broadcast::Receiver<ContractEvent> {
        self.contract_events.subscribe()
    }
}

impl ChainExecutor for MockChain {
    fn name(&self) -> &str {
        "mock"
    }
}

/// Confirmation hook that behaves like the game contract's event emission.
///
/// `initPlayer` and `movePlayer` emit `PlayerUpdated` with the new commitment
/// read from the public signals (index 0 for init, 1 for move).
/// `battlePlayer` emits `BattleUpdated` between the sender and the opponent.
pub fn echo_contract_events(intent: &TxIntent, sender: Address, block: u64) -> Vec<ContractEvent> {
    let signal = |index: usize| {
        intent
            .args
            .last()
            .and_then(CallArg::as_array)
            .and_then(|signals| signals.get(index))
            .and_then(CallArg::as_uint)
            .and_then(|value| value.parse::<Commitment>().ok())
    };

    let event = match intent.method {
        ContractMethod::InitPlayer => signal(0).map(|commitment| ContractEvent::PlayerUpdated {
            mover: sender,
            commitment,
            block_number: block,
        }),
        ContractMethod::MovePlayer => signal(1).map(|commitment| ContractEvent::PlayerUpdated {
            mover: sender,
            commitment,
            block_number: block,
        }),
        ContractMethod::BattlePlayer => match intent.args.first() {
            Some(CallArg::Address(opponent)) => Some(ContractEvent::BattleUpdated {
                player1: sender,
                player2: *opponent,
            }),
            _ => None,
        },
        ContractMethod::ClaimTreasure => None,
    };

    event.into_iter().collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensure_can_transact;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn alice() -> Address {
        Address::from_low_u64(0xa11ce)
    }

    fn intent(seed: u64, method: ContractMethod, args: Vec<CallArg>) -> TxIntent {
        TxIntent {
            action_id: ActionId::random(&mut StdRng::seed_from_u64(seed)),
            method,
            args,
        }
    }

    #[tokio::test]
    async fn reads_configured_constants() {
        let chain = MockChain::new(alice()).with_bounds(10, 4).with_block_number(7);
        assert_eq!(chain.grid_upper_bound().await.unwrap(), 10);
        assert_eq!(chain.salt_upper_bound().await.unwrap(), 4);
        assert_eq!(chain.block_number().await.unwrap(), 7);

        let blocks = chain.blocks(5..=7).await.unwrap();
        assert_eq!(
            blocks.iter().map(|b| b.number).collect::<Vec<_>>(),
            [5, 6, 7]
        );
        assert_ne!(blocks[0].hash, blocks[1].hash);
        assert_eq!(chain.block(8).await, Err(TransportError::UnknownBlock(8)));
    }

    #[tokio::test]
    async fn manual_confirmation_resolves_receipts() {
        let chain = MockChain::new(alice());
        let mut events = chain.subscribe_tx_events();
        let intent = intent(1, ContractMethod::ClaimTreasure, vec![CallArg::uint(1)]);
        let action_id = intent.action_id.clone();

        let mut receipts = chain.queue_transaction(intent).await.unwrap();
        let submitted = receipts.submitted().await.unwrap();
        assert!(matches!(events.recv().await.unwrap(), TxEvent::Submitted(_)));
        assert_eq!(chain.pending_count(), 1);

        chain.confirm(&action_id).unwrap();
        let confirmed = receipts.confirmed().await.unwrap();
        assert_eq!(confirmed.tx_hash, submitted.tx_hash);
        assert!(matches!(events.recv().await.unwrap(), TxEvent::Confirmed(_)));
        assert_eq!(chain.block_number().await.unwrap(), 101);
    }

    #[tokio::test]
    async fn revert_fails_confirmation() {
        let chain = MockChain::new(alice());
        let intent = intent(2, ContractMethod::ClaimTreasure, vec![]);
        let action_id = intent.action_id.clone();

        let mut receipts = chain.queue_transaction(intent).await.unwrap();
        receipts.submitted().await.unwrap();
        assert!(chain.revert(&action_id, "out of range"));
        assert_eq!(
            receipts.confirmed().await,
            Err(TxError::Reverted("out of range".to_string()))
        );
        assert!(!chain.revert(&action_id, "again"));
    }

    #[tokio::test]
    async fn rejected_submission_is_recorded() {
        let chain = MockChain::new(alice());
        chain.reject_next("nonce too low");
        let err = chain
            .queue_transaction(intent(3, ContractMethod::ClaimTreasure, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err, TxError::Rejected("nonce too low".to_string()));
        assert_eq!(chain.queued_intents().len(), 1);
        assert_eq!(chain.pending_count(), 0);
    }

    #[tokio::test]
    async fn contract_echo_emits_player_updates() {
        let chain = MockChain::new(alice())
            .with_auto_confirm(true)
            .with_contract_echo();
        let mut events = chain.subscribe_contract_events();

        let commitment = zk::commitment(1, 2, zk::Fr::from(3u64), 4);
        let args = vec![
            CallArg::uint(69),
            CallArg::uint(100),
            CallArg::array(["1", "2"]),
            CallArg::Array(vec![CallArg::array(["3", "4"]), CallArg::array(["5", "6"])]),
            CallArg::array(["7", "8"]),
            CallArg::array([commitment.to_string(), "1".to_string()]),
        ];
        let mut receipts = chain
            .queue_transaction(intent(4, ContractMethod::InitPlayer, args))
            .await
            .unwrap();
        receipts.confirmed().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            ContractEvent::PlayerUpdated {
                mover: alice(),
                commitment,
                block_number: 101,
            }
        );
    }

    #[tokio::test]
    async fn guard_rejects_missing_signer_and_low_balance() {
        let chain = MockChain::without_account();
        assert_eq!(
            ensure_can_transact(&chain, 1).await,
            Err(TxError::NoSigner)
        );

        let chain = MockChain::new(alice());
        chain.set_balance(alice(), 10);
        assert_eq!(
            ensure_can_transact(&chain, 11).await,
            Err(TxError::InsufficientBalance {
                balance: 10,
                required: 11
            })
        );
        assert_eq!(ensure_can_transact(&chain, 10).await, Ok(alice()));
    }
}
