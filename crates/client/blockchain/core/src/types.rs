//! Wire types exchanged with the game contract.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::oneshot;
use zk::Commitment;

use crate::traits::TxError;

// ============================================================================
// Identifiers
// ============================================================================

/// 20-byte account address, rendered as lowercase `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Address whose last byte is `n`. Handy for fixtures.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address {0:?}: expected 0x followed by 40 hex digits")]
pub struct ParseAddressError(String);

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| ParseAddressError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Client-side correlation id for one user action.
///
/// Ten random hex characters; the literal `none` marks "no pending action".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(String);

impl ActionId {
    const NONE: &'static str = "none";
    const LEN: usize = 10;

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let id = (0..Self::LEN)
            .map(|_| char::from(DIGITS[rng.gen_range(0..DIGITS.len())]))
            .collect();
        Self(id)
    }

    pub fn none() -> Self {
        Self(Self::NONE.to_string())
    }

    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// Contract write methods.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ContractMethod {
    InitPlayer,
    MovePlayer,
    BattlePlayer,
    ClaimTreasure,
}

/// ABI-agnostic call argument. Integers travel as decimal strings.
///
/// Serialized adjacently tagged (`{"type": "address", "value": "0x.."}`) since
/// an address and a uint are both plain strings on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CallArg {
    Uint(String),
    Address(Address),
    Array(Vec<CallArg>),
}

impl CallArg {
    pub fn uint(value: impl ToString) -> Self {
        CallArg::Uint(value.to_string())
    }

    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CallArg>,
    {
        CallArg::Array(items.into_iter().map(Into::into).collect())
    }

    pub fn as_uint(&self) -> Option<&str> {
        match self {
            CallArg::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CallArg]> {
        match self {
            CallArg::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<String> for CallArg {
    fn from(value: String) -> Self {
        CallArg::Uint(value)
    }
}

impl From<&str> for CallArg {
    fn from(value: &str) -> Self {
        CallArg::Uint(value.to_string())
    }
}

impl From<Address> for CallArg {
    fn from(value: Address) -> Self {
        CallArg::Address(value)
    }
}

/// A contract call the executor should sign and send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIntent {
    pub action_id: ActionId,
    pub method: ContractMethod,
    pub args: Vec<CallArg>,
}

/// An intent that made it into the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTx {
    pub intent: TxIntent,
    pub tx_hash: String,
    /// Unix time in milliseconds.
    pub sent_at: u64,
}

/// Transaction lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    Submitted(SubmittedTx),
    Confirmed(SubmittedTx),
    Reverted {
        intent: TxIntent,
        tx_hash: Option<String>,
        reason: String,
    },
}

impl TxEvent {
    pub fn intent(&self) -> &TxIntent {
        match self {
            TxEvent::Submitted(tx) | TxEvent::Confirmed(tx) => &tx.intent,
            TxEvent::Reverted { intent, .. } => intent,
        }
    }

    pub fn action_id(&self) -> &ActionId {
        &self.intent().action_id
    }
}

/// Completion handles returned by `queue_transaction`.
///
/// Each side resolves exactly once; await `submitted` before `confirmed`.
#[derive(Debug)]
pub struct TxReceipts {
    pub submitted: oneshot::Receiver<Result<SubmittedTx, TxError>>,
    pub confirmed: oneshot::Receiver<Result<SubmittedTx, TxError>>,
}

impl TxReceipts {
    pub async fn submitted(&mut self) -> Result<SubmittedTx, TxError> {
        (&mut self.submitted).await.map_err(|_| TxError::Dropped)?
    }

    pub async fn confirmed(&mut self) -> Result<SubmittedTx, TxError> {
        (&mut self.confirmed).await.map_err(|_| TxError::Dropped)?
    }
}

// ============================================================================
// Chain data
// ============================================================================

/// Events emitted by the game contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    /// A player posted a new location commitment.
    PlayerUpdated {
        mover: Address,
        commitment: Commitment,
        block_number: u64,
    },
    /// Two players fought.
    BattleUpdated { player1: Address, player2: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    /// `0x`-prefixed 32-byte hash.
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn call_args_keep_their_variant_through_json() {
        let args = vec![
            CallArg::Address(Address::from_low_u64(0xB0B)),
            CallArg::uint(42),
            CallArg::array(["1", "2"]),
        ];
        let json = serde_json::to_string(&args).unwrap();
        assert!(json.contains(r#""type":"address""#), "{json}");
        let back: Vec<CallArg> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, args);
    }

    #[test]
    fn address_round_trips_through_hex() {
        let addr = Address::from_low_u64(0xbeef);
        let text = addr.to_string();
        assert_eq!(text, "0x000000000000000000000000000000000000beef");
        assert_eq!(text.parse::<Address>().unwrap(), addr);
        assert!("0x1234".parse::<Address>().is_err());
    }

    #[test]
    fn action_ids_are_ten_hex_chars() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = ActionId::random(&mut rng);
        assert_eq!(id.as_str().len(), 10);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!id.is_none());
        assert!(ActionId::none().is_none());
    }

    #[test]
    fn contract_methods_use_abi_names() {
        assert_eq!(ContractMethod::InitPlayer.to_string(), "initPlayer");
        assert_eq!(ContractMethod::ClaimTreasure.as_ref(), "claimTreasure");
        assert_eq!(
            "battlePlayer".parse::<ContractMethod>().unwrap(),
            ContractMethod::BattlePlayer
        );
    }

    #[test]
    fn call_args_nest() {
        let arg = CallArg::array(["1", "2"]);
        let items = arg.as_array().unwrap();
        assert_eq!(items[1].as_uint(), Some("2"));
        assert_eq!(CallArg::uint(7u64), CallArg::Uint("7".to_string()));
    }
}
