//! Local balance gate applied before any write is queued.

use tracing::debug;

use crate::traits::{TransactionExecutor, TxError};
use crate::types::Address;

/// Fails unless a signer is connected and holds at least `min_balance` wei.
///
/// Returns the signing account on success.
pub async fn ensure_can_transact<C>(chain: &C, min_balance: u128) -> Result<Address, TxError>
where
    C: TransactionExecutor + ?Sized,
{
    let account = chain.account().ok_or(TxError::NoSigner)?;
    let balance = chain.balance(account).await?;
    if balance < min_balance {
        debug!(%account, balance, min_balance, "balance below transaction threshold");
        return Err(TxError::InsufficientBalance {
            balance,
            required: min_balance,
        });
    }
    Ok(account)
}
