//! Transfer mechanics
//!
//! Pure balance movement with no authorization of its own. Module privacy
//! keeps it reachable only from the engine's execute path: authorization
//! lives entirely in the engine, mechanics live here.

use crate::store::Account;
use crate::wallet::wallet::WalletError;

/// The accounts produced by a transfer, ready to be written back
#[derive(Clone, Debug)]
pub(crate) struct TransferOutcome {
    /// Source account with `amount` debited
    pub source: Account,
    /// Destination account with `amount` credited; freshly created as a
    /// plain account when no record existed at the destination
    pub destination: Account,
}

/// Move `amount` from `source` to `destination`
///
/// Requires `source.balance >= amount`, failing `InsufficientFunds`
/// otherwise. Produces updated copies; the caller commits them atomically
/// together with whatever bookkeeping the operation requires.
pub(crate) fn transfer(
    source: &Account,
    destination: Option<&Account>,
    amount: u64,
) -> Result<TransferOutcome, WalletError> {
    if source.balance < amount {
        return Err(WalletError::InsufficientFunds {
            have: source.balance,
            need: amount,
        });
    }

    let destination_account = match destination {
        Some(account) => account.credited(amount),
        None => Account::plain(amount),
    };

    Ok(TransferOutcome {
        source: source.debited(amount),
        destination: destination_account,
    })
}
