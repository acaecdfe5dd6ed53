//! Account records held in the store
//!
//! Every address maps to at most one account: a custodial balance plus a
//! typed payload describing what kind of entity lives there.

use crate::swap::{Swap, Treasury};
use crate::wallet::{TransferProposal, Wallet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed payload of an account
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AccountData {
    /// Pure value holder (identities, destinations)
    Plain,
    /// A multisig wallet; the account's balance is the wallet's custodial pot
    Wallet(Wallet),
    /// A pending or executed transfer proposal
    Transfer(TransferProposal),
    /// A two-party swap agreement
    Swap(Swap),
    /// A per-identity treasury funded for swaps
    Treasury(Treasury),
}

/// A single record in the account store
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Intrinsic value held by this account
    pub balance: u64,
    /// What lives at this address
    pub data: AccountData,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a plain value-holding account
    pub fn plain(balance: u64) -> Self {
        Self {
            balance,
            data: AccountData::Plain,
            created_at: Utc::now(),
        }
    }

    /// Create a wallet account with an empty custodial balance
    pub fn wallet(wallet: Wallet) -> Self {
        Self {
            balance: 0,
            data: AccountData::Wallet(wallet),
            created_at: Utc::now(),
        }
    }

    /// Create a transfer proposal account
    pub fn transfer(proposal: TransferProposal) -> Self {
        Self {
            balance: 0,
            data: AccountData::Transfer(proposal),
            created_at: Utc::now(),
        }
    }

    /// Create a swap agreement account
    pub fn swap(swap: Swap) -> Self {
        Self {
            balance: 0,
            data: AccountData::Swap(swap),
            created_at: Utc::now(),
        }
    }

    /// Create a treasury account
    pub fn treasury(treasury: Treasury) -> Self {
        Self {
            balance: 0,
            data: AccountData::Treasury(treasury),
            created_at: Utc::now(),
        }
    }

    /// The wallet payload, if this is a wallet account
    pub fn as_wallet(&self) -> Option<&Wallet> {
        match &self.data {
            AccountData::Wallet(wallet) => Some(wallet),
            _ => None,
        }
    }

    /// The transfer payload, if this is a transfer account
    pub fn as_transfer(&self) -> Option<&TransferProposal> {
        match &self.data {
            AccountData::Transfer(proposal) => Some(proposal),
            _ => None,
        }
    }

    /// The swap payload, if this is a swap account
    pub fn as_swap(&self) -> Option<&Swap> {
        match &self.data {
            AccountData::Swap(swap) => Some(swap),
            _ => None,
        }
    }

    /// The treasury payload, if this is a treasury account
    pub fn as_treasury(&self) -> Option<&Treasury> {
        match &self.data {
            AccountData::Treasury(treasury) => Some(treasury),
            _ => None,
        }
    }

    /// Short human-readable kind label
    pub fn kind(&self) -> &'static str {
        match &self.data {
            AccountData::Plain => "plain",
            AccountData::Wallet(_) => "wallet",
            AccountData::Transfer(_) => "transfer",
            AccountData::Swap(_) => "swap",
            AccountData::Treasury(_) => "treasury",
        }
    }

    /// Return a copy with `amount` credited
    pub fn credited(&self, amount: u64) -> Self {
        let mut account = self.clone();
        account.balance = account.balance.saturating_add(amount);
        account
    }

    /// Return a copy with `amount` debited
    ///
    /// Callers must have verified `balance >= amount` first.
    pub fn debited(&self, amount: u64) -> Self {
        let mut account = self.clone();
        account.balance = account.balance.saturating_sub(amount);
        account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    #[test]
    fn test_plain_account() {
        let account = Account::plain(500);
        assert_eq!(account.balance, 500);
        assert_eq!(account.kind(), "plain");
        assert!(account.as_wallet().is_none());
    }

    #[test]
    fn test_credit_debit() {
        let account = Account::plain(100);
        let credited = account.credited(50);
        assert_eq!(credited.balance, 150);
        let debited = credited.debited(30);
        assert_eq!(debited.balance, 120);
        // Original untouched
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_payload_accessors() {
        let wallet = Wallet::new(
            vec![Address::generate(), Address::generate()],
            2,
            None,
        )
        .unwrap();
        let account = Account::wallet(wallet);
        assert_eq!(account.balance, 0);
        assert_eq!(account.kind(), "wallet");
        assert!(account.as_wallet().is_some());
        assert!(account.as_transfer().is_none());
    }
}
