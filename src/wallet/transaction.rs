//! Transfer proposal records
//!
//! A proposal is a pending value transfer tied to one wallet. It collects
//! approvals from distinct signers; quorum satisfaction is never stored,
//! only computed from the approval count at execution time.

use crate::address::Address;
use crate::wallet::wallet::{Wallet, WalletError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transfer awaiting (or past) quorum authorization
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransferProposal {
    /// The wallet this proposal spends from
    pub wallet: Address,
    /// Identity receiving the funds
    pub destination: Address,
    /// Value to transfer
    pub amount: u64,
    /// Signers that have approved, in approval order, no duplicates
    pub approvals: Vec<Address>,
    /// Whether the transfer has happened; transitions false to true once
    pub executed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When the proposal last changed
    pub updated_at: DateTime<Utc>,
}

impl TransferProposal {
    /// Create a fresh proposal with no approvals
    pub fn new(wallet: Address, destination: Address, amount: u64) -> Result<Self, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        let now = Utc::now();
        Ok(Self {
            wallet,
            destination,
            amount,
            approvals: Vec::new(),
            executed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Record an approval from `signer`
    ///
    /// Validation order: the caller must be an authorized signer of
    /// `wallet`, the proposal must not already be executed, and the signer
    /// must not have approved before. No quorum check happens here; approval
    /// is always accepted once valid, and the quorum predicate is evaluated
    /// at execution time instead.
    pub fn approve(&mut self, signer: &Address, wallet: &Wallet) -> Result<(), WalletError> {
        if !wallet.is_signer(signer) {
            return Err(WalletError::Unauthorized(signer.clone()));
        }

        if self.executed {
            return Err(WalletError::AlreadyExecuted);
        }

        if self.has_approved(signer) {
            return Err(WalletError::AlreadyApproved);
        }

        self.approvals.push(signer.clone());
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Whether `signer` has already approved
    pub fn has_approved(&self, signer: &Address) -> bool {
        self.approvals.contains(signer)
    }

    /// Number of distinct approvals collected
    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    /// The computed quorum predicate: enough distinct approvals to execute
    pub fn has_quorum(&self, wallet: &Wallet) -> bool {
        self.approvals.len() >= wallet.quorum as usize
    }

    /// Mark the transfer as executed
    ///
    /// Only the engine's execute path calls this, inside the same atomic
    /// commit that moves the funds.
    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
        self.updated_at = Utc::now();
    }
}
