//! Multisig wallet record
//!
//! A wallet is a custodial account controlled by a fixed set of signer
//! identities and a quorum threshold. Both are immutable after creation;
//! the wallet's value lives as its account's intrinsic balance.

use crate::address::Address;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the signer set size
pub const MAX_SIGNERS: usize = 30;

/// Errors raised by wallet operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid quorum: {0}")]
    InvalidQuorum(String),
    #[error("Too many signers: {count} exceeds the maximum of {max}")]
    TooManySigners { count: usize, max: usize },
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Unauthorized: {0} is not a signer of this wallet")]
    Unauthorized(Address),
    #[error("Account already exists at {0}")]
    AlreadyExists(Address),
    #[error("Signer has already approved this transaction")]
    AlreadyApproved,
    #[error("Transaction has already been executed")]
    AlreadyExecuted,
    #[error("Quorum not met: have {have} approvals, need {need}")]
    QuorumNotMet { have: usize, need: u8 },
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Wallet not found: {0}")]
    WalletNotFound(Address),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Address),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl WalletError {
    /// Whether the caller may retry the same logical operation
    ///
    /// Only a version conflict is transient; every semantic failure is
    /// terminal for the call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Store(StoreError::VersionConflict(_)))
    }
}

/// A multisig wallet payload
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Wallet {
    /// Authorized signer identities, in the order supplied at creation
    pub signers: Vec<Address>,
    /// Minimum distinct approvals required before execution (M in M-of-N)
    pub quorum: u8,
    /// Optional human-readable label
    pub label: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet payload with validation
    ///
    /// The quorum must satisfy `1 <= quorum <= signers.len()` and the signer
    /// set is capped at [`MAX_SIGNERS`]. Duplicate signers are not rejected;
    /// a duplicated identity still counts once toward quorum because
    /// approvals are deduplicated per identity.
    pub fn new(
        signers: Vec<Address>,
        quorum: u8,
        label: Option<String>,
    ) -> Result<Self, WalletError> {
        if quorum == 0 {
            return Err(WalletError::InvalidQuorum(
                "quorum must be at least 1".to_string(),
            ));
        }

        if signers.len() > MAX_SIGNERS {
            return Err(WalletError::TooManySigners {
                count: signers.len(),
                max: MAX_SIGNERS,
            });
        }

        if quorum as usize > signers.len() {
            return Err(WalletError::InvalidQuorum(format!(
                "quorum {} exceeds signer count {}",
                quorum,
                signers.len()
            )));
        }

        Ok(Self {
            signers,
            quorum,
            label,
            created_at: Utc::now(),
        })
    }

    /// Check whether `identity` is an authorized signer
    pub fn is_signer(&self, identity: &Address) -> bool {
        self.signers.contains(identity)
    }

    /// Total signer count (N)
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    /// Human-readable description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.quorum, self.signers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signers(n: usize) -> Vec<Address> {
        (0..n).map(|_| Address::generate()).collect()
    }

    #[test]
    fn test_wallet_creation() {
        let wallet = Wallet::new(sample_signers(3), 2, Some("Team".to_string())).unwrap();
        assert_eq!(wallet.quorum, 2);
        assert_eq!(wallet.signer_count(), 3);
        assert_eq!(wallet.description(), "2-of-3");
        assert!(wallet.label.is_some());
    }

    #[test]
    fn test_zero_quorum_rejected() {
        let result = Wallet::new(sample_signers(3), 0, None);
        assert!(matches!(result, Err(WalletError::InvalidQuorum(_))));
    }

    #[test]
    fn test_quorum_above_signer_count_rejected() {
        let result = Wallet::new(sample_signers(3), 4, None);
        assert!(matches!(result, Err(WalletError::InvalidQuorum(_))));
    }

    #[test]
    fn test_quorum_equal_to_signer_count_allowed() {
        let wallet = Wallet::new(sample_signers(3), 3, None).unwrap();
        assert_eq!(wallet.description(), "3-of-3");
    }

    #[test]
    fn test_single_signer_wallet_allowed() {
        let wallet = Wallet::new(sample_signers(1), 1, None).unwrap();
        assert_eq!(wallet.description(), "1-of-1");
    }

    #[test]
    fn test_signer_cap() {
        assert!(Wallet::new(sample_signers(MAX_SIGNERS), 1, None).is_ok());
        let result = Wallet::new(sample_signers(MAX_SIGNERS + 1), 1, None);
        assert!(matches!(result, Err(WalletError::TooManySigners { .. })));
    }

    #[test]
    fn test_is_signer() {
        let signers = sample_signers(3);
        let wallet = Wallet::new(signers.clone(), 2, None).unwrap();

        assert!(wallet.is_signer(&signers[0]));
        assert!(wallet.is_signer(&signers[2]));
        assert!(!wallet.is_signer(&Address::generate()));
    }

    #[test]
    fn test_retryable_classification() {
        let conflict = WalletError::Store(StoreError::VersionConflict(Address::generate()));
        assert!(conflict.is_retryable());
        assert!(!WalletError::AlreadyExecuted.is_retryable());
        assert!(!WalletError::InvalidAmount.is_retryable());
    }
}
