//! Swap and treasury records
//!
//! A swap is a two-party atomic exchange: the proposer names an accepter
//! and the amounts each side puts in; once the accepter agrees, anyone can
//! trigger the exchange between the two parties' treasuries.

use crate::address::Address;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by swap operations
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("Invalid amount: both swap legs must be greater than 0")]
    InvalidAmount,
    #[error("Invalid accepter: cannot propose a swap with yourself")]
    SelfSwap,
    #[error("Unauthorized: {0} is not the named accepter")]
    Unauthorized(Address),
    #[error("Account already exists at {0}")]
    AlreadyExists(Address),
    #[error("Swap has already been accepted")]
    AlreadyAccepted,
    #[error("Swap has already been executed")]
    AlreadyExecuted,
    #[error("Swap has not been accepted yet")]
    NotAccepted,
    #[error("Insufficient funds: {party} treasury has {have}, needs {need}")]
    InsufficientFunds {
        party: &'static str,
        have: u64,
        need: u64,
    },
    #[error("Swap not found: {0}")]
    SwapNotFound(Address),
    #[error("Treasury not found for {0}")]
    TreasuryNotFound(Address),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SwapError {
    /// Whether the caller may retry the same logical operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, SwapError::Store(StoreError::VersionConflict(_)))
    }
}

/// A two-party swap agreement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Swap {
    /// Identity that proposed the swap
    pub proposer: Address,
    /// Identity that must accept before execution
    pub accepter: Address,
    /// Value the proposer's treasury gives up
    pub proposer_amount: u64,
    /// Value the accepter's treasury gives up
    pub accepter_amount: u64,
    /// Set once by the named accepter
    pub accepted: bool,
    /// Whether the exchange has happened; transitions false to true once
    pub executed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// When the agreement last changed
    pub updated_at: DateTime<Utc>,
}

impl Swap {
    /// Create a swap agreement with validation
    pub fn new(
        proposer: Address,
        accepter: Address,
        proposer_amount: u64,
        accepter_amount: u64,
    ) -> Result<Self, SwapError> {
        if proposer == accepter {
            return Err(SwapError::SelfSwap);
        }

        if proposer_amount == 0 || accepter_amount == 0 {
            return Err(SwapError::InvalidAmount);
        }

        let now = Utc::now();
        Ok(Self {
            proposer,
            accepter,
            proposer_amount,
            accepter_amount,
            accepted: false,
            executed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Record acceptance by `caller`
    ///
    /// Only the named accepter may accept, exactly once, and never after
    /// execution.
    pub fn accept(&mut self, caller: &Address) -> Result<(), SwapError> {
        if caller != &self.accepter {
            return Err(SwapError::Unauthorized(caller.clone()));
        }

        if self.executed {
            return Err(SwapError::AlreadyExecuted);
        }

        if self.accepted {
            return Err(SwapError::AlreadyAccepted);
        }

        self.accepted = true;
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Mark the exchange as executed
    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
        self.updated_at = Utc::now();
    }
}

/// A per-identity treasury holding funds committed to swaps
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Treasury {
    /// Identity that owns this treasury
    pub owner: Address,
}

impl Treasury {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_swap() -> (Swap, Address, Address) {
        let proposer = Address::generate();
        let accepter = Address::generate();
        let swap = Swap::new(proposer.clone(), accepter.clone(), 100, 250).unwrap();
        (swap, proposer, accepter)
    }

    #[test]
    fn test_swap_creation() {
        let (swap, _, _) = test_swap();
        assert!(!swap.accepted);
        assert!(!swap.executed);
        assert_eq!(swap.proposer_amount, 100);
        assert_eq!(swap.accepter_amount, 250);
    }

    #[test]
    fn test_self_swap_rejected() {
        let identity = Address::generate();
        let result = Swap::new(identity.clone(), identity, 100, 100);
        assert!(matches!(result, Err(SwapError::SelfSwap)));
    }

    #[test]
    fn test_zero_leg_rejected() {
        let proposer = Address::generate();
        let accepter = Address::generate();
        assert!(matches!(
            Swap::new(proposer.clone(), accepter.clone(), 0, 100),
            Err(SwapError::InvalidAmount)
        ));
        assert!(matches!(
            Swap::new(proposer, accepter, 100, 0),
            Err(SwapError::InvalidAmount)
        ));
    }

    #[test]
    fn test_accept_by_named_accepter() {
        let (mut swap, _, accepter) = test_swap();
        swap.accept(&accepter).unwrap();
        assert!(swap.accepted);
    }

    #[test]
    fn test_accept_by_other_party_rejected() {
        let (mut swap, proposer, _) = test_swap();
        assert!(matches!(
            swap.accept(&proposer),
            Err(SwapError::Unauthorized(_))
        ));
        assert!(matches!(
            swap.accept(&Address::generate()),
            Err(SwapError::Unauthorized(_))
        ));
        assert!(!swap.accepted);
    }

    #[test]
    fn test_double_accept_rejected() {
        let (mut swap, _, accepter) = test_swap();
        swap.accept(&accepter).unwrap();
        assert!(matches!(
            swap.accept(&accepter),
            Err(SwapError::AlreadyAccepted)
        ));
    }

    #[test]
    fn test_accept_after_execution_rejected() {
        let (mut swap, _, accepter) = test_swap();
        swap.accept(&accepter).unwrap();
        swap.mark_executed();
        assert!(matches!(
            swap.accept(&accepter),
            Err(SwapError::AlreadyExecuted)
        ));
    }
}
