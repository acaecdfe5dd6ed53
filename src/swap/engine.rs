//! Swap engine
//!
//! Propose, accept and execute two-party exchanges between treasuries, plus
//! the treasury funding operation. Follows the same store discipline as the
//! wallet engine: single synchronous read-modify-write per call, atomic
//! multi-record commits, conflicts surfaced for caller retry.

use crate::address::{swap_address, treasury_address, Address};
use crate::store::{Account, AccountData, AccountStore, StoreError, WriteBatch};
use crate::swap::swap::{Swap, SwapError, Treasury};

/// The swap engine over an account store
pub struct SwapEngine<S: AccountStore> {
    store: S,
}

impl<S: AccountStore> SwapEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Propose a swap: the caller offers `proposer_amount` against the
    /// accepter's `accepter_amount`
    ///
    /// The agreement lands at the address derived from (proposer, accepter):
    /// one live swap per ordered pair. An executed record is replaced; a
    /// live one fails `AlreadyExists`.
    pub fn propose_swap(
        &self,
        caller: &Address,
        accepter: &Address,
        proposer_amount: u64,
        accepter_amount: u64,
    ) -> Result<Address, SwapError> {
        let swap = Swap::new(
            caller.clone(),
            accepter.clone(),
            proposer_amount,
            accepter_amount,
        )?;
        let address = swap_address(caller, accepter);

        match self.store.get(&address) {
            None => match self.store.create(&address, Account::swap(swap)) {
                Ok(_) => {}
                Err(StoreError::AlreadyExists(_)) => {
                    return Err(SwapError::AlreadyExists(address))
                }
                Err(e) => return Err(e.into()),
            },
            Some(existing) => {
                let occupied_live = existing
                    .value
                    .as_swap()
                    .map(|s| !s.executed)
                    .unwrap_or(true);
                if occupied_live {
                    return Err(SwapError::AlreadyExists(address));
                }
                let mut account = existing.value;
                account.data = AccountData::Swap(swap);
                self.store.update(&address, existing.version, account)?;
            }
        }

        log::info!(
            "proposed swap {} for {} between {} and {} at {}",
            proposer_amount,
            accepter_amount,
            caller,
            accepter,
            address
        );
        Ok(address)
    }

    /// Accept a proposed swap; only the named accepter may
    pub fn accept_swap(&self, caller: &Address, swap: &Address) -> Result<Swap, SwapError> {
        let (account, version, mut agreement) = self.load_swap(swap)?;

        agreement.accept(caller)?;

        let mut account = account;
        account.data = AccountData::Swap(agreement.clone());
        self.store.update(swap, version, account)?;

        log::info!("swap {} accepted by {}", swap, caller);
        Ok(agreement)
    }

    /// Move `amount` from the caller's plain account into their treasury
    ///
    /// Creates the treasury on first use. The debit and the credit land in
    /// one atomic commit.
    pub fn fund_treasury(&self, caller: &Address, amount: u64) -> Result<Address, SwapError> {
        if amount == 0 {
            return Err(SwapError::InvalidAmount);
        }

        let source = self
            .store
            .get(caller)
            .ok_or_else(|| SwapError::InsufficientFunds {
                party: "funding",
                have: 0,
                need: amount,
            })?;
        if source.value.balance < amount {
            return Err(SwapError::InsufficientFunds {
                party: "funding",
                have: source.value.balance,
                need: amount,
            });
        }

        let address = treasury_address(caller);
        let batch = WriteBatch::new().update(
            caller.clone(),
            source.version,
            source.value.debited(amount),
        );
        let batch = match self.store.get(&address) {
            Some(treasury) => {
                batch.update(address.clone(), treasury.version, treasury.value.credited(amount))
            }
            None => {
                let mut account = Account::treasury(Treasury::new(caller.clone()));
                account.balance = amount;
                batch.create(address.clone(), account)
            }
        };

        self.store.commit(batch)?;

        log::info!("funded treasury {} with {}", address, amount);
        Ok(address)
    }

    /// Execute an accepted swap, exchanging both legs atomically
    ///
    /// Requires the swap to be accepted and not yet executed, and both
    /// treasuries to cover their legs. Both debits, both credits and the
    /// executed flag land in a single commit.
    pub fn execute_swap(&self, caller: &Address, swap: &Address) -> Result<Swap, SwapError> {
        let (account, version, mut agreement) = self.load_swap(swap)?;

        if agreement.executed {
            return Err(SwapError::AlreadyExecuted);
        }

        if !agreement.accepted {
            return Err(SwapError::NotAccepted);
        }

        let proposer_treasury = self.load_treasury(&agreement.proposer)?;
        let accepter_treasury = self.load_treasury(&agreement.accepter)?;

        if proposer_treasury.1.balance < agreement.proposer_amount {
            return Err(SwapError::InsufficientFunds {
                party: "proposer",
                have: proposer_treasury.1.balance,
                need: agreement.proposer_amount,
            });
        }
        if accepter_treasury.1.balance < agreement.accepter_amount {
            return Err(SwapError::InsufficientFunds {
                party: "accepter",
                have: accepter_treasury.1.balance,
                need: agreement.accepter_amount,
            });
        }

        agreement.mark_executed();
        let mut account = account;
        account.data = AccountData::Swap(agreement.clone());

        let proposer_after = proposer_treasury
            .1
            .debited(agreement.proposer_amount)
            .credited(agreement.accepter_amount);
        let accepter_after = accepter_treasury
            .1
            .debited(agreement.accepter_amount)
            .credited(agreement.proposer_amount);

        let (proposer_addr, _, proposer_version) = proposer_treasury;
        let (accepter_addr, _, accepter_version) = accepter_treasury;
        let batch = WriteBatch::new()
            .update(proposer_addr, proposer_version, proposer_after)
            .update(accepter_addr, accepter_version, accepter_after)
            .update(swap.clone(), version, account);

        self.store.commit(batch)?;

        log::info!(
            "executed swap {}: {} gave {}, {} gave {} (triggered by {})",
            swap,
            agreement.proposer,
            agreement.proposer_amount,
            agreement.accepter,
            agreement.accepter_amount,
            caller
        );
        Ok(agreement)
    }

    /// Fetch the swap payload at `address`
    pub fn swap(&self, address: &Address) -> Result<Swap, SwapError> {
        self.load_swap(address).map(|(_, _, swap)| swap)
    }

    /// Balance of `owner`'s treasury, zero if it does not exist yet
    pub fn treasury_balance(&self, owner: &Address) -> u64 {
        self.store
            .get(&treasury_address(owner))
            .map(|versioned| versioned.value.balance)
            .unwrap_or(0)
    }

    fn load_swap(
        &self,
        address: &Address,
    ) -> Result<(Account, crate::store::Version, Swap), SwapError> {
        let versioned = self
            .store
            .get(address)
            .ok_or_else(|| SwapError::SwapNotFound(address.clone()))?;
        let swap = versioned
            .value
            .as_swap()
            .cloned()
            .ok_or_else(|| SwapError::SwapNotFound(address.clone()))?;
        Ok((versioned.value, versioned.version, swap))
    }

    fn load_treasury(
        &self,
        owner: &Address,
    ) -> Result<(Address, Account, crate::store::Version), SwapError> {
        let address = treasury_address(owner);
        let versioned = self
            .store
            .get(&address)
            .ok_or_else(|| SwapError::TreasuryNotFound(owner.clone()))?;
        Ok((address, versioned.value, versioned.version))
    }
}
