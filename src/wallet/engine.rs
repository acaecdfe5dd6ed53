//! Multisig authorization engine
//!
//! The core state machine: propose, approve, execute, with quorum checked
//! exactly once, at execution time. Every operation is a single synchronous
//! read-modify-write against the account store; conflicts surface as
//! `VersionConflict` for the caller to retry, never as an internal loop.

use crate::address::{transaction_address, wallet_address, Address};
use crate::store::{Account, AccountData, AccountStore, StoreError, WriteBatch};
use crate::wallet::executor;
use crate::wallet::transaction::TransferProposal;
use crate::wallet::wallet::{Wallet, WalletError};

/// Summary of a successfully executed transfer
#[derive(Clone, Debug)]
pub struct ExecutionReceipt {
    /// Address of the executed transaction record
    pub transaction: Address,
    /// Wallet the funds left
    pub wallet: Address,
    /// Identity the funds arrived at
    pub destination: Address,
    /// Value moved
    pub amount: u64,
    /// Distinct approvals the execution was authorized by
    pub approvals: usize,
}

/// The authorization engine over an account store
///
/// Generic over the store so engines can share one store by reference;
/// `WalletEngine::new(&store)` works wherever `store: MemoryStore`.
pub struct WalletEngine<S: AccountStore> {
    store: S,
}

impl<S: AccountStore> WalletEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a wallet controlled by `signers` with the given quorum
    ///
    /// The wallet lands at the address derived from the creator identity,
    /// so one identity creates at most one wallet. No funds move; the
    /// custodial balance arrives through the out-of-band funding channel.
    pub fn initialize_wallet(
        &self,
        caller: &Address,
        signers: Vec<Address>,
        quorum: u8,
        label: Option<String>,
    ) -> Result<Address, WalletError> {
        let wallet = Wallet::new(signers, quorum, label)?;
        let address = wallet_address(caller);
        let description = wallet.description();

        match self.store.create(&address, Account::wallet(wallet)) {
            Ok(_) => {
                log::info!("initialized {} wallet at {}", description, address);
                Ok(address)
            }
            Err(StoreError::AlreadyExists(_)) => Err(WalletError::AlreadyExists(address)),
            Err(e) => Err(e.into()),
        }
    }

    /// Propose a transfer of `amount` from `wallet` to `destination`
    ///
    /// The proposal lands at the address derived from (wallet, proposer):
    /// one live proposal per proposer per wallet. An executed record at that
    /// address is replaced; a live one fails `AlreadyExists`.
    pub fn propose_transaction(
        &self,
        caller: &Address,
        wallet: &Address,
        destination: &Address,
        amount: u64,
    ) -> Result<Address, WalletError> {
        let (wallet_record, _) = self.load_wallet(wallet)?;

        if !wallet_record.is_signer(caller) {
            return Err(WalletError::Unauthorized(caller.clone()));
        }

        let proposal = TransferProposal::new(wallet.clone(), destination.clone(), amount)?;
        let address = transaction_address(wallet, caller);

        match self.store.get(&address) {
            None => match self.store.create(&address, Account::transfer(proposal)) {
                Ok(_) => {}
                Err(StoreError::AlreadyExists(_)) => {
                    return Err(WalletError::AlreadyExists(address))
                }
                Err(e) => return Err(e.into()),
            },
            Some(existing) => {
                // Proposer-keyed addressing: the slot frees up only once the
                // occupying proposal has executed.
                let occupied_live = existing
                    .value
                    .as_transfer()
                    .map(|t| !t.executed)
                    .unwrap_or(true);
                if occupied_live {
                    return Err(WalletError::AlreadyExists(address));
                }
                let mut account = existing.value;
                account.data = AccountData::Transfer(proposal);
                self.store.update(&address, existing.version, account)?;
            }
        }

        log::info!(
            "proposed transfer of {} from {} to {} at {}",
            amount,
            wallet,
            destination,
            address
        );
        Ok(address)
    }

    /// Record the caller's approval of a pending transaction
    ///
    /// Always accepted once valid; no quorum check happens here. Returns
    /// the updated proposal.
    pub fn approve_transaction(
        &self,
        caller: &Address,
        transaction: &Address,
    ) -> Result<TransferProposal, WalletError> {
        let (account, version, mut proposal) = self.load_proposal(transaction)?;
        let (wallet_record, _) = self.load_wallet(&proposal.wallet)?;

        proposal.approve(caller, &wallet_record)?;

        let mut account = account;
        account.data = AccountData::Transfer(proposal.clone());
        self.store.update(transaction, version, account)?;

        log::info!(
            "approval {}/{} recorded on {}",
            proposal.approval_count(),
            wallet_record.quorum,
            transaction
        );
        Ok(proposal)
    }

    /// Execute a transaction whose approvals have reached quorum
    ///
    /// Any party may execute; authorization was settled by the approvals.
    /// The debit, the credit and the executed flag land in one atomic
    /// commit, so a conflict or crash never leaves a half-applied transfer.
    pub fn execute_transaction(
        &self,
        caller: &Address,
        transaction: &Address,
    ) -> Result<ExecutionReceipt, WalletError> {
        let (tx_account, tx_version, mut proposal) = self.load_proposal(transaction)?;

        if proposal.executed {
            return Err(WalletError::AlreadyExecuted);
        }

        let wallet_versioned = self
            .store
            .get(&proposal.wallet)
            .ok_or_else(|| WalletError::WalletNotFound(proposal.wallet.clone()))?;
        let wallet_record = wallet_versioned
            .value
            .as_wallet()
            .cloned()
            .ok_or_else(|| WalletError::WalletNotFound(proposal.wallet.clone()))?;

        if !proposal.has_quorum(&wallet_record) {
            return Err(WalletError::QuorumNotMet {
                have: proposal.approval_count(),
                need: wallet_record.quorum,
            });
        }

        proposal.mark_executed();
        let mut tx_account = tx_account;
        tx_account.data = AccountData::Transfer(proposal.clone());

        let batch = if proposal.destination == proposal.wallet {
            // A transfer to the wallet itself nets to zero; only the
            // executed flag changes, after the usual balance check.
            if wallet_versioned.value.balance < proposal.amount {
                return Err(WalletError::InsufficientFunds {
                    have: wallet_versioned.value.balance,
                    need: proposal.amount,
                });
            }
            WriteBatch::new().update(transaction.clone(), tx_version, tx_account)
        } else if proposal.destination == *transaction {
            // Crediting the transaction record itself: the credit must land
            // in the same write as the executed flag, or a second write to
            // the address would clobber the flag and reopen the proposal.
            let outcome = executor::transfer(
                &wallet_versioned.value,
                Some(&tx_account),
                proposal.amount,
            )?;
            WriteBatch::new()
                .update(
                    proposal.wallet.clone(),
                    wallet_versioned.version,
                    outcome.source,
                )
                .update(transaction.clone(), tx_version, outcome.destination)
        } else {
            let destination = self.store.get(&proposal.destination);
            let outcome = executor::transfer(
                &wallet_versioned.value,
                destination.as_ref().map(|v| &v.value),
                proposal.amount,
            )?;

            let batch = WriteBatch::new()
                .update(
                    proposal.wallet.clone(),
                    wallet_versioned.version,
                    outcome.source,
                )
                .update(transaction.clone(), tx_version, tx_account);
            match destination {
                Some(versioned) => batch.update(
                    proposal.destination.clone(),
                    versioned.version,
                    outcome.destination,
                ),
                None => batch.create(proposal.destination.clone(), outcome.destination),
            }
        };

        self.store.commit(batch)?;

        log::info!(
            "executed transfer of {} from {} to {} ({} approvals, triggered by {})",
            proposal.amount,
            proposal.wallet,
            proposal.destination,
            proposal.approval_count(),
            caller
        );

        Ok(ExecutionReceipt {
            transaction: transaction.clone(),
            wallet: proposal.wallet,
            destination: proposal.destination,
            amount: proposal.amount,
            approvals: proposal.approvals.len(),
        })
    }

    /// Fetch the wallet payload at `address`
    pub fn wallet(&self, address: &Address) -> Result<Wallet, WalletError> {
        self.load_wallet(address).map(|(wallet, _)| wallet)
    }

    /// Fetch the proposal payload at `address`
    pub fn proposal(&self, address: &Address) -> Result<TransferProposal, WalletError> {
        self.load_proposal(address).map(|(_, _, proposal)| proposal)
    }

    /// Balance of any account, zero if unoccupied
    pub fn balance(&self, address: &Address) -> u64 {
        self.store
            .get(address)
            .map(|versioned| versioned.value.balance)
            .unwrap_or(0)
    }

    fn load_wallet(&self, address: &Address) -> Result<(Wallet, crate::store::Version), WalletError> {
        let versioned = self
            .store
            .get(address)
            .ok_or_else(|| WalletError::WalletNotFound(address.clone()))?;
        let wallet = versioned
            .value
            .as_wallet()
            .cloned()
            .ok_or_else(|| WalletError::WalletNotFound(address.clone()))?;
        Ok((wallet, versioned.version))
    }

    fn load_proposal(
        &self,
        address: &Address,
    ) -> Result<(Account, crate::store::Version, TransferProposal), WalletError> {
        let versioned = self
            .store
            .get(address)
            .ok_or_else(|| WalletError::TransactionNotFound(address.clone()))?;
        let proposal = versioned
            .value
            .as_transfer()
            .cloned()
            .ok_or_else(|| WalletError::TransactionNotFound(address.clone()))?;
        Ok((versioned.value, versioned.version, proposal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    struct Fixture {
        store: MemoryStore,
        signers: Vec<Address>,
        wallet: Address,
    }

    /// Wallet with 3 signers, quorum 2, funded with 10_000
    fn funded_fixture() -> Fixture {
        let store = MemoryStore::new();
        let signers: Vec<Address> = (0..3).map(|_| Address::generate()).collect();

        let engine = WalletEngine::new(&store);
        let wallet = engine
            .initialize_wallet(&signers[0], signers.clone(), 2, None)
            .unwrap();
        store.deposit(&wallet, 10_000);

        Fixture {
            store,
            signers,
            wallet,
        }
    }

    #[test]
    fn test_initialize_wallet() {
        let store = MemoryStore::new();
        let engine = WalletEngine::new(&store);
        let creator = Address::generate();
        let signers = vec![creator.clone(), Address::generate()];

        let address = engine
            .initialize_wallet(&creator, signers.clone(), 2, Some("Ops".to_string()))
            .unwrap();

        let wallet = engine.wallet(&address).unwrap();
        assert_eq!(wallet.signers, signers);
        assert_eq!(wallet.quorum, 2);
        assert_eq!(engine.balance(&address), 0);
    }

    #[test]
    fn test_initialize_invalid_quorum() {
        let store = MemoryStore::new();
        let engine = WalletEngine::new(&store);
        let creator = Address::generate();
        let signers = vec![creator.clone(), Address::generate()];

        let result = engine.initialize_wallet(&creator, signers.clone(), 0, None);
        assert!(matches!(result, Err(WalletError::InvalidQuorum(_))));

        let result = engine.initialize_wallet(&creator, signers, 3, None);
        assert!(matches!(result, Err(WalletError::InvalidQuorum(_))));
    }

    #[test]
    fn test_initialize_twice_fails() {
        let store = MemoryStore::new();
        let engine = WalletEngine::new(&store);
        let creator = Address::generate();
        let signers = vec![creator.clone()];

        engine
            .initialize_wallet(&creator, signers.clone(), 1, None)
            .unwrap();
        // The derived address is already occupied
        let result = engine.initialize_wallet(&creator, signers, 1, None);
        assert!(matches!(result, Err(WalletError::AlreadyExists(_))));
    }

    #[test]
    fn test_propose_by_non_signer_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let outsider = Address::generate();
        let result =
            engine.propose_transaction(&outsider, &f.wallet, &Address::generate(), 1000);
        assert!(matches!(result, Err(WalletError::Unauthorized(_))));
    }

    #[test]
    fn test_propose_zero_amount_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let result =
            engine.propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 0);
        assert!(matches!(result, Err(WalletError::InvalidAmount)));
    }

    #[test]
    fn test_propose_against_unknown_wallet() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let result = engine.propose_transaction(
            &f.signers[0],
            &Address::generate(),
            &Address::generate(),
            1000,
        );
        assert!(matches!(result, Err(WalletError::WalletNotFound(_))));
    }

    #[test]
    fn test_concurrent_live_proposal_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 1000)
            .unwrap();
        // Same proposer, same wallet: the derived address is occupied live
        let result =
            engine.propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 500);
        assert!(matches!(result, Err(WalletError::AlreadyExists(_))));

        // A different proposer lands at a different address
        engine
            .propose_transaction(&f.signers[1], &f.wallet, &Address::generate(), 500)
            .unwrap();
    }

    #[test]
    fn test_full_lifecycle() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);
        let destination = Address::generate();

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &destination, 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();

        let receipt = engine.execute_transaction(&f.signers[2], &tx).unwrap();
        assert_eq!(receipt.amount, 1000);
        assert_eq!(receipt.approvals, 2);

        assert_eq!(engine.balance(&destination), 1000);
        assert_eq!(engine.balance(&f.wallet), 9_000);

        let proposal = engine.proposal(&tx).unwrap();
        assert!(proposal.executed);
        assert_eq!(
            proposal.approvals,
            vec![f.signers[0].clone(), f.signers[1].clone()]
        );
    }

    #[test]
    fn test_execute_below_quorum_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);
        let destination = Address::generate();

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &destination, 1000)
            .unwrap();

        // No approvals at all
        let result = engine.execute_transaction(&f.signers[0], &tx);
        assert!(matches!(
            result,
            Err(WalletError::QuorumNotMet { have: 0, need: 2 })
        ));

        // One approval, still short
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        let result = engine.execute_transaction(&f.signers[0], &tx);
        assert!(matches!(
            result,
            Err(WalletError::QuorumNotMet { have: 1, need: 2 })
        ));

        assert_eq!(engine.balance(&destination), 0);
        assert_eq!(engine.balance(&f.wallet), 10_000);
        assert!(!engine.proposal(&tx).unwrap().executed);
    }

    #[test]
    fn test_double_execute_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);
        let destination = Address::generate();

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &destination, 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();
        engine.execute_transaction(&f.signers[0], &tx).unwrap();

        let result = engine.execute_transaction(&f.signers[0], &tx);
        assert!(matches!(result, Err(WalletError::AlreadyExecuted)));

        // Balances unchanged from the first execution
        assert_eq!(engine.balance(&destination), 1000);
        assert_eq!(engine.balance(&f.wallet), 9_000);
    }

    #[test]
    fn test_approve_after_execute_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();
        engine.execute_transaction(&f.signers[0], &tx).unwrap();

        let result = engine.approve_transaction(&f.signers[2], &tx);
        assert!(matches!(result, Err(WalletError::AlreadyExecuted)));
    }

    #[test]
    fn test_double_approval_rejected() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();

        let result = engine.approve_transaction(&f.signers[0], &tx);
        assert!(matches!(result, Err(WalletError::AlreadyApproved)));
        assert_eq!(engine.proposal(&tx).unwrap().approval_count(), 1);
    }

    #[test]
    fn test_execute_unfunded_wallet() {
        let store = MemoryStore::new();
        let engine = WalletEngine::new(&store);
        let signers: Vec<Address> = (0..2).map(|_| Address::generate()).collect();
        let wallet = engine
            .initialize_wallet(&signers[0], signers.clone(), 1, None)
            .unwrap();

        // Deposit never happened
        let tx = engine
            .propose_transaction(&signers[0], &wallet, &Address::generate(), 1000)
            .unwrap();
        engine.approve_transaction(&signers[0], &tx).unwrap();

        let result = engine.execute_transaction(&signers[0], &tx);
        assert!(matches!(
            result,
            Err(WalletError::InsufficientFunds { have: 0, need: 1000 })
        ));
        assert!(!engine.proposal(&tx).unwrap().executed);
    }

    #[test]
    fn test_anyone_may_execute() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);
        let destination = Address::generate();

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &destination, 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();

        // Execution is open once quorum is met; the outsider just pulls the
        // trigger on a fully authorized transfer.
        let outsider = Address::generate();
        engine.execute_transaction(&outsider, &tx).unwrap();
        assert_eq!(engine.balance(&destination), 1000);
    }

    #[test]
    fn test_address_reusable_after_execution() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();
        engine.execute_transaction(&f.signers[0], &tx).unwrap();

        // The executed record is replaced by the new proposal
        let tx2 = engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 500)
            .unwrap();
        assert_eq!(tx, tx2);

        let proposal = engine.proposal(&tx2).unwrap();
        assert_eq!(proposal.amount, 500);
        assert!(!proposal.executed);
        assert_eq!(proposal.approval_count(), 0);
    }

    #[test]
    fn test_transfer_to_wallet_itself() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &f.wallet, 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();
        engine.execute_transaction(&f.signers[0], &tx).unwrap();

        // Nets to zero, but the proposal is spent
        assert_eq!(engine.balance(&f.wallet), 10_000);
        assert!(engine.proposal(&tx).unwrap().executed);
    }

    #[test]
    fn test_transfer_to_transaction_record_executes_once() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        // The destination is the proposal's own derived address, which any
        // signer can compute up front
        let tx_addr = transaction_address(&f.wallet, &f.signers[0]);
        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &tx_addr, 1000)
            .unwrap();
        assert_eq!(tx, tx_addr);

        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();
        engine.execute_transaction(&f.signers[0], &tx).unwrap();

        // The credit and the executed flag landed in the same record
        let proposal = engine.proposal(&tx).unwrap();
        assert!(proposal.executed);
        assert_eq!(engine.balance(&tx), 1000);
        assert_eq!(engine.balance(&f.wallet), 9_000);

        // Execution stays one-time: repeats fail and nothing more moves
        for _ in 0..3 {
            let result = engine.execute_transaction(&f.signers[0], &tx);
            assert!(matches!(result, Err(WalletError::AlreadyExecuted)));
        }
        assert_eq!(engine.balance(&tx), 1000);
        assert_eq!(engine.balance(&f.wallet), 9_000);
    }

    #[test]
    fn test_concurrent_approvals_both_land() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &Address::generate(), 1000)
            .unwrap();

        std::thread::scope(|scope| {
            for signer in &f.signers[..2] {
                let store = &f.store;
                let tx = &tx;
                scope.spawn(move || {
                    let engine = WalletEngine::new(store);
                    // Caller-side retry on conflict, per the store contract
                    loop {
                        match engine.approve_transaction(signer, tx) {
                            Ok(_) => break,
                            Err(e) if e.is_retryable() => continue,
                            Err(e) => panic!("unexpected failure: {}", e),
                        }
                    }
                });
            }
        });

        let proposal = engine.proposal(&tx).unwrap();
        assert_eq!(proposal.approval_count(), 2);
        assert!(proposal.has_approved(&f.signers[0]));
        assert!(proposal.has_approved(&f.signers[1]));
    }

    #[test]
    fn test_concurrent_executes_single_transfer() {
        let f = funded_fixture();
        let engine = WalletEngine::new(&f.store);
        let destination = Address::generate();

        let tx = engine
            .propose_transaction(&f.signers[0], &f.wallet, &destination, 1000)
            .unwrap();
        engine.approve_transaction(&f.signers[0], &tx).unwrap();
        engine.approve_transaction(&f.signers[1], &tx).unwrap();

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = &f.store;
                    let caller = &f.signers[0];
                    let tx = &tx;
                    scope.spawn(move || {
                        let engine = WalletEngine::new(store);
                        loop {
                            match engine.execute_transaction(caller, tx) {
                                Ok(_) => return true,
                                Err(e) if e.is_retryable() => continue,
                                Err(WalletError::AlreadyExecuted) => return false,
                                Err(e) => panic!("unexpected failure: {}", e),
                            }
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Exactly one winner, and the value moved exactly once
        assert_eq!(outcomes.iter().filter(|won| **won).count(), 1);
        assert_eq!(engine.balance(&destination), 1000);
        assert_eq!(engine.balance(&f.wallet), 9_000);
    }
}
