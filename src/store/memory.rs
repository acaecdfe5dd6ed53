//! In-memory account store
//!
//! A `Mutex<HashMap>` keyed by address, with a per-record version for
//! conditional updates. The single lock makes every operation serializable;
//! batches validate all version expectations under the lock before applying
//! any write.

use crate::address::Address;
use crate::store::{Account, AccountStore, StoreError, Version, Versioned, WriteBatch, WriteOp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A stored record with its version counter
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Entry {
    account: Account,
    version: Version,
}

/// Serializable snapshot of the whole store
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct StoreSnapshot {
    accounts: HashMap<Address, (Account, Version)>,
}

/// In-memory versioned account store
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<Address, Entry>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Out-of-band funding channel: credit `amount` to `address`
    ///
    /// Creates a plain account if the address is unoccupied. This is how
    /// wallets receive their custodial balance and identities receive
    /// spendable value; it sits outside the engines' authorization paths.
    pub fn deposit(&self, address: &Address, amount: u64) -> Version {
        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts.entry(address.clone()).or_insert_with(|| Entry {
            account: Account::plain(0),
            version: 0,
        });
        entry.account.balance = match entry.account.balance.checked_add(amount) {
            Some(balance) => balance,
            None => {
                log::warn!(
                    "deposit of {} to {} overflows the balance; clamping to u64::MAX",
                    amount,
                    address
                );
                u64::MAX
            }
        };
        entry.version += 1;
        log::debug!("deposited {} to {}", amount, address);
        entry.version
    }

    /// Current balance at `address`, zero if unoccupied
    pub fn balance(&self, address: &Address) -> u64 {
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .map(|entry| entry.account.balance)
            .unwrap_or(0)
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.lock().unwrap().is_empty()
    }

    /// Capture the full store state for persistence
    pub fn snapshot(&self) -> StoreSnapshot {
        let accounts = self.accounts.lock().unwrap();
        StoreSnapshot {
            accounts: accounts
                .iter()
                .map(|(addr, entry)| (addr.clone(), (entry.account.clone(), entry.version)))
                .collect(),
        }
    }

    /// Rebuild a store from a snapshot, versions included
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let accounts = snapshot
            .accounts
            .into_iter()
            .map(|(addr, (account, version))| (addr, Entry { account, version }))
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, address: &Address) -> Option<Versioned<Account>> {
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .map(|entry| Versioned {
                value: entry.account.clone(),
                version: entry.version,
            })
    }

    fn create(&self, address: &Address, account: Account) -> Result<Version, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(address) {
            return Err(StoreError::AlreadyExists(address.clone()));
        }
        accounts.insert(
            address.clone(),
            Entry {
                account,
                version: 1,
            },
        );
        log::debug!("created account at {}", address);
        Ok(1)
    }

    fn update(
        &self,
        address: &Address,
        expected: Version,
        account: Account,
    ) -> Result<Version, StoreError> {
        let mut accounts = self.accounts.lock().unwrap();
        let entry = accounts
            .get_mut(address)
            .ok_or_else(|| StoreError::NotFound(address.clone()))?;
        if entry.version != expected {
            return Err(StoreError::VersionConflict(address.clone()));
        }
        entry.account = account;
        entry.version += 1;
        Ok(entry.version)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut accounts = self.accounts.lock().unwrap();

        // Validate every expectation before touching anything
        for op in batch.ops() {
            match op {
                WriteOp::Create { address, .. } => {
                    if accounts.contains_key(address) {
                        return Err(StoreError::AlreadyExists(address.clone()));
                    }
                }
                WriteOp::Update {
                    address, expected, ..
                } => {
                    let entry = accounts
                        .get(address)
                        .ok_or_else(|| StoreError::NotFound(address.clone()))?;
                    if entry.version != *expected {
                        return Err(StoreError::VersionConflict(address.clone()));
                    }
                }
            }
        }

        for op in batch.ops() {
            match op {
                WriteOp::Create { address, account } => {
                    accounts.insert(
                        address.clone(),
                        Entry {
                            account: account.clone(),
                            version: 1,
                        },
                    );
                }
                WriteOp::Update {
                    address, account, ..
                } => {
                    let entry = accounts.get_mut(address).unwrap();
                    entry.account = account.clone();
                    entry.version += 1;
                }
            }
        }

        Ok(())
    }
}
