//! Versioned account store
//!
//! The store is the sole shared mutable resource in the system: a mapping
//! from derived address to account record, with optimistic-concurrency
//! updates. Every record carries a version that bumps on each write; an
//! update supplying a stale version fails with `VersionConflict` rather than
//! silently overwriting, which is what lets two approvals land concurrently
//! without lost updates and two executes resolve to exactly one transfer.

pub mod account;
pub mod memory;
pub mod persistence;

pub use account::{Account, AccountData};
pub use memory::MemoryStore;
pub use persistence::{Vault, VaultConfig, VaultError};

use crate::address::Address;
use thiserror::Error;

/// Monotonic per-record version, bumped on every write
pub type Version = u64;

/// Store-level errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("account already exists at {0}")]
    AlreadyExists(Address),
    #[error("version conflict at {0}: record changed since it was read")]
    VersionConflict(Address),
    #[error("account not found: {0}")]
    NotFound(Address),
}

/// An account together with the version it was read at
#[derive(Clone, Debug)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

/// A single write in a batch
#[derive(Clone, Debug)]
pub enum WriteOp {
    /// Create a fresh record; fails the batch if the address is occupied
    Create { address: Address, account: Account },
    /// Replace a record; fails the batch on version mismatch
    Update {
        address: Address,
        expected: Version,
        account: Account,
    },
}

/// A set of writes applied all-or-nothing
///
/// Every expectation is validated before any write is applied, so a failed
/// batch leaves no partial state behind.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create of `account` at `address`
    pub fn create(mut self, address: Address, account: Account) -> Self {
        self.ops.push(WriteOp::Create { address, account });
        self
    }

    /// Queue a version-checked replacement of the record at `address`
    pub fn update(mut self, address: Address, expected: Version, account: Account) -> Self {
        self.ops.push(WriteOp::Update {
            address,
            expected,
            account,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The account store contract the engines run against
///
/// All methods are synchronous and atomic: a call either fully applies or
/// fails with a typed error, never half-applies. Conflict handling is the
/// caller's concern; the store never retries internally.
pub trait AccountStore {
    /// Fetch the record at `address` with its current version
    fn get(&self, address: &Address) -> Option<Versioned<Account>>;

    /// Create a fresh record, failing `AlreadyExists` if occupied
    fn create(&self, address: &Address, account: Account) -> Result<Version, StoreError>;

    /// Replace the record at `address` if its version still matches
    fn update(
        &self,
        address: &Address,
        expected: Version,
        account: Account,
    ) -> Result<Version, StoreError>;

    /// Apply a multi-record batch atomically: all writes or none
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

// Engines borrow a shared store, so a reference is itself a store.
impl<S: AccountStore + ?Sized> AccountStore for &S {
    fn get(&self, address: &Address) -> Option<Versioned<Account>> {
        (**self).get(address)
    }

    fn create(&self, address: &Address, account: Account) -> Result<Version, StoreError> {
        (**self).create(address, account)
    }

    fn update(
        &self,
        address: &Address,
        expected: Version,
        account: Account,
    ) -> Result<Version, StoreError> {
        (**self).update(address, expected, account)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}
