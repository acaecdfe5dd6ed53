//! Quorum Vault: multisig custodial wallets with quorum-gated transfers
//!
//! This crate provides a deterministic state-transition engine for shared
//! custodial accounts:
//! - Deterministic, domain-separated address derivation
//! - Multisig wallets with a fixed signer set and quorum threshold
//! - Propose / approve / execute transfer lifecycle, quorum checked once at
//!   execution time
//! - Versioned account store with optimistic-concurrency updates and atomic
//!   multi-record commits
//! - Two-party treasury swaps
//! - JSON persistence with atomic saves and rotating backups
//!
//! # Example
//!
//! ```rust
//! use quorum_vault::address::Address;
//! use quorum_vault::store::MemoryStore;
//! use quorum_vault::wallet::WalletEngine;
//!
//! let store = MemoryStore::new();
//! let engine = WalletEngine::new(&store);
//!
//! // Three signers, two approvals required
//! let signers: Vec<Address> = (0..3).map(|_| Address::generate()).collect();
//! let wallet = engine
//!     .initialize_wallet(&signers[0], signers.clone(), 2, None)
//!     .unwrap();
//! store.deposit(&wallet, 10_000);
//!
//! // Propose, collect approvals, execute
//! let destination = Address::generate();
//! let tx = engine
//!     .propose_transaction(&signers[0], &wallet, &destination, 1_000)
//!     .unwrap();
//! engine.approve_transaction(&signers[0], &tx).unwrap();
//! engine.approve_transaction(&signers[1], &tx).unwrap();
//! engine.execute_transaction(&signers[2], &tx).unwrap();
//!
//! assert_eq!(engine.balance(&destination), 1_000);
//! ```

pub mod address;
pub mod cli;
pub mod store;
pub mod swap;
pub mod wallet;

// Re-export commonly used types
pub use address::{derive, Address, AddressError};
pub use store::{Account, AccountStore, MemoryStore, StoreError, Vault, Versioned, WriteBatch};
pub use swap::{Swap, SwapEngine, SwapError, Treasury};
pub use wallet::{ExecutionReceipt, TransferProposal, Wallet, WalletEngine, WalletError};
