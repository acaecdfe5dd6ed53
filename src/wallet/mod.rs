//! Multisig wallet module
//!
//! Wallets hold a fixed signer set and quorum threshold; transfers out of a
//! wallet go through propose, approve and execute, with quorum enforced once
//! at execution time.

pub mod engine;
mod executor;
pub mod transaction;
pub mod wallet;

pub use engine::{ExecutionReceipt, WalletEngine};
pub use transaction::TransferProposal;
pub use wallet::{Wallet, WalletError, MAX_SIGNERS};
