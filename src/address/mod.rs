//! Deterministic addressing for vault entities
//!
//! Every record in the account store is keyed by an `Address`. Identity
//! addresses come from outside the system; entity addresses (wallets,
//! transactions, swaps, treasuries) are derived from a domain tag plus the
//! identities that define them, so the same inputs always land on the same
//! account.

pub mod derive;

pub use derive::{
    derive, swap_address, transaction_address, treasury_address, wallet_address, Address,
    AddressError, SWAP_DOMAIN, TRANSACTION_DOMAIN, TREASURY_DOMAIN, WALLET_DOMAIN,
};
