//! Address type and domain-separated derivation
//!
//! Addresses are Base58Check strings: a version byte, a 20-byte
//! RIPEMD160(SHA256(...)) digest, and a 4-byte double-SHA256 checksum.
//! Identity addresses use version `0x00` (rendered starting with '1');
//! derived entity addresses use version `0x05` (rendered starting with '3'),
//! so the two kinds are distinguishable at a glance.

use rand::RngCore;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Domain tag for wallet accounts, derived from the creator identity.
pub const WALLET_DOMAIN: &str = "wallet";
/// Domain tag for transfer proposals, derived from (wallet, proposer).
pub const TRANSACTION_DOMAIN: &str = "transaction";
/// Domain tag for swap agreements, derived from (proposer, accepter).
pub const SWAP_DOMAIN: &str = "swap";
/// Domain tag for treasury accounts, derived from the owner identity.
pub const TREASURY_DOMAIN: &str = "treasury";

/// Version byte for externally supplied identities.
const IDENTITY_VERSION: u8 = 0x00;
/// Version byte for derived entity addresses (P2SH-style).
const DERIVED_VERSION: u8 = 0x05;

/// Errors raised when parsing an address from its string form
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("invalid base58 encoding")]
    InvalidEncoding,
    #[error("invalid address length: expected 25 bytes, got {0}")]
    InvalidLength(usize),
    #[error("checksum mismatch")]
    BadChecksum,
    #[error("unknown version byte: {0:#04x}")]
    UnknownVersion(u8),
}

/// An account address: the primary key of the account store
///
/// Used both for entity accounts (wallets, transactions, swaps, treasuries)
/// and for participant identities (signers, destinations).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Generate a fresh random identity address
    ///
    /// Identities normally arrive from the caller identity provider already
    /// verified; this is the local way to mint one for funding and testing.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::from_digest(IDENTITY_VERSION, &hash160(&seed))
    }

    /// Assemble an address from a version byte and a 20-byte digest
    fn from_digest(version: u8, digest: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(version);
        bytes.extend_from_slice(digest);
        let checksum = double_sha256(&bytes);
        bytes.extend_from_slice(&checksum[..4]);
        Address(bs58::encode(bytes).into_string())
    }

    /// The Base58Check string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::InvalidEncoding)?;
        if bytes.len() != 25 {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let (payload, checksum) = bytes.split_at(21);
        let expected = double_sha256(payload);
        if checksum != &expected[..4] {
            return Err(AddressError::BadChecksum);
        }
        match payload[0] {
            IDENTITY_VERSION | DERIVED_VERSION => Ok(Address(s.to_string())),
            other => Err(AddressError::UnknownVersion(other)),
        }
    }
}

/// Derive a deterministic entity address from a domain tag and its fields
///
/// Pure and collision-resistant across distinct `(domain, fields)` tuples:
/// the tag and every field feed the digest, and the tag keeps entity kinds
/// from ever colliding with each other. Identical inputs always yield the
/// identical address.
pub fn derive(domain: &str, fields: &[&Address]) -> Address {
    let mut preimage = String::from(domain);
    for field in fields {
        preimage.push(':');
        preimage.push_str(field.as_str());
    }
    Address::from_digest(DERIVED_VERSION, &hash160(preimage.as_bytes()))
}

/// Address of the wallet created by `creator`
pub fn wallet_address(creator: &Address) -> Address {
    derive(WALLET_DOMAIN, &[creator])
}

/// Address of the transfer proposal keyed by `(wallet, proposer)`
pub fn transaction_address(wallet: &Address, proposer: &Address) -> Address {
    derive(TRANSACTION_DOMAIN, &[wallet, proposer])
}

/// Address of the swap agreement keyed by `(proposer, accepter)`
pub fn swap_address(proposer: &Address, accepter: &Address) -> Address {
    derive(SWAP_DOMAIN, &[proposer, accepter])
}

/// Address of the treasury owned by `owner`
pub fn treasury_address(owner: &Address) -> Address {
    derive(TREASURY_DOMAIN, &[owner])
}

/// RIPEMD160 of SHA256, the 20-byte digest behind every address
fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha);
    ripemd.finalize().into()
}

/// Double SHA-256, used for the 4-byte checksum
fn double_sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(Sha256::digest(data)).into()
}
