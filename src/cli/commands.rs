//! CLI command handlers
//!
//! Each handler runs one engine operation against the persisted store and
//! saves the result. Addresses arrive as Base58Check strings and are parsed
//! before anything touches the store.

use crate::address::{
    swap_address, transaction_address, treasury_address, wallet_address, Address,
};
use crate::store::{MemoryStore, Vault, VaultConfig};
use crate::swap::SwapEngine;
use crate::wallet::WalletEngine;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub store: MemoryStore,
    pub vault: Vault,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the store from the data directory, creating it on first run
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let config = VaultConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        };
        let vault = Vault::new(config)?;

        let store = if vault.exists() {
            vault.load()?
        } else {
            println!("🆕 Creating new account store...");
            let store = MemoryStore::new();
            vault.save(&store)?;
            store
        };

        Ok(Self {
            store,
            vault,
            data_dir,
        })
    }

    /// Save the current store state
    pub fn save(&self) -> CliResult<()> {
        self.vault.save(&self.store)?;
        Ok(())
    }
}

fn parse_address(s: &str) -> CliResult<Address> {
    Ok(Address::from_str(s)?)
}

fn parse_addresses(list: &str) -> CliResult<Vec<Address>> {
    list.split(',')
        .map(|s| parse_address(s.trim()))
        .collect()
}

/// Initialize a fresh account store
pub fn cmd_init(data_dir: &Path) -> CliResult<()> {
    let config = VaultConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    let vault = Vault::new(config)?;

    if vault.exists() {
        println!("⚠️  Account store already exists at {:?}", data_dir);
        return Ok(());
    }

    vault.save(&MemoryStore::new())?;

    println!("✅ Account store initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    Ok(())
}

/// Generate a fresh identity address
pub fn cmd_identity_new(_state: &AppState) -> CliResult<()> {
    let identity = Address::generate();
    println!("🆔 New identity: {}", identity);
    Ok(())
}

/// Credit an account through the out-of-band funding channel
pub fn cmd_fund(state: &mut AppState, address: &str, amount: u64) -> CliResult<()> {
    let address = parse_address(address)?;
    state.store.deposit(&address, amount);
    state.save()?;

    println!("💰 Deposited {} to {}", amount, address);
    println!("   New balance: {}", state.store.balance(&address));
    Ok(())
}

/// Show an account's balance
pub fn cmd_balance(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    println!("💳 Balance of {}: {}", address, state.store.balance(&address));
    Ok(())
}

/// Create a multisig wallet
pub fn cmd_wallet_init(
    state: &mut AppState,
    creator: &str,
    signers: &str,
    quorum: u8,
    label: Option<String>,
) -> CliResult<()> {
    let creator = parse_address(creator)?;
    let signers = parse_addresses(signers)?;

    let engine = WalletEngine::new(&state.store);
    let address = engine.initialize_wallet(&creator, signers, quorum, label)?;
    state.save()?;

    let wallet = engine.wallet(&address)?;
    println!("✅ Wallet created!");
    println!("   📍 Address: {}", address);
    println!("   🔐 Policy: {}", wallet.description());
    Ok(())
}

/// Show a wallet's signer set, quorum and balance
pub fn cmd_wallet_show(state: &AppState, address: &str) -> CliResult<()> {
    let address = parse_address(address)?;
    let engine = WalletEngine::new(&state.store);
    let wallet = engine.wallet(&address)?;

    println!("🔐 Wallet {}", address);
    if let Some(label) = &wallet.label {
        println!("   Label: {}", label);
    }
    println!("   Policy: {}", wallet.description());
    println!("   Balance: {}", engine.balance(&address));
    println!("   Signers:");
    for signer in &wallet.signers {
        println!("   ├─ {}", signer);
    }
    Ok(())
}

/// Propose a transfer out of a wallet
pub fn cmd_tx_propose(
    state: &mut AppState,
    caller: &str,
    wallet: &str,
    destination: &str,
    amount: u64,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let wallet = parse_address(wallet)?;
    let destination = parse_address(destination)?;

    let engine = WalletEngine::new(&state.store);
    let address = engine.propose_transaction(&caller, &wallet, &destination, amount)?;
    state.save()?;

    println!("📝 Transaction proposed!");
    println!("   📍 Address: {}", address);
    println!("   💸 {} -> {}", amount, destination);
    Ok(())
}

/// Approve a pending transaction
pub fn cmd_tx_approve(state: &mut AppState, caller: &str, transaction: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let transaction = parse_address(transaction)?;

    let engine = WalletEngine::new(&state.store);
    let proposal = engine.approve_transaction(&caller, &transaction)?;
    let wallet = engine.wallet(&proposal.wallet)?;
    state.save()?;

    println!(
        "✍️  Approved: {}/{} signatures collected",
        proposal.approval_count(),
        wallet.quorum
    );
    Ok(())
}

/// Execute a transaction that has reached quorum
pub fn cmd_tx_execute(state: &mut AppState, caller: &str, transaction: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let transaction = parse_address(transaction)?;

    let engine = WalletEngine::new(&state.store);
    let receipt = engine.execute_transaction(&caller, &transaction)?;
    state.save()?;

    println!("✅ Transaction executed!");
    println!("   💸 {} moved from {} to {}", receipt.amount, receipt.wallet, receipt.destination);
    println!("   ✍️  Authorized by {} approvals", receipt.approvals);
    Ok(())
}

/// Show a transaction's state
pub fn cmd_tx_show(state: &AppState, transaction: &str) -> CliResult<()> {
    let transaction = parse_address(transaction)?;
    let engine = WalletEngine::new(&state.store);
    let proposal = engine.proposal(&transaction)?;
    let wallet = engine.wallet(&proposal.wallet)?;

    println!("📄 Transaction {}", transaction);
    println!("   Wallet: {}", proposal.wallet);
    println!("   Destination: {}", proposal.destination);
    println!("   Amount: {}", proposal.amount);
    println!(
        "   Approvals: {}/{}{}",
        proposal.approval_count(),
        wallet.quorum,
        if proposal.has_quorum(&wallet) {
            " (quorum met)"
        } else {
            ""
        }
    );
    println!("   Executed: {}", proposal.executed);
    for approver in &proposal.approvals {
        println!("   ├─ approved by {}", approver);
    }
    Ok(())
}

/// Propose a two-party swap
pub fn cmd_swap_propose(
    state: &mut AppState,
    caller: &str,
    accepter: &str,
    offer: u64,
    ask: u64,
) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let accepter = parse_address(accepter)?;

    let engine = SwapEngine::new(&state.store);
    let address = engine.propose_swap(&caller, &accepter, offer, ask)?;
    state.save()?;

    println!("🔄 Swap proposed!");
    println!("   📍 Address: {}", address);
    println!("   Offering {} for {}", offer, ask);
    Ok(())
}

/// Accept a proposed swap
pub fn cmd_swap_accept(state: &mut AppState, caller: &str, swap: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let swap = parse_address(swap)?;

    let engine = SwapEngine::new(&state.store);
    engine.accept_swap(&caller, &swap)?;
    state.save()?;

    println!("🤝 Swap accepted by {}", caller);
    Ok(())
}

/// Execute an accepted swap
pub fn cmd_swap_execute(state: &mut AppState, caller: &str, swap: &str) -> CliResult<()> {
    let caller = parse_address(caller)?;
    let swap = parse_address(swap)?;

    let engine = SwapEngine::new(&state.store);
    let executed = engine.execute_swap(&caller, &swap)?;
    state.save()?;

    println!("✅ Swap executed!");
    println!(
        "   {} gave {}, {} gave {}",
        executed.proposer, executed.proposer_amount, executed.accepter, executed.accepter_amount
    );
    Ok(())
}

/// Fund the caller's treasury from their plain account
pub fn cmd_swap_fund(state: &mut AppState, caller: &str, amount: u64) -> CliResult<()> {
    let caller = parse_address(caller)?;

    let engine = SwapEngine::new(&state.store);
    let treasury = engine.fund_treasury(&caller, amount)?;
    state.save()?;

    println!("💰 Treasury {} funded with {}", treasury, amount);
    println!("   Treasury balance: {}", engine.treasury_balance(&caller));
    Ok(())
}

/// Show a swap's state
pub fn cmd_swap_show(state: &AppState, swap: &str) -> CliResult<()> {
    let swap = parse_address(swap)?;
    let engine = SwapEngine::new(&state.store);
    let agreement = engine.swap(&swap)?;

    println!("🔄 Swap {}", swap);
    println!("   Proposer: {} (gives {})", agreement.proposer, agreement.proposer_amount);
    println!("   Accepter: {} (gives {})", agreement.accepter, agreement.accepter_amount);
    println!("   Accepted: {}", agreement.accepted);
    println!("   Executed: {}", agreement.executed);
    Ok(())
}

/// Preview the derived address for an entity without creating it
pub fn cmd_derive(kind: &str, fields: &[&str]) -> CliResult<()> {
    let parsed: Vec<Address> = fields
        .iter()
        .map(|s| parse_address(s))
        .collect::<CliResult<_>>()?;

    let address = match (kind, parsed.as_slice()) {
        ("wallet", [creator]) => wallet_address(creator),
        ("transaction", [wallet, proposer]) => transaction_address(wallet, proposer),
        ("swap", [proposer, accepter]) => swap_address(proposer, accepter),
        ("treasury", [owner]) => treasury_address(owner),
        _ => {
            return Err(format!(
                "unknown derivation: {} with {} field(s)",
                kind,
                parsed.len()
            )
            .into())
        }
    };

    println!("📍 Derived {} address: {}", kind, address);
    Ok(())
}
