//! Quorum Vault CLI
//!
//! A command-line interface for managing multisig wallets, quorum-gated
//! transfers and two-party swaps over a JSON-persisted account store.

use clap::{Parser, Subcommand};
use quorum_vault::cli::{self, AppState};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vault")]
#[command(version = "0.1.0")]
#[command(about = "Multisig custodial vault with quorum-gated transfers", long_about = None)]
struct Cli {
    /// Data directory for the account store
    #[arg(short, long, default_value = ".vault_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new account store
    Init,

    /// Identity operations
    Identity {
        #[command(subcommand)]
        action: IdentityCommands,
    },

    /// Credit an account (out-of-band funding channel)
    Fund {
        /// Account address to credit
        #[arg(short, long)]
        address: String,

        /// Amount to deposit
        #[arg(long)]
        amount: u64,
    },

    /// Show an account's balance
    Balance {
        /// Account address
        #[arg(short, long)]
        address: String,
    },

    /// Multisig wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Transfer proposal operations
    Tx {
        #[command(subcommand)]
        action: TxCommands,
    },

    /// Two-party swap operations
    Swap {
        #[command(subcommand)]
        action: SwapCommands,
    },

    /// Preview derived entity addresses
    Derive {
        #[command(subcommand)]
        action: DeriveCommands,
    },
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Generate a fresh identity address
    New,
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a multisig wallet
    Init {
        /// Creator identity (determines the wallet address)
        #[arg(short, long)]
        creator: String,

        /// Authorized signers (comma-separated addresses)
        #[arg(short, long)]
        signers: String,

        /// Approvals required before execution
        #[arg(short, long)]
        quorum: u8,

        /// Optional label for the wallet
        #[arg(short, long)]
        label: Option<String>,
    },

    /// Show a wallet's signers, quorum and balance
    Show {
        /// Wallet address
        #[arg(short, long)]
        address: String,
    },
}

#[derive(Subcommand)]
enum TxCommands {
    /// Propose a transfer out of a wallet
    Propose {
        /// Proposing signer identity
        #[arg(long)]
        signer: String,

        /// Wallet address to spend from
        #[arg(short, long)]
        wallet: String,

        /// Destination identity
        #[arg(long)]
        to: String,

        /// Amount to transfer
        #[arg(short, long)]
        amount: u64,
    },

    /// Approve a pending transaction
    Approve {
        /// Approving signer identity
        #[arg(long)]
        signer: String,

        /// Transaction address
        #[arg(short, long)]
        transaction: String,
    },

    /// Execute a transaction that has reached quorum
    Execute {
        /// Caller identity (any party may execute)
        #[arg(long)]
        caller: String,

        /// Transaction address
        #[arg(short, long)]
        transaction: String,
    },

    /// Show a transaction's state
    Show {
        /// Transaction address
        #[arg(short, long)]
        transaction: String,
    },
}

#[derive(Subcommand)]
enum SwapCommands {
    /// Propose a swap with a named accepter
    Propose {
        /// Proposing identity
        #[arg(long)]
        proposer: String,

        /// Identity that must accept the swap
        #[arg(long)]
        accepter: String,

        /// Amount the proposer's treasury gives up
        #[arg(long)]
        offer: u64,

        /// Amount the accepter's treasury gives up
        #[arg(long)]
        ask: u64,
    },

    /// Accept a proposed swap
    Accept {
        /// Accepting identity (must be the named accepter)
        #[arg(long)]
        accepter: String,

        /// Swap address
        #[arg(short, long)]
        swap: String,
    },

    /// Execute an accepted swap
    Execute {
        /// Caller identity
        #[arg(long)]
        caller: String,

        /// Swap address
        #[arg(short, long)]
        swap: String,
    },

    /// Move funds from an identity's account into their treasury
    Fund {
        /// Identity whose treasury to fund
        #[arg(long)]
        owner: String,

        /// Amount to move
        #[arg(long)]
        amount: u64,
    },

    /// Show a swap's state
    Show {
        /// Swap address
        #[arg(short, long)]
        swap: String,
    },
}

#[derive(Subcommand)]
enum DeriveCommands {
    /// Wallet address for a creator identity
    Wallet {
        #[arg(short, long)]
        creator: String,
    },

    /// Transaction address for a (wallet, proposer) pair
    Transaction {
        #[arg(short, long)]
        wallet: String,

        #[arg(short, long)]
        proposer: String,
    },

    /// Swap address for a (proposer, accepter) pair
    Swap {
        #[arg(long)]
        proposer: String,

        #[arg(long)]
        accepter: String,
    },

    /// Treasury address for an owner identity
    Treasury {
        #[arg(short, long)]
        owner: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that do not need loaded state
    match &cli.command {
        Commands::Init => return cli::cmd_init(&cli.data_dir),
        Commands::Derive { action } => {
            return match action {
                DeriveCommands::Wallet { creator } => {
                    cli::cmd_derive("wallet", &[creator.as_str()])
                }
                DeriveCommands::Transaction { wallet, proposer } => {
                    cli::cmd_derive("transaction", &[wallet.as_str(), proposer.as_str()])
                }
                DeriveCommands::Swap { proposer, accepter } => {
                    cli::cmd_derive("swap", &[proposer.as_str(), accepter.as_str()])
                }
                DeriveCommands::Treasury { owner } => {
                    cli::cmd_derive("treasury", &[owner.as_str()])
                }
            }
        }
        _ => {}
    }

    let mut state = AppState::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init | Commands::Derive { .. } => unreachable!(),
        Commands::Identity { action } => match action {
            IdentityCommands::New => cli::cmd_identity_new(&state),
        },
        Commands::Fund { address, amount } => cli::cmd_fund(&mut state, &address, amount),
        Commands::Balance { address } => cli::cmd_balance(&state, &address),
        Commands::Wallet { action } => match action {
            WalletCommands::Init {
                creator,
                signers,
                quorum,
                label,
            } => cli::cmd_wallet_init(&mut state, &creator, &signers, quorum, label),
            WalletCommands::Show { address } => cli::cmd_wallet_show(&state, &address),
        },
        Commands::Tx { action } => match action {
            TxCommands::Propose {
                signer,
                wallet,
                to,
                amount,
            } => cli::cmd_tx_propose(&mut state, &signer, &wallet, &to, amount),
            TxCommands::Approve {
                signer,
                transaction,
            } => cli::cmd_tx_approve(&mut state, &signer, &transaction),
            TxCommands::Execute {
                caller,
                transaction,
            } => cli::cmd_tx_execute(&mut state, &caller, &transaction),
            TxCommands::Show { transaction } => cli::cmd_tx_show(&state, &transaction),
        },
        Commands::Swap { action } => match action {
            SwapCommands::Propose {
                proposer,
                accepter,
                offer,
                ask,
            } => cli::cmd_swap_propose(&mut state, &proposer, &accepter, offer, ask),
            SwapCommands::Accept { accepter, swap } => {
                cli::cmd_swap_accept(&mut state, &accepter, &swap)
            }
            SwapCommands::Execute { caller, swap } => {
                cli::cmd_swap_execute(&mut state, &caller, &swap)
            }
            SwapCommands::Fund { owner, amount } => cli::cmd_swap_fund(&mut state, &owner, amount),
            SwapCommands::Show { swap } => cli::cmd_swap_show(&state, &swap),
        },
    }
}
