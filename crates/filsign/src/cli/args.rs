//! # CLI Argument Definitions
//!
//! The command-line surface, built with clap derive macros.
//!
//! ## Main CLI Structure
//!
//! - `filsign wallet new|list|export|import|balance|delete` - Key management
//! - `filsign send --from <ADDR> <TO> <AMOUNT>` - Transfer FIL
//! - `filsign batch <FILE>` - Run a JSON file of transfers in order
//! - `filsign mpool push --msg <HEX>` - Broadcast a message signed elsewhere
//! - `filsign withdraw <MINER> <AMOUNT>` - Withdraw miner balance to the owner
//! - `filsign market withdraw <ADDR> <AMOUNT>` - Withdraw storage market escrow
//! - `filsign actor set-owner|propose-change-worker|confirm-change-worker|info`
//! - `filsign config [path|init]` - Inspect or create `~/.filsign/config.toml`
//!
//! Every command that signs takes `--really-do-it`. Without it the command
//! prints what it would do and exits.
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use filsign_core::SignatureType;

/// Custodial Filecoin signing engine.
///
/// Keeps private keys in an encrypted local vault and signs, broadcasts and
/// confirms messages against a Lotus node.
#[derive(Debug, Parser)]
#[command(name = "filsign")]
#[command(author, version, about = "Custodial Filecoin signing engine")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    ///
    /// Overrides the `[logging] level` setting:
    /// - `-v` - Show info messages
    /// - `-vv` - Show debug messages
    /// - `-vvv` - Show trace messages
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// If not specified, filsign looks for `./configs/config.toml`,
    /// `./config.toml` and then `~/.filsign/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Key management
    ///
    /// Create, import, export, list and delete the keys held in the vault.
    Wallet {
        /// Wallet command to execute
        #[command(subcommand)]
        command: WalletCommands,
    },

    /// Send FIL from a vault address
    Send(SendArgs),

    /// Run a file of transfers in order
    ///
    /// The file is a JSON array of `{"from", "to", "amount"}` objects with
    /// amounts in FIL. The batch stops at the first failing transfer;
    /// transfers before it stay on chain.
    Batch(BatchArgs),

    /// Message pool commands
    Mpool {
        /// Mpool command to execute
        #[command(subcommand)]
        command: MpoolCommands,
    },

    /// Withdraw available miner balance to the owner
    Withdraw(WithdrawArgs),

    /// Storage market commands
    Market {
        /// Market command to execute
        #[command(subcommand)]
        command: MarketCommands,
    },

    /// Miner actor management
    ///
    /// Owner and worker changes, and a summary of a miner's addresses.
    Actor {
        /// Actor command to execute
        #[command(subcommand)]
        command: ActorCommands,
    },

    /// Show or create the per-user configuration file
    ///
    /// Works before a seed is configured. Secrets are redacted when shown.
    Config {
        /// Config action (shows the file when omitted)
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Actions for `config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,

    /// Write the annotated default configuration
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// wallet
// ============================================================================

/// Key management commands.
#[derive(Debug, Subcommand)]
pub enum WalletCommands {
    /// Generate a new key and print its address
    New {
        /// Key type
        #[arg(value_enum, default_value_t = KeyType::Secp256k1)]
        key_type: KeyType,
    },

    /// List vault addresses
    ///
    /// Balances and nonces are fetched from the node; a node error is shown
    /// per row instead of failing the listing.
    List {
        /// Also show key type, nonce and record timestamps
        #[arg(short, long)]
        details: bool,
    },

    /// Print a key in Lotus hex format
    ///
    /// The output is the private key. Treat it accordingly.
    Export {
        /// Address whose key to export
        address: String,
    },

    /// Import a key
    Import(ImportArgs),

    /// Show the balance of an address
    Balance {
        /// Address to query
        address: String,
    },

    /// Delete a key from the vault
    Delete {
        /// Address whose key to delete
        address: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Key algorithm for `wallet new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyType {
    /// secp256k1 (f1 addresses)
    Secp256k1,
    /// BLS12-381 (f3 addresses)
    Bls,
}

impl From<KeyType> for SignatureType {
    fn from(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Secp256k1 => Self::Secp256k1,
            KeyType::Bls => Self::Bls,
        }
    }
}

/// Arguments for `wallet import`.
#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// Input encoding
    #[arg(short, long, value_enum, default_value_t = ImportFormat::HexLotus)]
    pub format: ImportFormat,

    /// File holding the key, or `-` for stdin
    ///
    /// Reads stdin when omitted.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
}

/// Encodings accepted by `wallet import`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportFormat {
    /// Hex of the Lotus key JSON (`lotus wallet export` output)
    HexLotus,
    /// Lotus key JSON: `{"Type": "...", "PrivateKey": "<base64>"}`
    JsonLotus,
    /// GFC wallet JSON: `{"KeyInfo": [{"PrivateKey": "<base64>", "SigType": 1}]}`
    GfcJson,
}

// ============================================================================
// send / batch
// ============================================================================

/// Arguments for `send`.
#[derive(Debug, Clone, Args)]
pub struct SendArgs {
    /// Sending address; the vault must hold its key
    #[arg(long)]
    pub from: String,

    /// Recipient
    pub to: String,

    /// Amount in FIL
    pub amount: String,

    /// Sign and broadcast instead of printing what would be sent
    #[arg(long)]
    pub really_do_it: bool,
}

/// Arguments for `batch`.
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// JSON file of transfers
    pub file: PathBuf,

    /// Sign and broadcast instead of printing the plan
    #[arg(long)]
    pub really_do_it: bool,
}

// ============================================================================
// mpool
// ============================================================================

/// Message pool commands.
#[derive(Debug, Subcommand)]
pub enum MpoolCommands {
    /// Broadcast a signed message and print its CID
    Push {
        /// Hex of the signed message CBOR
        #[arg(long = "msg", value_name = "HEX")]
        message: String,
    },
}

// ============================================================================
// withdraw / market
// ============================================================================

/// Arguments for `withdraw`.
#[derive(Debug, Clone, Args)]
pub struct WithdrawArgs {
    /// Miner actor
    pub miner: String,

    /// Amount in FIL
    pub amount: String,

    /// Sign and broadcast instead of printing what would be withdrawn
    #[arg(long)]
    pub really_do_it: bool,
}

/// Storage market commands.
#[derive(Debug, Subcommand)]
pub enum MarketCommands {
    /// Withdraw unlocked escrow
    Withdraw {
        /// Escrow holder (ID or key address)
        address: String,

        /// Amount in FIL
        amount: String,

        /// Sign and broadcast instead of printing what would be withdrawn
        #[arg(long)]
        really_do_it: bool,
    },
}

// ============================================================================
// actor
// ============================================================================

/// Miner actor commands.
#[derive(Debug, Subcommand)]
pub enum ActorCommands {
    /// Propose or accept an owner change
    ///
    /// Run once from the current owner to propose, then from the new owner
    /// to accept.
    SetOwner {
        /// Miner actor
        miner: String,

        /// Proposed owner
        #[arg(long)]
        new_owner: String,

        /// Signing address: the current owner or the new owner
        #[arg(long)]
        from: String,

        /// Sign and broadcast
        #[arg(long)]
        really_do_it: bool,
    },

    /// Propose a new worker and control address set
    ///
    /// Omitted values keep the miner's current ones.
    ProposeChangeWorker {
        /// Miner actor
        miner: String,

        /// Proposed worker
        #[arg(long)]
        worker: Option<String>,

        /// Replacement control address; repeat for several
        #[arg(long = "control", value_name = "ADDR")]
        control: Vec<String>,

        /// Sign and broadcast
        #[arg(long)]
        really_do_it: bool,
    },

    /// Confirm a proposed worker change once its epoch is reached
    ConfirmChangeWorker {
        /// Miner actor
        miner: String,

        /// The proposed worker
        #[arg(long)]
        worker: String,

        /// Sign and broadcast
        #[arg(long)]
        really_do_it: bool,
    },

    /// Show owner, worker, control addresses and balances
    Info {
        /// Miner actor
        miner: String,
    },
}
