//! # CLI Module
//!
//! Command-line interface for filsign.
//!
//! ## Module Structure
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! ## Commands
//!
//! - `filsign wallet new [secp256k1|bls]` - Generate a key
//! - `filsign wallet list [--details]` - List vault addresses with balances
//! - `filsign wallet export <ADDR>` - Print a key in Lotus hex format
//! - `filsign wallet import [--format hex-lotus|json-lotus|gfc-json] [FILE|-]` - Import a key
//! - `filsign wallet balance <ADDR>` - Show an address balance
//! - `filsign wallet delete <ADDR> [--force]` - Delete a key
//! - `filsign send --from <ADDR> <TO> <AMOUNT>` - Transfer FIL
//! - `filsign batch <FILE>` - Run a file of transfers
//! - `filsign mpool push --msg <HEX>` - Broadcast a signed message
//! - `filsign withdraw <MINER> <AMOUNT>` - Withdraw miner balance
//! - `filsign market withdraw <ADDR> <AMOUNT>` - Withdraw market escrow
//! - `filsign actor set-owner <MINER> --new-owner <ADDR> --from <ADDR>` - Owner change
//! - `filsign actor propose-change-worker <MINER> [--worker <ADDR>] [--control <ADDR>...]`
//! - `filsign actor confirm-change-worker <MINER> --worker <ADDR>`
//! - `filsign actor info <MINER>` - Miner addresses and balances
//! - `filsign config [path|init [--force]]` - Show, locate or create the config file
//!
//! Signing commands only act with `--really-do-it`.

pub mod args;
pub mod commands;

// Re-export main types for convenience
pub use args::{
    ActorCommands, BatchArgs, Cli, Commands, ConfigAction, ImportArgs, ImportFormat, KeyType,
    MarketCommands, MpoolCommands, SendArgs, WalletCommands, WithdrawArgs,
};
