//! # Wallet Commands
//!
//! Key management against the vault.
//!
//! ## Available Commands
//!
//! - [`NewCommand`] - Generate a key and print its address
//! - [`ListCommand`] - List vault addresses with balance and nonce
//! - [`ExportCommand`] - Print a key as hex of its Lotus JSON
//! - [`ImportCommand`] - Import a key in one of the [`ImportFormat`]s
//! - [`BalanceCommand`] - Query the balance of any address
//! - [`DeleteCommand`] - Remove a key, after confirmation
//!
//! Every handler has a `run` taking a [`CommandContext`] and a `run_with`
//! taking the vault and node directly, which the tests use.
//!
//! ## Security
//!
//! Key creation, import, export and deletion are logged as security events.
//! Key material itself is never logged.

pub mod import;

use std::io::{self, BufRead, Write};

use filsign_chain::{Address, TokenAmount};
use filsign_core::error::GatewayError;
use filsign_core::SignatureType;
use filsign_crypto::{generate_key, KeyVault};
use zeroize::Zeroizing;

use super::{write_table, CommandContext, CommandError};
use crate::executor::request::parse_address;
use crate::gateway::NodeGateway;
use crate::logging::log_security_event;

pub use crate::cli::args::ImportFormat;
pub use import::{parse_key, ImportCommand};

// ============================================================================
// wallet new
// ============================================================================

/// `filsign wallet new`.
#[derive(Debug, Clone, Copy)]
pub struct NewCommand {
    sig_type: SignatureType,
}

impl NewCommand {
    /// Create a new command for a key of type `sig_type`.
    #[must_use]
    pub const fn new(sig_type: SignatureType) -> Self {
        Self { sig_type }
    }

    /// Generate and store the key, printing its address.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be opened or written.
    pub fn run(&self, ctx: &CommandContext) -> Result<Address, CommandError> {
        let vault = ctx.open_vault()?;
        self.run_with(&vault, &mut io::stdout().lock())
    }

    /// [`run`](Self::run) against an open vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault write or the output fails.
    pub fn run_with(
        &self,
        vault: &impl KeyVault,
        out: &mut impl Write,
    ) -> Result<Address, CommandError> {
        let (key_info, address) = generate_key(self.sig_type);
        vault.save(&address, &key_info)?;

        log_security_event(
            "key_created",
            &format!("address={address} type={}", self.sig_type),
        );
        writeln!(out, "{address}")?;
        Ok(address)
    }
}

// ============================================================================
// wallet list
// ============================================================================

/// `filsign wallet list`.
#[derive(Debug, Clone, Copy)]
pub struct ListCommand {
    details: bool,
}

impl ListCommand {
    /// Create a new list command.
    #[must_use]
    pub const fn new(details: bool) -> Self {
        Self { details }
    }

    /// Print every vault address with its on-chain balance and nonce.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be read. Node failures are
    /// reported per row.
    pub async fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let vault = ctx.open_vault()?;
        let node = ctx.node()?;
        self.run_with(&vault, &node, &mut io::stdout().lock()).await
    }

    /// [`run`](Self::run) against an open vault and node.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be read or the output fails.
    pub async fn run_with<V: KeyVault, G: NodeGateway>(
        &self,
        vault: &V,
        node: &G,
        out: &mut impl Write,
    ) -> Result<(), CommandError> {
        let keys = vault.list_all()?;

        let mut rows = Vec::with_capacity(keys.len());
        for key in &keys {
            let (balance, nonce, error) = match node.state_get_actor(&key.address).await {
                Ok(actor) => (actor.balance.to_string(), actor.nonce.to_string(), String::new()),
                // never funded: the address exists only as a key so far
                Err(err) if is_actor_not_found(&err) => {
                    (TokenAmount::zero().to_string(), "0".to_string(), String::new())
                }
                Err(err) => {
                    tracing::warn!(address = %key.address, error = %err, "actor lookup failed");
                    (String::new(), String::new(), err.to_string())
                }
            };

            let mut row = vec![key.address.to_string(), balance, nonce];
            if self.details {
                row.push(key.key_info.key_type().to_string());
                row.push(key.created_at.format("%Y-%m-%d %H:%M:%S").to_string());
            }
            row.push(error);
            rows.push(row);
        }

        let headers: &[&str] = if self.details {
            &["Address", "Balance", "Nonce", "Type", "Created", "Error"]
        } else {
            &["Address", "Balance", "Nonce", "Error"]
        };
        write_table(out, headers, &rows)?;
        Ok(())
    }
}

fn is_actor_not_found(err: &GatewayError) -> bool {
    matches!(err, GatewayError::Rpc { message, .. } if message.contains("actor not found"))
}

// ============================================================================
// wallet export
// ============================================================================

/// `filsign wallet export`.
#[derive(Debug, Clone)]
pub struct ExportCommand {
    address: String,
}

impl ExportCommand {
    /// Create a new export command.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Print the key as hex of its Lotus JSON.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed address or a key that is not in
    /// the vault.
    pub fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let vault = ctx.open_vault()?;
        self.run_with(&vault, &mut io::stdout().lock())
    }

    /// [`run`](Self::run) against an open vault.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with(&self, vault: &impl KeyVault, out: &mut impl Write) -> Result<(), CommandError> {
        let address = parse_address(&self.address)?;
        let key_info = vault.get(&address)?;

        let json = key_info.to_json()?;
        let encoded = Zeroizing::new(hex::encode(json.as_slice()));

        log_security_event("key_exported", &format!("address={address}"));
        writeln!(out, "{}", encoded.as_str())?;
        Ok(())
    }
}

// ============================================================================
// wallet balance
// ============================================================================

/// `filsign wallet balance`.
#[derive(Debug, Clone)]
pub struct BalanceCommand {
    address: String,
}

impl BalanceCommand {
    /// Create a new balance command.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// Print the balance of the address. The vault is not opened.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed address or a failed node query.
    pub async fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let node = ctx.node()?;
        self.run_with(&node, &mut io::stdout().lock()).await
    }

    /// [`run`](Self::run) against a node.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with(
        &self,
        node: &impl NodeGateway,
        out: &mut impl Write,
    ) -> Result<(), CommandError> {
        let address = parse_address(&self.address)?;
        let balance = node.wallet_balance(&address).await?;
        writeln!(out, "Address: {address}")?;
        writeln!(out, "Balance: {balance}")?;
        Ok(())
    }
}

// ============================================================================
// wallet delete
// ============================================================================

/// `filsign wallet delete`.
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    address: String,
    force: bool,
}

impl DeleteCommand {
    /// Create a new delete command. Without `force` the user must type
    /// `yes` to proceed.
    #[must_use]
    pub fn new(address: impl Into<String>, force: bool) -> Self {
        Self {
            address: address.into(),
            force,
        }
    }

    /// Delete the key, prompting on the terminal unless forced.
    ///
    /// Returns `false` if the user declined.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed address or a key that is not in
    /// the vault.
    pub fn run(&self, ctx: &CommandContext) -> Result<bool, CommandError> {
        let vault = ctx.open_vault()?;
        self.run_with(&vault, &mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// [`run`](Self::run) against an open vault, reading the confirmation
    /// from `input`.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with(
        &self,
        vault: &impl KeyVault,
        input: &mut impl BufRead,
        out: &mut impl Write,
    ) -> Result<bool, CommandError> {
        let address = parse_address(&self.address)?;
        if !vault.has(&address) {
            return Err(filsign_core::StoreError::key_not_found(address.to_string()).into());
        }

        if !self.force {
            writeln!(
                out,
                "Delete the key for {address}? This cannot be undone without a backup."
            )?;
            write!(out, "Type 'yes' to confirm: ")?;
            out.flush()?;

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            if answer.trim() != "yes" {
                writeln!(out, "Cancelled")?;
                return Ok(false);
            }
        }

        vault.delete(&address)?;
        log_security_event("key_deleted", &format!("address={address}"));
        writeln!(out, "Deleted key {address}")?;
        Ok(true)
    }
}
