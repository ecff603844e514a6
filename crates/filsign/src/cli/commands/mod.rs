//! # CLI Command Implementations
//!
//! One handler per subcommand. Handlers that talk to the node are async
//! and are driven by the runtime in `main`.
//!
//! ## Available Commands
//!
//! - [`wallet`] - `wallet new|list|export|import|balance|delete`
//! - [`execute`] - Every single-message signing command (`send`,
//!   `withdraw`, `market withdraw`, `actor set-owner|propose-change-worker|confirm-change-worker`)
//!   and `mpool push`
//! - [`batch`] - `batch`
//! - [`actor`] - `actor info`
//! - [`config`] - `config`, `config path`, `config init`
//!
//! [`CommandContext`] loads configuration once and opens the vault, node
//! client and audit log for the handlers.
//!
//! ## Exit Codes
//!
//! [`CommandError::exit_code`] maps a failure onto [`exit_codes`].

pub mod actor;
pub mod batch;
pub mod config;
pub mod context;
pub mod execute;
pub mod exit_codes;
pub mod wallet;

use std::io::{self, Write};

use filsign_core::error::{
    ConfigError, ExecutionError, GatewayError, SignError, StoreError, ValidationError,
};

use crate::audit::AuditError;

pub use actor::ActorInfoCommand;
pub use batch::BatchCommand;
pub use config::ConfigCommand;
pub use context::{CommandContext, NodeClient};
pub use execute::ExecuteCommand;
pub use exit_codes::{EXIT_ERROR, EXIT_REFUSED, EXIT_SUCCESS};
pub use wallet::{
    BalanceCommand, DeleteCommand, ExportCommand, ImportCommand, ListCommand, NewCommand,
};

// ============================================================================
// CommandError
// ============================================================================

/// Errors a CLI command can end with.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The key vault failed.
    #[error("Vault error: {0}")]
    Store(#[from] StoreError),

    /// A node query failed.
    #[error("Node error: {0}")]
    Gateway(#[from] GatewayError),

    /// Key material was unusable.
    #[error("Key error: {0}")]
    Sign(#[from] SignError),

    /// An address or amount argument was malformed.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The audit log could not be opened.
    #[error("Audit log error: {0}")]
    Audit(#[from] AuditError),

    /// An executor operation failed.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON input or output could not be processed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input that is not an address or amount was malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CommandError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution(err) if err.is_refusal() => EXIT_REFUSED,
            _ => EXIT_ERROR,
        }
    }
}

/// Writes `rows` under `headers` with left-aligned, space-padded columns.
///
/// The last column is not padded.
pub(crate) fn write_table(
    out: &mut impl Write,
    headers: &[&str],
    rows: &[Vec<String>],
) -> io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_cells: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for row in std::iter::once(&header_cells).chain(rows) {
        let last = row.len().saturating_sub(1);
        let mut line = String::new();
        for (i, (cell, width)) in row.iter().zip(&widths).enumerate() {
            if i == last {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<width$}  "));
            }
        }
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}
