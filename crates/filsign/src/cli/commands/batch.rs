//! # Batch Transfer Command
//!
//! `filsign batch <FILE>` reads a JSON array of transfers:
//!
//! ```json
//! [
//!   {"from": "f1...", "to": "f01001", "amount": "1.5"},
//!   {"from": "f1...", "to": "f01002", "amount": "0.25"}
//! ]
//! ```
//!
//! Transfers run one after another and each is printed as soon as it is
//! confirmed. The first failure stops the batch; the error names its
//! 1-based position and everything printed before it is already on chain.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use filsign_crypto::KeyVault;

use super::execute::write_batch_item;
use super::{write_table, CommandContext, CommandError};
use crate::executor::{BatchTransferRequest, ExecutionReceipt, Executor, TransferRequest};
use crate::gateway::NodeGateway;

/// `filsign batch`.
#[derive(Debug, Clone)]
pub struct BatchCommand {
    file: PathBuf,
    really_do_it: bool,
}

impl BatchCommand {
    /// Create a new batch command.
    #[must_use]
    pub const fn new(file: PathBuf, really_do_it: bool) -> Self {
        Self { file, really_do_it }
    }

    /// Run the batch, or print the plan without `--really-do-it`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the executor cannot be
    /// built, or a transfer fails.
    pub async fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let request = load_batch(&self.file)?;
        let mut out = io::stdout();
        if !self.really_do_it {
            return write_plan(&mut out, &request);
        }
        let executor = ctx.executor()?;
        self.run_with(&executor, &request, &mut out).await.map(|_| ())
    }

    /// [`run`](Self::run) with the batch already loaded.
    ///
    /// Returns the confirmed receipts, empty for a preview.
    ///
    /// # Errors
    ///
    /// Returns an error if a transfer fails or the output cannot be
    /// written.
    pub async fn run_with<G: NodeGateway, V: KeyVault, W: Write + Send>(
        &self,
        executor: &Executor<G, V>,
        request: &BatchTransferRequest,
        out: &mut W,
    ) -> Result<Vec<ExecutionReceipt>, CommandError> {
        if !self.really_do_it {
            write_plan(out, request)?;
            return Ok(Vec::new());
        }

        let mut write_error = None;
        let result = executor
            .batch_transfer(request, |index, receipt| {
                if write_error.is_none() {
                    write_error = write_batch_item(out, index, receipt).err();
                }
            })
            .await;
        let receipts = result?;
        if let Some(err) = write_error {
            return Err(err.into());
        }

        writeln!(out, "{} transfers confirmed", receipts.len())?;
        Ok(receipts)
    }
}

/// Reads a batch file.
///
/// # Errors
///
/// Returns [`CommandError::Io`] if the file cannot be read and
/// [`CommandError::Json`] if it is not an array of transfers.
pub fn load_batch(path: &Path) -> Result<BatchTransferRequest, CommandError> {
    let content = std::fs::read_to_string(path)?;
    let items: Vec<TransferRequest> = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), items = items.len(), "loaded batch");
    Ok(BatchTransferRequest { items })
}

fn write_plan(out: &mut impl Write, request: &BatchTransferRequest) -> Result<(), CommandError> {
    let rows: Vec<Vec<String>> = request
        .items
        .iter()
        .enumerate()
        .map(|(offset, item)| {
            vec![
                (offset + 1).to_string(),
                item.from.clone(),
                item.to.clone(),
                item.amount.clone(),
            ]
        })
        .collect();
    writeln!(out, "Would run {} transfers in order:", rows.len())?;
    write_table(out, &["#", "From", "To", "Amount (FIL)"], &rows)?;
    writeln!(out, "Pass --really-do-it to sign and broadcast.")?;
    Ok(())
}
