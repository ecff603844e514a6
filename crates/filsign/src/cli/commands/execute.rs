//! # Single-Operation Commands
//!
//! `send`, `withdraw`, `market withdraw`, `actor set-owner`,
//! `actor propose-change-worker`, `actor confirm-change-worker` and
//! `mpool push` all turn their arguments into one [`OperationRequest`] and
//! hand it to the executor.
//!
//! Without `--really-do-it` the request is printed and nothing else
//! happens: the vault is not opened and the node is not contacted.
//!
//! ```no_run
//! use filsign::cli::commands::{CommandContext, ExecuteCommand};
//! use filsign::executor::{OperationRequest, TransferRequest};
//!
//! # async fn run() -> Result<(), filsign::cli::commands::CommandError> {
//! let ctx = CommandContext::load(None)?;
//! let request = OperationRequest::Transfer(TransferRequest::new("f1abc", "f01001", "1.5"));
//! ExecuteCommand::new(request, true).run(&ctx).await?;
//! # Ok(())
//! # }
//! ```

use std::io::{self, Write};

use filsign_crypto::KeyVault;
use serde_json::Value;

use super::{CommandContext, CommandError};
use crate::executor::{ExecutionOutcome, ExecutionReceipt, Executor, OperationRequest};
use crate::gateway::NodeGateway;

/// Runs one operation, or previews it.
#[derive(Debug, Clone)]
pub struct ExecuteCommand {
    request: OperationRequest,
    really_do_it: bool,
}

impl ExecuteCommand {
    /// Create a command for `request`. Nothing is signed unless
    /// `really_do_it` is set.
    #[must_use]
    pub const fn new(request: OperationRequest, really_do_it: bool) -> Self {
        Self {
            request,
            really_do_it,
        }
    }

    /// The request this command runs.
    #[must_use]
    pub const fn request(&self) -> &OperationRequest {
        &self.request
    }

    /// Run the operation, or print it without `--really-do-it`.
    ///
    /// # Errors
    ///
    /// Returns an error if the executor cannot be built or the operation
    /// fails.
    pub async fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let mut out = io::stdout().lock();
        if !self.really_do_it {
            return write_preview(&mut out, &self.request);
        }
        let executor = ctx.executor()?;
        self.run_with(&executor, &mut out).await.map(|_| ())
    }

    /// [`run`](Self::run) against an executor.
    ///
    /// Returns `None` for a preview.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    pub async fn run_with<G: NodeGateway, V: KeyVault>(
        &self,
        executor: &Executor<G, V>,
        out: &mut impl Write,
    ) -> Result<Option<ExecutionOutcome>, CommandError> {
        if !self.really_do_it {
            write_preview(out, &self.request)?;
            return Ok(None);
        }

        let outcome = executor.execute(self.request.clone()).await?;
        match &outcome {
            ExecutionOutcome::Confirmed(receipt) => write_receipt(out, receipt)?,
            ExecutionOutcome::Batch(receipts) => {
                for (offset, receipt) in receipts.iter().enumerate() {
                    write_batch_item(out, offset + 1, receipt)?;
                }
            }
            ExecutionOutcome::Pushed(cid) => writeln!(out, "{cid}")?,
        }
        Ok(Some(outcome))
    }
}

/// Prints the request field by field, followed by the `--really-do-it`
/// hint.
fn write_preview(out: &mut impl Write, request: &OperationRequest) -> Result<(), CommandError> {
    writeln!(out, "Would run {}:", request.kind())?;
    if let Value::Object(fields) = serde_json::to_value(request)? {
        for (name, value) in fields.iter().filter(|(name, _)| name.as_str() != "type") {
            writeln!(out, "  {name}: {}", preview_value(value))?;
        }
    }
    writeln!(out, "Pass --really-do-it to sign and broadcast.")?;
    Ok(())
}

fn preview_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(preview_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

pub(crate) fn write_receipt(out: &mut impl Write, receipt: &ExecutionReceipt) -> io::Result<()> {
    writeln!(
        out,
        "Message {} confirmed at height {}",
        receipt.cid, receipt.height
    )?;
    writeln!(out, "  from:     {}", receipt.from)?;
    writeln!(out, "  to:       {}", receipt.to)?;
    writeln!(out, "  nonce:    {}", receipt.nonce)?;
    writeln!(out, "  value:    {}", receipt.value)?;
    writeln!(out, "  gas used: {}", receipt.gas_used)
}

pub(crate) fn write_batch_item(
    out: &mut impl Write,
    index: usize,
    receipt: &ExecutionReceipt,
) -> io::Result<()> {
    writeln!(
        out,
        "{index}. {} -> {} {} ({}, height {})",
        receipt.from, receipt.to, receipt.value, receipt.cid, receipt.height
    )
}
