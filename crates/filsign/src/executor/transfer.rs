//! Value transfers.

use filsign_chain::params::METHOD_SEND;
use filsign_chain::Message;
use filsign_core::error::{ExecutionErrorKind, ExecutionResult, ValidationError};
use filsign_core::OperationKind;
use filsign_crypto::KeyVault;
use tracing::Instrument;

use super::request::{parse_address, parse_amount};
use super::{BatchTransferRequest, ExecutionReceipt, Executor, OpContext, TransferRequest};
use crate::gateway::NodeGateway;
use crate::logging::{new_correlation_id, operation_span};

impl<G: NodeGateway, V: KeyVault> Executor<G, V> {
    pub(super) async fn transfer(
        &self,
        req: &TransferRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::Transfer,
            req.from.as_str(),
            Some(req.amount.as_str()),
            correlation_id,
        );

        let from = parse_address(&req.from).map_err(|e| ctx.fail(e))?;
        let to = parse_address(&req.to).map_err(|e| ctx.fail(e))?;
        let amount = parse_amount(&req.amount).map_err(|e| ctx.fail(e))?;

        tracing::info!(from = %from, to = %to, amount = %amount, "transfer");
        let message = Message::new(from, to, METHOD_SEND, amount, Vec::new());
        self.submit(&ctx, message).await
    }

    /// Runs a batch, calling `on_item(index, receipt)` after each confirmed
    /// item (1-based).
    ///
    /// Items run strictly in order and the batch stops at the first failure.
    /// Items confirmed before it are not undone; they have already been
    /// reported through `on_item`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionErrorKind::BatchItemFailed`] with the index and
    /// error of the failing item, or a validation error for an empty batch.
    pub async fn batch_transfer<F>(
        &self,
        req: &BatchTransferRequest,
        on_item: F,
    ) -> ExecutionResult<Vec<ExecutionReceipt>>
    where
        F: FnMut(usize, &ExecutionReceipt) + Send,
    {
        let correlation_id = new_correlation_id();
        let span = operation_span(&correlation_id, OperationKind::BatchTransfer);
        self.run_batch(req, &correlation_id, on_item)
            .instrument(span)
            .await
    }

    pub(super) async fn run_batch<F>(
        &self,
        req: &BatchTransferRequest,
        correlation_id: &str,
        mut on_item: F,
    ) -> ExecutionResult<Vec<ExecutionReceipt>>
    where
        F: FnMut(usize, &ExecutionReceipt) + Send,
    {
        let total = req.items.len();
        let amount = format!("{total} items");
        let ctx = OpContext::new(
            OperationKind::BatchTransfer,
            req.items.first().map_or("", |item| item.from.as_str()),
            Some(amount.as_str()),
            correlation_id,
        );
        if total == 0 {
            return Err(ctx.fail(ValidationError::invalid_input(
                "items",
                "batch has no transfers",
            )));
        }

        let mut receipts = Vec::with_capacity(total);
        for (offset, item) in req.items.iter().enumerate() {
            let index = offset + 1;
            tracing::info!(index, total, "processing batch item");

            match self.transfer(item, correlation_id).await {
                Ok(receipt) => {
                    on_item(index, &receipt);
                    receipts.push(receipt);
                }
                Err(err) => {
                    tracing::error!(
                        index,
                        total,
                        completed = receipts.len(),
                        "batch halted"
                    );
                    return Err(ctx.fail(ExecutionErrorKind::BatchItemFailed {
                        index,
                        source: Box::new(err),
                    }));
                }
            }
        }

        tracing::info!(total, "batch completed");
        Ok(receipts)
    }
}
