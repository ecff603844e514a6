//! # Transaction Executor
//!
//! Runs one [`OperationRequest`] end to end: resolve addresses, check the
//! operation's preconditions, build the message, estimate gas, sign with the
//! vault key, broadcast, and wait for the message to be buried under
//! [`CONFIRMATION_DEPTH`] tipsets.
//!
//! ## Pipeline
//!
//! Every signing operation funnels into the same submission steps:
//!
//! 1. `MpoolGetNonce` for the sender
//! 2. [`GasEstimator::set_gas`]
//! 3. vault lookup; a missing key stops here, before anything is broadcast
//! 4. sign the message CID bytes and assemble the signed message
//! 5. `MpoolPush`, then the audit sink
//! 6. `StateWaitMsg`; a non-zero exit code is [`ExecutionErrorKind::ExecutionFailed`]
//!
//! Nothing is retried here. Wrap the gateway in a
//! [`RetryingGateway`](crate::gateway::RetryingGateway) for that.
//!
//! ## Concurrency
//!
//! Nonces are fetched, not reserved. Callers must not run two operations for
//! the same sender at once.
//!
//! ## Module Structure
//!
//! - [`request`] - Operation request types
//! - `transfer` - Transfer and batch transfer
//! - `miner` - Miner withdraw, owner and worker changes
//! - `market` - Storage market withdraw

mod market;
mod miner;
pub mod request;
mod transfer;

use std::sync::Arc;

use filsign_chain::{Address, ChainEpoch, Cid, Message, SignedMessage, TokenAmount};
use filsign_core::error::{ExecutionError, ExecutionErrorKind, ExecutionResult};
use filsign_core::OperationKind;
use filsign_crypto::KeyVault;
use tracing::Instrument;

use crate::audit::{SignEvent, SignEventSink};
use crate::gas::GasEstimator;
use crate::gateway::{NodeGateway, CONFIRMATION_DEPTH};
use crate::logging::{log_security_event, new_correlation_id, operation_span};

pub use request::{
    BatchTransferRequest, ChangeOwnerRequest, ChangeWorkerRequest, ConfirmWorkerRequest,
    DecodeError, MarketWithdrawRequest, MinerWithdrawRequest, MpoolPushRequest, OperationRequest,
    TransferRequest,
};

/// A confirmed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    /// Operation that sent the message.
    pub operation: OperationKind,
    /// CID reported by the node.
    pub cid: Cid,
    /// Signing address.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Nonce the message used.
    pub nonce: u64,
    /// Value transferred.
    pub value: TokenAmount,
    /// Epoch the message executed in.
    pub height: ChainEpoch,
    /// Gas consumed.
    pub gas_used: i64,
}

/// What a successful [`Executor::execute`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// One confirmed message.
    Confirmed(ExecutionReceipt),
    /// Every item of a batch, in order.
    Batch(Vec<ExecutionReceipt>),
    /// A pre-signed message accepted by the mpool; not waited for.
    Pushed(Cid),
}

/// Operation, address and amount an error is reported against.
#[derive(Debug, Clone)]
pub(crate) struct OpContext {
    operation: OperationKind,
    address: String,
    amount: Option<String>,
    correlation_id: String,
}

impl OpContext {
    pub(crate) fn new(
        operation: OperationKind,
        address: impl Into<String>,
        amount: Option<&str>,
        correlation_id: &str,
    ) -> Self {
        Self {
            operation,
            address: address.into(),
            amount: amount.map(str::to_string),
            correlation_id: correlation_id.to_string(),
        }
    }

    pub(crate) fn fail(&self, kind: impl Into<ExecutionErrorKind>) -> ExecutionError {
        let err = ExecutionError::new(
            self.operation,
            self.address.clone(),
            self.amount.clone(),
            kind,
        );
        tracing::error!(
            operation = %self.operation,
            address = %self.address,
            error = %err,
            "operation failed"
        );
        err
    }
}

/// Runs operations against a node with keys from a vault.
pub struct Executor<G, V> {
    gateway: G,
    vault: V,
    gas: GasEstimator,
    sink: Option<Arc<dyn SignEventSink>>,
}

impl<G, V> std::fmt::Debug for Executor<G, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("gateway", &"<NodeGateway>")
            .field("vault", &"<KeyVault>")
            .field("gas", &self.gas)
            .field("audited", &self.sink.is_some())
            .finish()
    }
}

impl<G: NodeGateway, V: KeyVault> Executor<G, V> {
    /// Creates an executor without an audit sink.
    #[must_use]
    pub const fn new(gateway: G, vault: V, gas: GasEstimator) -> Self {
        Self {
            gateway,
            vault,
            gas,
            sink: None,
        }
    }

    /// Reports every broadcast to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn SignEventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// The node gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The key vault.
    #[must_use]
    pub const fn vault(&self) -> &V {
        &self.vault
    }

    /// Runs `request` to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`ExecutionError`] of the step that stopped the
    /// operation. For a batch the error is
    /// [`ExecutionErrorKind::BatchItemFailed`] and the items before the
    /// failing one stay broadcast.
    pub async fn execute(&self, request: OperationRequest) -> ExecutionResult<ExecutionOutcome> {
        let correlation_id = new_correlation_id();
        let span = operation_span(&correlation_id, request.kind());

        async {
            tracing::info!("executing operation");
            match &request {
                OperationRequest::Transfer(req) => self
                    .transfer(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::BatchTransfer(req) => self
                    .run_batch(req, &correlation_id, |_, _| {})
                    .await
                    .map(ExecutionOutcome::Batch),
                OperationRequest::MinerWithdraw(req) => self
                    .miner_withdraw(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::MarketWithdraw(req) => self
                    .market_withdraw(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::MinerChangeOwner(req) => self
                    .change_owner(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::MinerChangeWorker(req) => self
                    .change_worker(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::MinerConfirmWorker(req) => self
                    .confirm_worker(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Confirmed),
                OperationRequest::MpoolPush(req) => self
                    .push_signed(req, &correlation_id)
                    .await
                    .map(ExecutionOutcome::Pushed),
            }
        }
        .instrument(span)
        .await
    }

    /// Broadcasts a message signed elsewhere and returns its CID.
    async fn push_signed(&self, req: &MpoolPushRequest, correlation_id: &str) -> ExecutionResult<Cid> {
        let ctx = OpContext::new(OperationKind::MpoolPush, "<signed message>", None, correlation_id);
        let signed = req.decode().map_err(|e| match e {
            DecodeError::Validation(e) => ctx.fail(e),
            DecodeError::Codec(e) => ctx.fail(e),
        })?;

        let ctx = OpContext::new(
            OperationKind::MpoolPush,
            signed.message.from.to_string(),
            None,
            correlation_id,
        );
        let cid = self
            .gateway
            .mpool_push(&signed)
            .await
            .map_err(|e| ctx.fail(e))?;

        tracing::info!(cid = %cid, from = %signed.message.from, nonce = signed.message.nonce, "pushed signed message");
        self.record(&ctx, &signed, &cid);
        Ok(cid)
    }

    /// Resolves `address` to its ID form; ID addresses are returned as is.
    async fn lookup_id(&self, ctx: &OpContext, address: &Address) -> ExecutionResult<Address> {
        if address.is_id() {
            return Ok(*address);
        }
        self.gateway
            .state_lookup_id(address)
            .await
            .map_err(|e| ctx.fail(e))
    }

    /// Resolves `address` to its key form; other addresses are returned as is.
    async fn account_key(&self, ctx: &OpContext, address: &Address) -> ExecutionResult<Address> {
        if !address.is_id() {
            return Ok(*address);
        }
        self.gateway
            .state_account_key(address)
            .await
            .map_err(|e| ctx.fail(e))
    }

    /// Nonce, gas, sign, push, wait.
    async fn submit(&self, ctx: &OpContext, mut message: Message) -> ExecutionResult<ExecutionReceipt> {
        message.nonce = self
            .gateway
            .mpool_get_nonce(&message.from)
            .await
            .map_err(|e| ctx.fail(e))?;
        tracing::debug!(from = %message.from, nonce = message.nonce, "nonce assigned");

        self.gas
            .set_gas(&self.gateway, &mut message)
            .await
            .map_err(|e| ctx.fail(e))?;

        let signed = self.sign(ctx, message)?;

        tracing::info!(
            from = %signed.message.from,
            to = %signed.message.to,
            nonce = signed.message.nonce,
            method = signed.message.method,
            "pushing message to mpool"
        );
        let cid = self
            .gateway
            .mpool_push(&signed)
            .await
            .map_err(|e| ctx.fail(e))?;
        self.record(ctx, &signed, &cid);

        tracing::info!(cid = %cid, confidence = CONFIRMATION_DEPTH, "waiting for message");
        let lookup = self
            .gateway
            .state_wait_msg(&cid, CONFIRMATION_DEPTH)
            .await
            .map_err(|e| ctx.fail(e))?;

        if !lookup.receipt.is_success() {
            return Err(ctx.fail(ExecutionErrorKind::ExecutionFailed {
                cid: cid.to_string(),
                exit_code: lookup.receipt.exit_code,
            }));
        }

        tracing::info!(cid = %cid, height = lookup.height, gas_used = lookup.receipt.gas_used, "message confirmed");
        let message = signed.message;
        Ok(ExecutionReceipt {
            operation: ctx.operation,
            cid,
            from: message.from,
            to: message.to,
            nonce: message.nonce,
            value: message.value,
            height: lookup.height,
            gas_used: lookup.receipt.gas_used,
        })
    }

    fn sign(&self, ctx: &OpContext, message: Message) -> ExecutionResult<SignedMessage> {
        let from = message.from;
        if !self.vault.has(&from) {
            return Err(ctx.fail(ExecutionErrorKind::KeyNotFound {
                address: from.to_string(),
            }));
        }
        let key_info = self.vault.get(&from).map_err(|e| ctx.fail(e))?;

        let payload = message.signing_bytes().map_err(|e| ctx.fail(e))?;
        let signature = filsign_crypto::sign(&key_info, &payload).map_err(|e| ctx.fail(e))?;

        log_security_event(
            "message_signed",
            &format!(
                "operation={} from={from} nonce={} sig_type={}",
                ctx.operation, message.nonce, signature.sig_type
            ),
        );
        Ok(SignedMessage::new(message, signature))
    }

    fn record(&self, ctx: &OpContext, signed: &SignedMessage, cid: &Cid) {
        let Some(sink) = &self.sink else {
            return;
        };
        let event = SignEvent {
            correlation_id: ctx.correlation_id.clone(),
            operation: ctx.operation,
            from: signed.message.from,
            to: signed.message.to,
            nonce: signed.message.nonce,
            value: signed.message.value.clone(),
            method: signed.message.method,
            cid: cid.clone(),
            sig_type: signed.signature.sig_type,
        };
        if let Err(err) = sink.record(&event) {
            tracing::error!(cid = %cid, error = %err, "failed to record audit entry");
        }
    }
}
