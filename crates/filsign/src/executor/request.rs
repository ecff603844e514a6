//! Operation requests.
//!
//! Requests carry addresses and amounts as the caller wrote them. The
//! executor parses them when the operation runs, so a malformed field is
//! reported as a [`ValidationError`] of that operation; inside a batch that
//! means a bad item fails in its turn, after the items before it went out.
//!
//! Amounts are FIL decimals (`"1.5"`, `"0.25 FIL"`).
//!
//! The JSON form is tagged by `type`:
//!
//! ```
//! use filsign::executor::OperationRequest;
//! use filsign_core::OperationKind;
//!
//! let request: OperationRequest = serde_json::from_str(
//!     r#"{"type":"miner_withdraw","miner":"f01234","amount":"12.5"}"#,
//! ).unwrap();
//! assert_eq!(request.kind(), OperationKind::MinerWithdraw);
//! ```

use filsign_chain::{Address, SignedMessage, TokenAmount};
use filsign_core::error::{CodecError, ValidationError};
use filsign_core::OperationKind;
use serde::{Deserialize, Serialize};

/// Send `amount` FIL from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Sender; the vault must hold its key.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Amount in FIL.
    pub amount: String,
}

impl TransferRequest {
    /// Convenience constructor.
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
        }
    }
}

/// Withdraw `amount` FIL of a miner's available balance to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerWithdrawRequest {
    /// Miner actor.
    pub miner: String,
    /// Amount in FIL.
    pub amount: String,
}

/// Withdraw `amount` FIL of unlocked storage market escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketWithdrawRequest {
    /// Escrow holder, as an ID or key address.
    pub address: String,
    /// Amount in FIL.
    pub amount: String,
}

/// Transfers run in order, stopping at the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTransferRequest {
    /// The transfers, in execution order.
    pub items: Vec<TransferRequest>,
}

/// Propose (from the current owner) or accept (from the new owner) an
/// owner change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOwnerRequest {
    /// Miner actor.
    pub miner: String,
    /// Proposed owner.
    pub new_owner: String,
    /// Signing address: the current owner or `new_owner`.
    pub from: String,
}

/// Propose a new worker and control address set.
///
/// Omitted fields keep the miner's current values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeWorkerRequest {
    /// Miner actor.
    pub miner: String,
    /// Proposed worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_worker: Option<String>,
    /// Replacement control addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_control_addresses: Option<Vec<String>>,
}

/// Confirm a pending worker change once its epoch is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmWorkerRequest {
    /// Miner actor.
    pub miner: String,
    /// The pending worker being confirmed.
    pub new_worker: String,
}

/// Broadcast a message signed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpoolPushRequest {
    /// Hex of the signed message CBOR.
    pub message: String,
}

impl MpoolPushRequest {
    /// Decodes the hex-encoded signed message.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for invalid hex and [`CodecError`] for a
    /// malformed message.
    pub fn decode(&self) -> Result<SignedMessage, DecodeError> {
        let bytes = hex::decode(self.message.trim().trim_start_matches("0x"))
            .map_err(|e| ValidationError::invalid_input("message", e.to_string()))?;
        Ok(SignedMessage::from_cbor(&bytes)?)
    }
}

/// Why an [`MpoolPushRequest`] could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not hex.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Not a signed message.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Any request the executor runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationRequest {
    /// See [`TransferRequest`].
    Transfer(TransferRequest),
    /// See [`MinerWithdrawRequest`].
    MinerWithdraw(MinerWithdrawRequest),
    /// See [`MarketWithdrawRequest`].
    MarketWithdraw(MarketWithdrawRequest),
    /// See [`BatchTransferRequest`].
    BatchTransfer(BatchTransferRequest),
    /// See [`ChangeOwnerRequest`].
    MinerChangeOwner(ChangeOwnerRequest),
    /// See [`ChangeWorkerRequest`].
    MinerChangeWorker(ChangeWorkerRequest),
    /// See [`ConfirmWorkerRequest`].
    MinerConfirmWorker(ConfirmWorkerRequest),
    /// See [`MpoolPushRequest`].
    MpoolPush(MpoolPushRequest),
}

impl OperationRequest {
    /// The operation this request runs.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::Transfer(_) => OperationKind::Transfer,
            Self::MinerWithdraw(_) => OperationKind::MinerWithdraw,
            Self::MarketWithdraw(_) => OperationKind::MarketWithdraw,
            Self::BatchTransfer(_) => OperationKind::BatchTransfer,
            Self::MinerChangeOwner(_) => OperationKind::MinerChangeOwner,
            Self::MinerChangeWorker(_) => OperationKind::MinerChangeWorker,
            Self::MinerConfirmWorker(_) => OperationKind::MinerConfirmWorker,
            Self::MpoolPush(_) => OperationKind::MpoolPush,
        }
    }
}

pub(crate) fn parse_address(input: &str) -> Result<Address, ValidationError> {
    input.trim().parse()
}

pub(crate) fn parse_amount(input: &str) -> Result<TokenAmount, ValidationError> {
    TokenAmount::parse_fil(input.trim())
}
