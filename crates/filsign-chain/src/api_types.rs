//! Node API response types.
//!
//! These mirror the JSON the node returns. Fields the executor never reads
//! are ignored on deserialization.

use crate::address::{self, Address};
use crate::amount::TokenAmount;
use crate::cid::Cid;
use serde::{Deserialize, Serialize};

/// A chain epoch (block height).
pub type ChainEpoch = i64;

/// Execution receipt of an included message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageReceipt {
    /// Actor exit code; 0 is success.
    pub exit_code: i64,
    /// Gas consumed.
    #[serde(default)]
    pub gas_used: i64,
}

impl MessageReceipt {
    /// Whether the message executed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Result of waiting for a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MsgLookup {
    /// CID of the included message.
    pub message: Cid,
    /// Execution receipt.
    pub receipt: MessageReceipt,
    /// Epoch of the tipset the message executed in.
    pub height: ChainEpoch,
}

/// Miner actor metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    /// Owner address.
    pub owner: Address,
    /// Current worker address.
    pub worker: Address,
    /// Proposed worker awaiting confirmation, if any.
    #[serde(with = "address::optional", default)]
    pub new_worker: Option<Address>,
    /// Control addresses; the node sends `null` when there are none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub control_addresses: Vec<Address>,
    /// Epoch from which a pending worker change may be confirmed.
    #[serde(default)]
    pub worker_change_epoch: ChainEpoch,
    /// Proposed owner awaiting acceptance, if any.
    #[serde(
        with = "address::optional",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_owner_address: Option<Address>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Address>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Address>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Storage market escrow for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketBalance {
    /// Total escrowed funds.
    pub escrow: TokenAmount,
    /// Funds locked by active deals.
    pub locked: TokenAmount,
}

impl MarketBalance {
    /// Escrow not locked by deals; zero if locked exceeds escrow.
    #[must_use]
    pub fn available(&self) -> TokenAmount {
        self.escrow.saturating_sub(&self.locked)
    }
}

/// The parts of a tipset the executor uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TipSet {
    /// Block header CIDs.
    pub cids: Vec<Cid>,
    /// Tipset epoch.
    pub height: ChainEpoch,
}

/// On-chain actor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    /// Actor code CID.
    pub code: Cid,
    /// State root.
    pub head: Cid,
    /// Next nonce.
    pub nonce: u64,
    /// Balance held by the actor.
    #[serde(alias = "Amount")]
    pub balance: TokenAmount,
}
