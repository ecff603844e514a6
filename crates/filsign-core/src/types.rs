//! Core tags shared across filsign crates.
//!
//! - [`SignatureType`] - The closed set of signature algorithms a key can use
//! - [`OperationKind`] - Classification of the on-chain operations the executor runs
//!
//! # Examples
//!
//! ```
//! use filsign_core::types::{OperationKind, SignatureType};
//!
//! assert_eq!(SignatureType::from_byte(1), Some(SignatureType::Secp256k1));
//! assert_eq!(OperationKind::MinerWithdraw.to_string(), "miner_withdraw");
//! ```

use crate::error::SignError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature algorithm of a key, an address class and a signature.
///
/// The numeric value is the type byte that prefixes a signature in its
/// canonical encoding. The string form is the `Type` tag used in key
/// export files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    /// ECDSA over secp256k1 with a recoverable 65-byte signature.
    Secp256k1,

    /// BLS over BLS12-381, public keys in G1 and signatures in G2.
    Bls,
}

impl SignatureType {
    /// Returns the signature type byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use filsign_core::types::SignatureType;
    ///
    /// assert_eq!(SignatureType::Secp256k1.as_byte(), 1);
    /// assert_eq!(SignatureType::Bls.as_byte(), 2);
    /// ```
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        match self {
            Self::Secp256k1 => 1,
            Self::Bls => 2,
        }
    }

    /// Parses a signature type byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Secp256k1),
            2 => Some(Self::Bls),
            _ => None,
        }
    }

    /// Returns the lowercase tag (`secp256k1` or `bls`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Bls => "bls",
        }
    }

    /// Length in bytes of a signature produced by this algorithm.
    #[must_use]
    pub const fn signature_len(&self) -> usize {
        match self {
            Self::Secp256k1 => 65,
            Self::Bls => 96,
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "secp256k1" => Ok(Self::Secp256k1),
            "bls" => Ok(Self::Bls),
            other => Err(SignError::unsupported_algorithm(other)),
        }
    }
}

/// The kinds of operation the transaction executor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Plain value transfer between accounts.
    Transfer,

    /// Withdrawal of a miner actor's available balance to its owner.
    MinerWithdraw,

    /// Withdrawal of unlocked storage market escrow.
    MarketWithdraw,

    /// Ordered sequence of transfers that halts at the first failure.
    BatchTransfer,

    /// Proposal or confirmation of a new miner owner.
    MinerChangeOwner,

    /// Proposal of a new miner worker and control address set.
    MinerChangeWorker,

    /// Confirmation of a pending worker change.
    MinerConfirmWorker,

    /// Broadcast of a message signed elsewhere.
    MpoolPush,
}

impl OperationKind {
    /// Returns the `snake_case` name of the operation.
    ///
    /// # Examples
    ///
    /// ```
    /// use filsign_core::types::OperationKind;
    ///
    /// assert_eq!(OperationKind::Transfer.as_str(), "transfer");
    /// assert_eq!(OperationKind::MinerConfirmWorker.as_str(), "miner_confirm_worker");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::MinerWithdraw => "miner_withdraw",
            Self::MarketWithdraw => "market_withdraw",
            Self::BatchTransfer => "batch_transfer",
            Self::MinerChangeOwner => "miner_change_owner",
            Self::MinerChangeWorker => "miner_change_worker",
            Self::MinerConfirmWorker => "miner_confirm_worker",
            Self::MpoolPush => "mpool_push",
        }
    }

    /// Returns `true` if the operation moves value out of an actor.
    #[must_use]
    pub const fn moves_value(&self) -> bool {
        matches!(
            self,
            Self::Transfer | Self::MinerWithdraw | Self::MarketWithdraw | Self::BatchTransfer
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
