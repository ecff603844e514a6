//! Built-in actor method numbers and parameter encodings.
//!
//! Only the methods the executor calls are covered. Each params type encodes
//! to the CBOR the actor expects in [`Message::params`](crate::message::Message).

use crate::address::Address;
use crate::amount::TokenAmount;
use crate::cbor::Encoder;
use filsign_core::error::{CodecError, CodecResult};

/// Plain value transfer.
pub const METHOD_SEND: u64 = 0;

/// Storage miner actor methods.
pub mod miner {
    /// Proposes a new worker and replaces the control addresses.
    pub const CHANGE_WORKER_ADDRESS: u64 = 3;
    /// Withdraws available balance to the owner.
    pub const WITHDRAW_BALANCE: u64 = 16;
    /// Confirms a pending worker change once its epoch is reached.
    pub const CONFIRM_CHANGE_WORKER_ADDRESS: u64 = 21;
    /// Proposes (from the owner) or accepts (from the new owner) an owner change.
    pub const CHANGE_OWNER_ADDRESS: u64 = 23;
}

/// Storage market actor methods.
pub mod market {
    /// Withdraws unlocked escrow.
    pub const WITHDRAW_BALANCE: u64 = 3;
}

/// Actor id of the storage market actor.
pub const STORAGE_MARKET_ACTOR_ID: u64 = 5;

/// Address of the storage market actor (`f05`).
#[must_use]
pub const fn storage_market_actor() -> Address {
    Address::new_id(STORAGE_MARKET_ACTOR_ID)
}

/// Miner `WithdrawBalance` params: `[amount]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerWithdrawBalanceParams {
    /// Amount requested; the actor pays out at most the available balance.
    pub amount: TokenAmount,
}

impl MinerWithdrawBalanceParams {
    /// Encodes the params.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] if the amount is too wide
    /// to encode.
    pub fn to_cbor(&self) -> CodecResult<Vec<u8>> {
        let mut enc = Encoder::new();
        enc.write_array_header(1);
        self.amount.write_cbor(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

/// Market `WithdrawBalance` params: `[provider_or_client, amount]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketWithdrawBalanceParams {
    /// Account whose escrow is withdrawn.
    pub provider_or_client: Address,
    /// Amount to withdraw.
    pub amount: TokenAmount,
}

impl MarketWithdrawBalanceParams {
    /// Encodes the params.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] if the amount is too wide
    /// to encode.
    pub fn to_cbor(&self) -> CodecResult<Vec<u8>> {
        let mut enc = Encoder::new();
        enc.write_array_header(2);
        self.provider_or_client.write_cbor(&mut enc);
        self.amount.write_cbor(&mut enc)?;
        Ok(enc.into_bytes())
    }
}

/// Miner `ChangeOwnerAddress` params: the bare new owner address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOwnerParams {
    /// Proposed owner, or the caller itself when accepting.
    pub new_owner: Address,
}

impl ChangeOwnerParams {
    /// Encodes the params.
    #[must_use]
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.new_owner.write_cbor(&mut enc);
        enc.into_bytes()
    }
}

/// Miner `ChangeWorkerAddress` params: `[new_worker, [control...]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeWorkerAddressParams {
    /// Proposed worker address.
    pub new_worker: Address,
    /// Replacement control addresses.
    pub new_control_addresses: Vec<Address>,
}

impl ChangeWorkerAddressParams {
    /// Encodes the params.
    #[must_use]
    pub fn to_cbor(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_array_header(2);
        self.new_worker.write_cbor(&mut enc);
        enc.write_array_header(self.new_control_addresses.len());
        for addr in &self.new_control_addresses {
            addr.write_cbor(&mut enc);
        }
        enc.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_miner_withdraw() {
        let params = MinerWithdrawBalanceParams {
            amount: TokenAmount::from_whole(5),
        };
        assert_eq!(hex::encode(params.to_cbor().unwrap()), "8149004563918244f40000");
    }

    #[test]
    fn test_market_withdraw() {
        let params = MarketWithdrawBalanceParams {
            provider_or_client: Address::new_id(1000),
            amount: TokenAmount::from_whole(1),
        };
        assert_eq!(
            hex::encode(params.to_cbor().unwrap()),
            "824300e80749000de0b6b3a7640000"
        );
    }

    #[test]
    fn test_change_owner() {
        let params = ChangeOwnerParams {
            new_owner: Address::new_id(1001),
        };
        assert_eq!(hex::encode(params.to_cbor()), "4300e907");
    }

    #[test]
    fn test_change_worker() {
        let params = ChangeWorkerAddressParams {
            new_worker: Address::new_id(1002),
            new_control_addresses: vec![Address::new_id(1003), Address::new_id(1004)],
        };
        assert_eq!(
            hex::encode(params.to_cbor()),
            "824300ea07824300eb074300ec07"
        );
    }

    #[test]
    fn test_change_worker_without_control_addresses() {
        let params = ChangeWorkerAddressParams {
            new_worker: Address::new_id(1002),
            new_control_addresses: Vec::new(),
        };
        assert_eq!(hex::encode(params.to_cbor()), "824300ea0780");
    }

    #[test]
    fn test_market_actor_address() {
        assert_eq!(storage_market_actor().to_string(), "f05");
    }
}
