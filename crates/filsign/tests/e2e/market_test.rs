//! Integration tests for storage market escrow withdrawal.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use filsign::executor::{Executor, MarketWithdrawRequest, OperationRequest};
use filsign_chain::params::{market, storage_market_actor, MarketWithdrawBalanceParams};
use filsign_chain::Address;
use filsign_core::error::ExecutionErrorKind;
use filsign_core::SignatureType;

use crate::common::{executor, fil, MockNode, RecordingVault};

/// Escrow of 5 FIL with 2 locked, held by `f01001`.
fn escrowed() -> (Executor<MockNode, RecordingVault>, Address) {
    let executor = executor();
    let key = executor.vault().add_key(SignatureType::Secp256k1);
    executor.gateway().add_account(Address::new_id(1001), key);
    executor.gateway().update(|s| {
        s.market.escrow = fil("5");
        s.market.locked = fil("2");
    });
    (executor, key)
}

fn withdraw(address: &str, amount: &str) -> OperationRequest {
    OperationRequest::MarketWithdraw(MarketWithdrawRequest {
        address: address.to_string(),
        amount: amount.to_string(),
    })
}

#[tokio::test]
async fn test_withdraw_with_key_address() {
    let (executor, key) = escrowed();

    executor
        .execute(withdraw(&key.to_string(), "3"))
        .await
        .unwrap();

    let pushed = executor.gateway().pushed();
    assert_eq!(pushed.len(), 1);
    let message = &pushed[0].message;
    assert_eq!(message.from, key);
    assert_eq!(message.to, storage_market_actor());
    assert_eq!(message.method, market::WITHDRAW_BALANCE);
    assert!(message.value.is_zero());
    assert_eq!(
        message.params,
        MarketWithdrawBalanceParams {
            provider_or_client: Address::new_id(1001),
            amount: fil("3"),
        }
        .to_cbor()
        .unwrap()
    );
}

#[tokio::test]
async fn test_withdraw_with_id_address_signs_with_key() {
    let (executor, key) = escrowed();

    executor.execute(withdraw("f01001", "1.5")).await.unwrap();

    let pushed = executor.gateway().pushed();
    assert_eq!(pushed[0].message.from, key);
    assert_eq!(
        pushed[0].message.params,
        MarketWithdrawBalanceParams {
            provider_or_client: Address::new_id(1001),
            amount: fil("1.5"),
        }
        .to_cbor()
        .unwrap()
    );
}

#[tokio::test]
async fn test_withdraw_beyond_unlocked_escrow_is_refused() {
    let (executor, _) = escrowed();

    let err = executor
        .execute(withdraw("f01001", "3.000000000000000001"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        ExecutionErrorKind::InsufficientFunds { available, .. } if available == "3 FIL"
    ));
    assert!(err.is_refusal());
    assert_eq!(executor.vault().lookups(), 0);
    assert!(executor.gateway().pushed().is_empty());
}

#[tokio::test]
async fn test_fully_locked_escrow_has_nothing_available() {
    let (executor, _) = escrowed();
    executor.gateway().update(|s| s.market.locked = fil("7"));

    let err = executor
        .execute(withdraw("f01001", "0.000000000000000001"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        ExecutionErrorKind::InsufficientFunds { available, .. } if available == "0 FIL"
    ));
}

#[tokio::test]
async fn test_unknown_account_fails_lookup() {
    let executor = executor();

    let err = executor.execute(withdraw("f09999", "1")).await.unwrap_err();

    assert!(matches!(err.kind(), ExecutionErrorKind::Network(_)));
    assert!(!executor.gateway().called("StateMarketBalance"));
}
