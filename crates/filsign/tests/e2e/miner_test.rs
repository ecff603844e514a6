//! Integration tests for storage miner operations.
//!
//! These tests verify that miner operations:
//! - Are signed by the owner's key address
//! - Refuse over-withdrawals before any key is touched
//! - Authorize owner changes against the current and proposed owner
//! - Only confirm a worker change that matches and has matured

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use filsign::executor::{
    ChangeOwnerRequest, ChangeWorkerRequest, ConfirmWorkerRequest, ExecutionOutcome, Executor,
    MinerWithdrawRequest, OperationRequest,
};
use filsign_chain::params::{
    miner, ChangeOwnerParams, ChangeWorkerAddressParams, MinerWithdrawBalanceParams,
};
use filsign_chain::{Address, SignedMessage};
use filsign_core::error::ExecutionErrorKind;
use filsign_core::{OperationKind, SignatureType};

use crate::common::{executor, fil, miner_info, MockNode, RecordingVault};

const MINER: &str = "f01234";

/// An executor whose vault holds the key of owner `f01001`.
fn owned_miner() -> (Executor<MockNode, RecordingVault>, Address) {
    let executor = executor();
    let owner_key = executor.vault().add_key(SignatureType::Secp256k1);
    executor
        .gateway()
        .add_account(Address::new_id(1001), owner_key);
    executor.gateway().update(|s| {
        s.miner_info = Some(miner_info());
        s.miner_available = fil("10");
    });
    (executor, owner_key)
}

fn only_pushed(executor: &Executor<MockNode, RecordingVault>) -> SignedMessage {
    let pushed = executor.gateway().pushed();
    assert_eq!(pushed.len(), 1);
    pushed.into_iter().next().unwrap()
}

fn withdraw(amount: &str) -> OperationRequest {
    OperationRequest::MinerWithdraw(MinerWithdrawRequest {
        miner: MINER.to_string(),
        amount: amount.to_string(),
    })
}

// ============================================================================
// Withdraw
// ============================================================================

#[tokio::test]
async fn test_withdraw_full_available_balance() {
    let (executor, owner_key) = owned_miner();

    let outcome = executor.execute(withdraw("10")).await.unwrap();

    let signed = only_pushed(&executor);
    assert_eq!(signed.message.from, owner_key);
    assert_eq!(signed.message.to, Address::new_id(1234));
    assert_eq!(signed.message.method, miner::WITHDRAW_BALANCE);
    assert!(signed.message.value.is_zero());
    assert_eq!(
        signed.message.params,
        MinerWithdrawBalanceParams { amount: fil("10") }
            .to_cbor()
            .unwrap()
    );
    assert!(matches!(
        outcome,
        ExecutionOutcome::Confirmed(ref r) if r.operation == OperationKind::MinerWithdraw
    ));
}

#[tokio::test]
async fn test_withdraw_one_atto_over_is_refused_before_signing() {
    let (executor, _) = owned_miner();

    let err = executor
        .execute(withdraw("10.000000000000000001"))
        .await
        .unwrap_err();

    match err.kind() {
        ExecutionErrorKind::InsufficientFunds {
            requested,
            available,
        } => {
            assert_eq!(requested, "10.000000000000000001 FIL");
            assert_eq!(available, "10 FIL");
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }
    assert!(err.is_refusal());
    assert_eq!(err.address(), MINER);
    assert_eq!(executor.vault().lookups(), 0);
    assert!(!executor.gateway().called("MpoolGetNonce"));
    assert!(executor.gateway().pushed().is_empty());
}

#[tokio::test]
async fn test_withdraw_unknown_miner_is_network_error() {
    let executor = executor();

    let err = executor.execute(withdraw("1")).await.unwrap_err();

    assert!(matches!(err.kind(), ExecutionErrorKind::Network(_)));
    assert!(!err.is_refusal());
}

// ============================================================================
// Owner Change
// ============================================================================

fn change_owner(new_owner: &str, from: &Address) -> OperationRequest {
    OperationRequest::MinerChangeOwner(ChangeOwnerRequest {
        miner: MINER.to_string(),
        new_owner: new_owner.to_string(),
        from: from.to_string(),
    })
}

#[tokio::test]
async fn test_current_owner_proposes_new_owner() {
    let (executor, owner_key) = owned_miner();

    executor
        .execute(change_owner("f01005", &owner_key))
        .await
        .unwrap();

    let signed = only_pushed(&executor);
    assert_eq!(signed.message.from, owner_key);
    assert_eq!(signed.message.method, miner::CHANGE_OWNER_ADDRESS);
    assert_eq!(
        signed.message.params,
        ChangeOwnerParams {
            new_owner: Address::new_id(1005)
        }
        .to_cbor()
    );
}

#[tokio::test]
async fn test_proposed_owner_confirms_with_id_address() {
    let (executor, _) = owned_miner();
    let new_owner_key = executor.vault().add_key(SignatureType::Bls);
    executor
        .gateway()
        .add_account(Address::new_id(1005), new_owner_key);

    executor
        .execute(change_owner(&new_owner_key.to_string(), &new_owner_key))
        .await
        .unwrap();

    let signed = only_pushed(&executor);
    assert_eq!(signed.message.from, new_owner_key);
    assert_eq!(
        signed.message.params,
        ChangeOwnerParams {
            new_owner: Address::new_id(1005)
        }
        .to_cbor()
    );
}

#[tokio::test]
async fn test_stranger_cannot_change_owner() {
    let (executor, _) = owned_miner();
    let stranger = executor.vault().add_key(SignatureType::Secp256k1);
    executor
        .gateway()
        .add_account(Address::new_id(1999), stranger);

    let err = executor
        .execute(change_owner("f01005", &stranger))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), ExecutionErrorKind::Unauthorized { .. }));
    assert!(err.is_refusal());
    assert_eq!(executor.vault().lookups(), 0);
    assert!(executor.gateway().pushed().is_empty());
}

// ============================================================================
// Worker Change
// ============================================================================

fn propose_worker(worker: Option<&str>, controls: Option<&[&str]>) -> OperationRequest {
    OperationRequest::MinerChangeWorker(ChangeWorkerRequest {
        miner: MINER.to_string(),
        new_worker: worker.map(str::to_string),
        new_control_addresses: controls
            .map(|c| c.iter().map(|a| (*a).to_string()).collect()),
    })
}

#[tokio::test]
async fn test_propose_worker_defaults_to_current_addresses() {
    let (executor, owner_key) = owned_miner();

    executor.execute(propose_worker(None, None)).await.unwrap();

    let signed = only_pushed(&executor);
    assert_eq!(signed.message.from, owner_key);
    assert_eq!(signed.message.method, miner::CHANGE_WORKER_ADDRESS);
    assert_eq!(
        signed.message.params,
        ChangeWorkerAddressParams {
            new_worker: Address::new_id(1002),
            new_control_addresses: vec![Address::new_id(1003)],
        }
        .to_cbor()
    );
}

#[tokio::test]
async fn test_propose_worker_with_new_addresses() {
    let (executor, _) = owned_miner();

    executor
        .execute(propose_worker(Some("f01006"), Some(&["f01007", "f01008"])))
        .await
        .unwrap();

    assert_eq!(
        only_pushed(&executor).message.params,
        ChangeWorkerAddressParams {
            new_worker: Address::new_id(1006),
            new_control_addresses: vec![Address::new_id(1007), Address::new_id(1008)],
        }
        .to_cbor()
    );
}

#[tokio::test]
async fn test_empty_control_list_keeps_current_set() {
    let (executor, _) = owned_miner();

    executor
        .execute(propose_worker(Some("f01006"), Some(&[])))
        .await
        .unwrap();

    assert_eq!(
        only_pushed(&executor).message.params,
        ChangeWorkerAddressParams {
            new_worker: Address::new_id(1006),
            new_control_addresses: vec![Address::new_id(1003)],
        }
        .to_cbor()
    );
}

fn confirm_worker(worker: &str) -> OperationRequest {
    OperationRequest::MinerConfirmWorker(ConfirmWorkerRequest {
        miner: MINER.to_string(),
        new_worker: worker.to_string(),
    })
}

fn with_pending_worker(executor: &Executor<MockNode, RecordingVault>, head_height: i64) {
    executor.gateway().update(|s| {
        let info = s.miner_info.as_mut().unwrap();
        info.new_worker = Some(Address::new_id(1006));
        info.worker_change_epoch = 2_000;
        s.head_height = head_height;
    });
}

#[tokio::test]
async fn test_confirm_worker_before_change_epoch_is_not_ready() {
    let (executor, _) = owned_miner();
    with_pending_worker(&executor, 1_999);

    let err = executor
        .execute(confirm_worker("f01006"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        ExecutionErrorKind::NotReady {
            height: 1_999,
            change_epoch: 2_000
        }
    ));
    assert!(err.is_refusal());
    assert_eq!(executor.vault().lookups(), 0);
}

#[tokio::test]
async fn test_confirm_worker_at_change_epoch() {
    let (executor, owner_key) = owned_miner();
    with_pending_worker(&executor, 2_000);

    executor.execute(confirm_worker("f01006")).await.unwrap();

    let signed = only_pushed(&executor);
    assert_eq!(signed.message.from, owner_key);
    assert_eq!(signed.message.method, miner::CONFIRM_CHANGE_WORKER_ADDRESS);
    assert!(signed.message.params.is_empty());
}

#[tokio::test]
async fn test_confirm_unproposed_worker_is_refused() {
    let (executor, _) = owned_miner();

    let err = executor
        .execute(confirm_worker("f01006"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ExecutionErrorKind::NoMatchingProposal { .. }
    ));

    with_pending_worker(&executor, 5_000);
    let err = executor
        .execute(confirm_worker("f01007"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ExecutionErrorKind::NoMatchingProposal { worker } if worker == "f01007"
    ));
    assert!(executor.gateway().pushed().is_empty());
}
