//! Integration tests for transfers.
//!
//! These tests verify the full message pipeline for value transfers:
//! - Nonce, gas estimation, signing, push and wait in order
//! - Gas overestimation, fee cap fallback and the fee ceiling
//! - Missing keys and failed executions
//! - Batches halting at the first failing item

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use filsign::executor::{
    BatchTransferRequest, ExecutionOutcome, Executor, OperationRequest, TransferRequest,
};
use filsign::gas::GasEstimator;
use filsign_chain::params::METHOD_SEND;
use filsign_chain::{Address, TokenAmount};
use filsign_core::error::ExecutionErrorKind;
use filsign_core::{OperationKind, SignatureType};
use filsign_crypto::generate_key;

use crate::common::{executor, fil, MockNode, RecordingVault, ESTIMATED_GAS_LIMIT, GAS_USED};

fn transfer(from: &Address, to: &str, amount: &str) -> TransferRequest {
    TransferRequest::new(from.to_string(), to, amount)
}

// ============================================================================
// Single Transfer
// ============================================================================

#[tokio::test]
async fn test_transfer_runs_full_pipeline() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    executor.gateway().update(|s| {
        s.nonces.insert(from, 7);
    });

    let outcome = executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1.5")))
        .await
        .unwrap();

    assert_eq!(
        executor.gateway().calls(),
        vec![
            "MpoolGetNonce",
            "GasEstimateMessageGas",
            "GasEstimateGasPremium",
            "GasEstimateFeeCap",
            "MpoolPush",
            "StateWaitMsg",
        ]
    );

    let pushed = executor.gateway().pushed();
    assert_eq!(pushed.len(), 1);
    let message = &pushed[0].message;
    assert_eq!(message.from, from);
    assert_eq!(message.to, Address::new_id(1001));
    assert_eq!(message.method, METHOD_SEND);
    assert_eq!(message.nonce, 7);
    assert_eq!(message.value, fil("1.5"));
    assert!(message.params.is_empty());

    let ExecutionOutcome::Confirmed(receipt) = outcome else {
        panic!("expected a confirmed message");
    };
    assert_eq!(receipt.operation, OperationKind::Transfer);
    assert_eq!(receipt.cid, pushed[0].cid().unwrap());
    assert_eq!(receipt.nonce, 7);
    assert_eq!(receipt.value, fil("1.5"));
    assert_eq!(receipt.height, 1_000);
    assert_eq!(receipt.gas_used, GAS_USED);
}

#[tokio::test]
async fn test_signature_verifies_against_sender() {
    for sig_type in [SignatureType::Secp256k1, SignatureType::Bls] {
        let executor = executor();
        let from = executor.vault().add_key(sig_type);

        executor
            .execute(OperationRequest::Transfer(transfer(&from, "f01001", "0.1")))
            .await
            .unwrap();

        let signed = &executor.gateway().pushed()[0];
        assert_eq!(signed.signature.sig_type, sig_type);
        let payload = signed.message.signing_bytes().unwrap();
        filsign_crypto::verify(&from, &signed.signature, &payload).unwrap();
    }
}

#[tokio::test]
async fn test_gas_fields_are_estimated_and_overestimated() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);

    executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1")))
        .await
        .unwrap();

    let message = &executor.gateway().pushed()[0].message;
    assert_eq!(message.gas_limit, ESTIMATED_GAS_LIMIT * 3 / 2);
    assert_eq!(message.gas_premium, TokenAmount::from(100_u64));
    assert_eq!(message.gas_fee_cap, TokenAmount::from(200_u64));
}

#[tokio::test]
async fn test_fee_cap_failure_is_not_fatal() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    executor.gateway().update(|s| s.fail_fee_cap = true);

    let result = executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1")))
        .await;

    assert!(result.is_ok());
    assert!(executor.gateway().called("GasEstimateFeeCap"));
    let message = &executor.gateway().pushed()[0].message;
    assert!(message.gas_fee_cap.is_zero());
    assert_eq!(message.gas_premium, TokenAmount::from(100_u64));
}

#[tokio::test]
async fn test_fee_cap_estimate_skipped_when_already_set() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    executor
        .gateway()
        .update(|s| s.message_fee_cap = TokenAmount::from(300_u64));

    executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1")))
        .await
        .unwrap();

    assert!(!executor.gateway().called("GasEstimateFeeCap"));
    let message = &executor.gateway().pushed()[0].message;
    assert_eq!(message.gas_fee_cap, TokenAmount::from(300_u64));
}

#[tokio::test]
async fn test_fee_ceiling_bounds_fee_cap_and_premium() {
    // 1.5M gas at 200 attoFIL is 300M attoFIL, twice the ceiling
    let executor = Executor::new(
        MockNode::new(),
        RecordingVault::new(),
        GasEstimator::new(TokenAmount::from(150_000_000_u64)),
    );
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    executor
        .gateway()
        .update(|s| s.premium = TokenAmount::from(150_u64));

    executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1")))
        .await
        .unwrap();

    let message = &executor.gateway().pushed()[0].message;
    assert_eq!(message.gas_fee_cap, TokenAmount::from(100_u64));
    assert_eq!(message.gas_premium, TokenAmount::from(100_u64));
    assert!(message.max_fee() <= TokenAmount::from(150_000_000_u64));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_missing_key_fails_before_push() {
    let executor = executor();
    let (_, stranger) = generate_key(SignatureType::Secp256k1);

    let err = executor
        .execute(OperationRequest::Transfer(transfer(&stranger, "f01001", "1")))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), ExecutionErrorKind::KeyNotFound { address } if *address == stranger.to_string()));
    assert!(!err.is_refusal());
    assert!(!executor.gateway().called("MpoolPush"));
    assert_eq!(executor.vault().get_calls(), 0);
}

#[tokio::test]
async fn test_malformed_request_never_reaches_node() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);

    for (to, amount) in [("not-an-address", "1"), ("f01001", "1.2.3"), ("f01001", "-1")] {
        let err = executor
            .execute(OperationRequest::Transfer(transfer(&from, to, amount)))
            .await
            .unwrap_err();
        assert!(
            matches!(err.kind(), ExecutionErrorKind::Validation(_)),
            "{to} {amount}: {err}"
        );
    }
    assert!(executor.gateway().calls().is_empty());
    assert_eq!(executor.vault().lookups(), 0);
}

#[tokio::test]
async fn test_nonzero_exit_code_fails_after_push() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    executor.gateway().update(|s| s.exit_code = 16);

    let err = executor
        .execute(OperationRequest::Transfer(transfer(&from, "f01001", "1")))
        .await
        .unwrap_err();

    let pushed = executor.gateway().pushed();
    assert_eq!(pushed.len(), 1);
    match err.kind() {
        ExecutionErrorKind::ExecutionFailed { cid, exit_code } => {
            assert_eq!(*exit_code, 16);
            assert_eq!(*cid, pushed[0].cid().unwrap().to_string());
        }
        other => panic!("expected ExecutionFailed, got {other:?}"),
    }
    assert_eq!(err.operation(), OperationKind::Transfer);
    assert_eq!(err.amount(), Some("1"));
}

// ============================================================================
// Batches
// ============================================================================

#[tokio::test]
async fn test_batch_runs_in_order_with_fresh_nonces() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request = BatchTransferRequest {
        items: vec![
            transfer(&from, "f01001", "1"),
            transfer(&from, "f01002", "2"),
            transfer(&from, "f01003", "3"),
        ],
    };

    let outcome = executor
        .execute(OperationRequest::BatchTransfer(request))
        .await
        .unwrap();

    let ExecutionOutcome::Batch(receipts) = outcome else {
        panic!("expected a batch outcome");
    };
    assert_eq!(receipts.len(), 3);
    for (i, receipt) in receipts.iter().enumerate() {
        assert_eq!(receipt.nonce, i as u64);
        assert_eq!(receipt.to, Address::new_id(1001 + i as u64));
    }
}

#[tokio::test]
async fn test_batch_halts_at_failing_item() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request = BatchTransferRequest {
        items: vec![
            transfer(&from, "f01001", "1"),
            transfer(&from, "not-an-address", "2"),
            transfer(&from, "f01003", "3"),
        ],
    };

    let mut reported = Vec::new();
    let err = executor
        .batch_transfer(&request, |index, receipt| {
            reported.push((index, receipt.to));
        })
        .await
        .unwrap_err();

    assert_eq!(reported, vec![(1, Address::new_id(1001))]);
    match err.kind() {
        ExecutionErrorKind::BatchItemFailed { index, source } => {
            assert_eq!(*index, 2);
            assert!(matches!(source.kind(), ExecutionErrorKind::Validation(_)));
        }
        other => panic!("expected BatchItemFailed, got {other:?}"),
    }

    // item 3 was never attempted
    let pushed = executor.gateway().pushed();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].message.to, Address::new_id(1001));
}

#[tokio::test]
async fn test_batch_failure_keeps_refusal_classification() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let (_, stranger) = generate_key(SignatureType::Secp256k1);
    let request = BatchTransferRequest {
        items: vec![
            transfer(&from, "f01001", "1"),
            transfer(&stranger, "f01002", "1"),
        ],
    };

    let err = executor
        .execute(OperationRequest::BatchTransfer(request))
        .await
        .unwrap_err();

    assert!(matches!(
        err.root_kind(),
        ExecutionErrorKind::KeyNotFound { .. }
    ));
    assert!(!err.is_refusal());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let executor = executor();

    let err = executor
        .execute(OperationRequest::BatchTransfer(BatchTransferRequest {
            items: Vec::new(),
        }))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), ExecutionErrorKind::Validation(_)));
    assert!(executor.gateway().calls().is_empty());
}
