//! Integration tests for the audit trail.
//!
//! These tests verify that:
//! - Every broadcast message gets one chained entry
//! - Refused operations leave no entry
//! - A failing sink never fails an operation that already broadcast
//! - Pre-signed messages are audited without touching the vault

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use filsign::audit::{AuditEntry, AuditError, AuditLogger, SignEvent, SignEventSink};
use filsign::executor::{
    ExecutionOutcome, MinerWithdrawRequest, MpoolPushRequest, OperationRequest, TransferRequest,
};
use filsign_chain::{Address, Message, SignedMessage};
use filsign_core::{OperationKind, SignatureType};
use filsign_crypto::generate_key;
use tempfile::TempDir;

use crate::common::{executor, fil, miner_info, temp_data_dir};

fn read_entries(logger: &AuditLogger) -> Vec<AuditEntry> {
    let Ok(content) = fs::read_to_string(logger.log_path()) else {
        return Vec::new();
    };
    content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn open_logger(dir: &TempDir) -> Arc<AuditLogger> {
    Arc::new(AuditLogger::open(dir.path()).unwrap())
}

#[tokio::test]
async fn test_each_broadcast_is_chained() {
    let dir = temp_data_dir();
    let logger = open_logger(&dir);
    let executor = executor().with_sink(logger.clone());
    let from = executor.vault().add_key(SignatureType::Secp256k1);

    let mut cids = Vec::new();
    for amount in ["1", "2"] {
        let outcome = executor
            .execute(OperationRequest::Transfer(TransferRequest::new(
                from.to_string(),
                "f01001",
                amount,
            )))
            .await
            .unwrap();
        let ExecutionOutcome::Confirmed(receipt) = outcome else {
            panic!("expected a confirmed message");
        };
        cids.push(receipt.cid.to_string());
    }

    let entries = read_entries(&logger);
    assert_eq!(entries.len(), 2);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.seq, i as u64);
        assert_eq!(entry.cid, cids[i]);
        assert_eq!(entry.nonce, i as u64);
        assert_eq!(entry.from, from.to_string());
        assert_eq!(entry.to, "f01001");
        assert_eq!(entry.operation, "transfer");
        assert_eq!(entry.sig_type, "secp256k1");
    }
    assert_ne!(entries[0].correlation_id, entries[1].correlation_id);

    let report = logger.verify_chain().unwrap();
    assert!(report.is_valid());
    assert_eq!(report.entries_checked, 2);
}

#[tokio::test]
async fn test_refused_operation_is_not_audited() {
    let dir = temp_data_dir();
    let logger = open_logger(&dir);
    let executor = executor().with_sink(logger.clone());
    executor.gateway().update(|s| {
        s.miner_info = Some(miner_info());
        s.miner_available = fil("1");
    });

    let result = executor
        .execute(OperationRequest::MinerWithdraw(MinerWithdrawRequest {
            miner: "f01234".to_string(),
            amount: "2".to_string(),
        }))
        .await;

    assert!(result.is_err());
    assert!(read_entries(&logger).is_empty());
    assert_eq!(logger.verify_chain().unwrap().entries_checked, 0);
}

/// A sink that always fails.
struct BrokenSink {
    attempts: AtomicU32,
}

impl SignEventSink for BrokenSink {
    fn record(&self, _event: &SignEvent) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::Io(std::io::Error::other("disk full")))
    }
}

#[tokio::test]
async fn test_failing_sink_does_not_fail_operation() {
    let sink = Arc::new(BrokenSink {
        attempts: AtomicU32::new(0),
    });
    let executor = executor().with_sink(sink.clone());
    let from = executor.vault().add_key(SignatureType::Bls);

    let outcome = executor
        .execute(OperationRequest::Transfer(TransferRequest::new(
            from.to_string(),
            "f01001",
            "1",
        )))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pushed_message_is_audited_without_vault() {
    let dir = temp_data_dir();
    let logger = open_logger(&dir);
    let executor = executor().with_sink(logger.clone());

    let (key_info, from) = generate_key(SignatureType::Secp256k1);
    let mut message = Message::new(from, Address::new_id(1001), 0, fil("0.5"), Vec::new());
    message.nonce = 3;
    message.gas_limit = 1_000_000;
    let signature = filsign_crypto::sign(&key_info, &message.signing_bytes().unwrap()).unwrap();
    let signed = SignedMessage::new(message, signature);
    let request = MpoolPushRequest {
        message: hex::encode(signed.to_cbor().unwrap()),
    };

    let outcome = executor
        .execute(OperationRequest::MpoolPush(request))
        .await
        .unwrap();

    let expected_cid = signed.cid().unwrap();
    assert_eq!(outcome, ExecutionOutcome::Pushed(expected_cid.clone()));
    assert_eq!(executor.gateway().calls(), vec!["MpoolPush"]);
    assert_eq!(executor.vault().lookups(), 0);

    let entries = read_entries(&logger);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, OperationKind::MpoolPush.as_str());
    assert_eq!(entries[0].cid, expected_cid.to_string());
    assert_eq!(entries[0].nonce, 3);
}

#[tokio::test]
async fn test_malformed_push_is_rejected() {
    let executor = executor();

    for message in ["zz", "deadbeef"] {
        let result = executor
            .execute(OperationRequest::MpoolPush(MpoolPushRequest {
                message: message.to_string(),
            }))
            .await;
        assert!(result.is_err(), "{message}");
    }
    assert!(executor.gateway().calls().is_empty());
}
