//! Integration tests for the CLI commands.
//!
//! Commands run against the mock node and an in-memory vault and write to a
//! buffer, so these tests check exactly what a user would see.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]

use std::io::Cursor;
use std::path::PathBuf;

use filsign::cli::commands::{
    ActorInfoCommand, BatchCommand, CommandError, DeleteCommand, ExecuteCommand, ExportCommand,
    ImportCommand, ListCommand, NewCommand, EXIT_ERROR, EXIT_REFUSED,
};
use filsign::cli::ImportFormat;
use filsign::executor::{
    BatchTransferRequest, ExecutionOutcome, MinerWithdrawRequest, OperationRequest,
    TransferRequest,
};
use filsign_chain::Address;
use filsign_core::SignatureType;
use filsign_crypto::KeyVault;

use crate::common::{executor, fil, miner_info, MockNode, RecordingVault};

fn text(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap()
}

// ============================================================================
// Single Operations
// ============================================================================

#[tokio::test]
async fn test_preview_touches_neither_vault_nor_node() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request =
        OperationRequest::Transfer(TransferRequest::new(from.to_string(), "f01001", "1.5"));

    let mut out = Vec::new();
    let outcome = ExecuteCommand::new(request, false)
        .run_with(&executor, &mut out)
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert!(executor.gateway().calls().is_empty());
    assert_eq!(executor.vault().lookups(), 0);
    let text = text(out);
    assert!(text.starts_with("Would run transfer:\n"));
    assert!(text.contains(&format!("  from: {from}\n")));
}

#[tokio::test]
async fn test_send_prints_receipt() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request =
        OperationRequest::Transfer(TransferRequest::new(from.to_string(), "f01001", "1.5"));

    let mut out = Vec::new();
    let outcome = ExecuteCommand::new(request, true)
        .run_with(&executor, &mut out)
        .await
        .unwrap();

    let Some(ExecutionOutcome::Confirmed(receipt)) = outcome else {
        panic!("expected a confirmed message");
    };
    let text = text(out);
    assert!(text.starts_with(&format!(
        "Message {} confirmed at height 1000\n",
        receipt.cid
    )));
    assert!(text.contains("  value:    1.5 FIL\n"));
    assert!(text.contains("  nonce:    0\n"));
}

#[tokio::test]
async fn test_refusal_maps_to_refused_exit_code() {
    let executor = executor();
    executor.gateway().update(|s| {
        s.miner_info = Some(miner_info());
        s.miner_available = fil("1");
    });
    let request = OperationRequest::MinerWithdraw(MinerWithdrawRequest {
        miner: "f01234".to_string(),
        amount: "5".to_string(),
    });

    let err = ExecuteCommand::new(request, true)
        .run_with(&executor, &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CommandError::Execution(_)));
    assert_eq!(err.exit_code(), EXIT_REFUSED);
}

// ============================================================================
// Batches
// ============================================================================

#[tokio::test]
async fn test_batch_reports_each_item_then_summary() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request = BatchTransferRequest {
        items: vec![
            TransferRequest::new(from.to_string(), "f01001", "1"),
            TransferRequest::new(from.to_string(), "f01002", "0.25"),
        ],
    };

    let mut out = Vec::new();
    let receipts = BatchCommand::new(PathBuf::from("batch.json"), true)
        .run_with(&executor, &request, &mut out)
        .await
        .unwrap();

    let text = text(out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        format!(
            "1. {from} -> f01001 1 FIL ({}, height 1000)",
            receipts[0].cid
        )
    );
    assert!(lines[1].starts_with(&format!("2. {from} -> f01002 0.25 FIL")));
    assert_eq!(lines[2], "2 transfers confirmed");
}

#[tokio::test]
async fn test_batch_failure_keeps_earlier_output() {
    let executor = executor();
    let from = executor.vault().add_key(SignatureType::Secp256k1);
    let request = BatchTransferRequest {
        items: vec![
            TransferRequest::new(from.to_string(), "f01001", "1"),
            TransferRequest::new(from.to_string(), "f01002", "one"),
        ],
    };

    let mut out = Vec::new();
    let err = BatchCommand::new(PathBuf::from("batch.json"), true)
        .run_with(&executor, &request, &mut out)
        .await
        .unwrap_err();

    let text = text(out);
    assert!(text.starts_with("1. "));
    assert!(!text.contains("transfers confirmed"));
    assert_eq!(err.exit_code(), EXIT_ERROR);
    assert!(err.to_string().contains("item 2"), "{err}");
}

#[tokio::test]
async fn test_batch_preview_sends_nothing() {
    let executor = executor();
    let request = BatchTransferRequest {
        items: vec![TransferRequest::new("f1abc", "f01001", "1")],
    };

    let mut out = Vec::new();
    let receipts = BatchCommand::new(PathBuf::from("batch.json"), false)
        .run_with(&executor, &request, &mut out)
        .await
        .unwrap();

    assert!(receipts.is_empty());
    assert!(executor.gateway().calls().is_empty());
    assert!(text(out).starts_with("Would run 1 transfers in order:"));
}

// ============================================================================
// Wallet
// ============================================================================

#[test]
fn test_export_then_import_into_another_vault() {
    let source = RecordingVault::new();
    let address = NewCommand::new(SignatureType::Bls)
        .run_with(&source, &mut Vec::new())
        .unwrap();

    let mut exported = Vec::new();
    ExportCommand::new(address.to_string())
        .run_with(&source, &mut exported)
        .unwrap();

    let target = RecordingVault::new();
    let mut out = Vec::new();
    let imported = ImportCommand::new(ImportFormat::HexLotus, None)
        .run_with(&target, &exported, &mut out)
        .unwrap();

    assert_eq!(imported, address);
    assert_eq!(text(out), format!("imported key {address}\n"));
    assert_eq!(
        target.get(&address).unwrap(),
        source.get(&address).unwrap()
    );
}

#[test]
fn test_declined_delete_keeps_key() {
    let vault = RecordingVault::new();
    let address = vault.add_key(SignatureType::Secp256k1);

    let mut out = Vec::new();
    let deleted = DeleteCommand::new(address.to_string(), false)
        .run_with(&vault, &mut Cursor::new(b"no\n".to_vec()), &mut out)
        .unwrap();

    assert!(!deleted);
    assert!(vault.has(&address));
    assert!(text(out).ends_with("Cancelled\n"));

    let deleted = DeleteCommand::new(address.to_string(), false)
        .run_with(&vault, &mut Cursor::new(b"yes\n".to_vec()), &mut Vec::new())
        .unwrap();
    assert!(deleted);
    assert!(!vault.has(&address));
}

#[tokio::test]
async fn test_list_shows_unfunded_keys_as_zero() {
    let vault = RecordingVault::new();
    let funded = vault.add_key(SignatureType::Secp256k1);
    let unfunded = vault.add_key(SignatureType::Bls);
    let node = MockNode::new();
    node.update(|s| {
        s.balances.insert(funded, fil("2"));
        s.nonces.insert(funded, 4);
    });

    let mut out = Vec::new();
    ListCommand::new(false)
        .run_with(&vault, &node, &mut out)
        .await
        .unwrap();

    let text = text(out);
    let row = |address: &Address| {
        text.lines()
            .find(|l| l.starts_with(&address.to_string()))
            .unwrap()
            .to_string()
    };
    assert!(text.starts_with("Address"));
    let funded_row = row(&funded);
    assert!(funded_row.contains("2 FIL"));
    assert!(funded_row.ends_with('4'));
    let unfunded_row = row(&unfunded);
    assert!(unfunded_row.contains("0 FIL"));
    assert!(unfunded_row.ends_with('0'));
}

// ============================================================================
// Actor Info
// ============================================================================

#[tokio::test]
async fn test_actor_info_resolves_keys_and_pending_owner() {
    let node = MockNode::new();
    let owner_key = RecordingVault::new().add_key(SignatureType::Secp256k1);
    node.add_account(Address::new_id(1001), owner_key);
    node.update(|s| {
        let mut info = miner_info();
        info.pending_owner_address = Some(Address::new_id(1005));
        s.miner_info = Some(info);
        s.miner_available = fil("3");
        s.balances.insert(Address::new_id(1001), fil("1"));
    });

    let mut out = Vec::new();
    ActorInfoCommand::new("f01234")
        .run_with(&node, &mut out)
        .await
        .unwrap();

    let text = text(out);
    assert!(text.contains("Available: 3 FIL"));
    let owner_row = text.lines().find(|l| l.starts_with("owner")).unwrap();
    assert!(owner_row.contains(&owner_key.to_string()));
    assert!(owner_row.ends_with("1 FIL"));
    let worker_row = text.lines().find(|l| l.starts_with("worker")).unwrap();
    assert!(worker_row.contains("error:"));
    assert!(text.contains("Pending owner:  f01005"));
    assert!(!text.contains("Pending worker"));
}
