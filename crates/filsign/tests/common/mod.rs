//! # Test Utilities for filsign
//!
//! Shared fixtures for the integration tests.
//!
//! - [`MockNode`] - an in-process [`NodeGateway`] with scriptable chain state
//! - [`RecordingVault`] - an in-memory vault that counts key lookups
//! - [`executor`] - an executor over both, with default gas settings

#![allow(dead_code)]
// Allow expect() in test utilities since panicking on setup failures is acceptable in tests
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use filsign::executor::Executor;
use filsign::gas::GasEstimator;
use filsign::gateway::NodeGateway;
use filsign_chain::api_types::MessageReceipt;
use filsign_chain::{
    Actor, Address, ChainEpoch, Cid, MarketBalance, Message, MinerInfo, MsgLookup, SignedMessage,
    TipSet, TokenAmount,
};
use filsign_core::error::{GatewayError, GatewayResult, StoreError};
use filsign_core::SignatureType;
use filsign_crypto::{generate_key, KdfParams, KeyInfo, KeyVault, SqliteKeyVault, StoredKey, VaultContext};
use tempfile::TempDir;

/// Any well-formed CID; the mock never resolves it.
pub const TEST_CID: &str = "bafy2bzacebzxqimg5ynjfn57rdez64efajalcvdixus477neykvqjbthvnuig";

/// Gas limit the mock reports before overestimation.
pub const ESTIMATED_GAS_LIMIT: i64 = 1_000_000;

/// Gas the mock reports as used by every included message.
pub const GAS_USED: i64 = 654_321;

/// Create an isolated temporary directory for test data.
pub fn temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

// ============================================================================
// Mock Node
// ============================================================================

/// Chain state served by [`MockNode`].
#[derive(Debug)]
pub struct NodeState {
    /// Next nonce per sender; bumped by every push.
    pub nonces: HashMap<Address, u64>,
    /// Balances reported by `StateGetActor` and `WalletBalance`.
    pub balances: HashMap<Address, TokenAmount>,
    /// Key address to ID address.
    pub ids: HashMap<Address, Address>,
    /// ID address to key address.
    pub keys: HashMap<Address, Address>,
    /// Reported for every miner; `None` means the miner does not exist.
    pub miner_info: Option<MinerInfo>,
    /// Withdrawable miner balance.
    pub miner_available: TokenAmount,
    /// Market escrow of every address.
    pub market: MarketBalance,
    /// Current chain height, also the inclusion height of every message.
    pub head_height: ChainEpoch,
    /// Exit code of every included message.
    pub exit_code: i64,
    /// Fee cap returned alongside the gas limit estimate.
    pub message_fee_cap: TokenAmount,
    /// Result of `GasEstimateGasPremium`.
    pub premium: TokenAmount,
    /// Result of `GasEstimateFeeCap`.
    pub fee_cap: TokenAmount,
    /// Makes `GasEstimateFeeCap` fail.
    pub fail_fee_cap: bool,
    /// Messages accepted by `MpoolPush`, in order.
    pub pushed: Vec<SignedMessage>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            nonces: HashMap::new(),
            balances: HashMap::new(),
            ids: HashMap::new(),
            keys: HashMap::new(),
            miner_info: None,
            miner_available: TokenAmount::zero(),
            market: MarketBalance {
                escrow: TokenAmount::zero(),
                locked: TokenAmount::zero(),
            },
            head_height: 1_000,
            exit_code: 0,
            message_fee_cap: TokenAmount::zero(),
            premium: TokenAmount::from(100_u64),
            fee_cap: TokenAmount::from(200_u64),
            fail_fee_cap: false,
            pushed: Vec::new(),
        }
    }
}

/// An in-process chain node.
///
/// Every call is logged by its Lotus method name so tests can assert what
/// reached the node and in which order.
#[derive(Debug, Default)]
pub struct MockNode {
    state: Mutex<NodeState>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit the chain state.
    pub fn update(&self, f: impl FnOnce(&mut NodeState)) {
        f(&mut self.state.lock().expect("node state poisoned"));
    }

    /// Register `key` as the account behind `id`.
    pub fn add_account(&self, id: Address, key: Address) {
        self.update(|state| {
            state.ids.insert(key, id);
            state.keys.insert(id, key);
        });
    }

    /// Lotus method names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    /// Whether `method` was called at all.
    pub fn called(&self, method: &str) -> bool {
        self.calls().iter().any(|m| *m == method)
    }

    /// Messages accepted by the mpool.
    pub fn pushed(&self) -> Vec<SignedMessage> {
        self.state.lock().expect("node state poisoned").pushed.clone()
    }

    fn log(&self, method: &'static str) {
        self.calls.lock().expect("call log poisoned").push(method);
    }

    fn read<T>(&self, f: impl FnOnce(&NodeState) -> T) -> T {
        f(&self.state.lock().expect("node state poisoned"))
    }
}

fn not_found(method: &str, address: &Address) -> GatewayError {
    GatewayError::rpc(method, 1, format!("actor not found: {address}"))
}

#[async_trait]
impl NodeGateway for MockNode {
    async fn mpool_get_nonce(&self, address: &Address) -> GatewayResult<u64> {
        self.log("MpoolGetNonce");
        Ok(self.read(|s| s.nonces.get(address).copied().unwrap_or(0)))
    }

    async fn gas_estimate_message_gas(&self, message: &Message) -> GatewayResult<Message> {
        self.log("GasEstimateMessageGas");
        let mut estimated = message.clone();
        self.read(|s| {
            estimated.gas_limit = ESTIMATED_GAS_LIMIT;
            estimated.gas_fee_cap = s.message_fee_cap.clone();
            estimated.gas_premium = TokenAmount::from(1_u64);
        });
        Ok(estimated)
    }

    async fn gas_estimate_gas_premium(
        &self,
        _blocks: u64,
        _sender: &Address,
        _gas_limit: i64,
    ) -> GatewayResult<TokenAmount> {
        self.log("GasEstimateGasPremium");
        Ok(self.read(|s| s.premium.clone()))
    }

    async fn gas_estimate_fee_cap(
        &self,
        _message: &Message,
        _blocks: u64,
    ) -> GatewayResult<TokenAmount> {
        self.log("GasEstimateFeeCap");
        self.read(|s| {
            if s.fail_fee_cap {
                Err(GatewayError::rpc("Filecoin.GasEstimateFeeCap", 1, "estimator offline"))
            } else {
                Ok(s.fee_cap.clone())
            }
        })
    }

    async fn state_miner_info(&self, miner: &Address) -> GatewayResult<MinerInfo> {
        self.log("StateMinerInfo");
        self.read(|s| s.miner_info.clone())
            .ok_or_else(|| not_found("Filecoin.StateMinerInfo", miner))
    }

    async fn state_miner_available_balance(&self, _miner: &Address) -> GatewayResult<TokenAmount> {
        self.log("StateMinerAvailableBalance");
        Ok(self.read(|s| s.miner_available.clone()))
    }

    async fn state_market_balance(&self, _address: &Address) -> GatewayResult<MarketBalance> {
        self.log("StateMarketBalance");
        Ok(self.read(|s| s.market.clone()))
    }

    async fn state_account_key(&self, address: &Address) -> GatewayResult<Address> {
        self.log("StateAccountKey");
        if !address.is_id() {
            return Ok(*address);
        }
        self.read(|s| s.keys.get(address).copied())
            .ok_or_else(|| not_found("Filecoin.StateAccountKey", address))
    }

    async fn state_lookup_id(&self, address: &Address) -> GatewayResult<Address> {
        self.log("StateLookupID");
        if address.is_id() {
            return Ok(*address);
        }
        self.read(|s| s.ids.get(address).copied())
            .ok_or_else(|| not_found("Filecoin.StateLookupID", address))
    }

    async fn state_get_actor(&self, address: &Address) -> GatewayResult<Actor> {
        self.log("StateGetActor");
        let cid: Cid = TEST_CID
            .parse()
            .map_err(|_| GatewayError::decode("Filecoin.StateGetActor", "bad test CID"))?;
        let (nonce, balance) = self.read(|s| {
            (
                s.nonces.get(address).copied().unwrap_or(0),
                s.balances.get(address).cloned(),
            )
        });
        let balance = balance.ok_or_else(|| not_found("Filecoin.StateGetActor", address))?;
        Ok(Actor {
            code: cid.clone(),
            head: cid,
            nonce,
            balance,
        })
    }

    async fn chain_head(&self) -> GatewayResult<TipSet> {
        self.log("ChainHead");
        Ok(TipSet {
            cids: Vec::new(),
            height: self.read(|s| s.head_height),
        })
    }

    async fn mpool_push(&self, message: &SignedMessage) -> GatewayResult<Cid> {
        self.log("MpoolPush");
        let cid = message
            .cid()
            .map_err(|e| GatewayError::decode("Filecoin.MpoolPush", e.to_string()))?;
        self.update(|s| {
            s.nonces
                .insert(message.message.from, message.message.nonce + 1);
            s.pushed.push(message.clone());
        });
        Ok(cid)
    }

    async fn state_wait_msg(&self, cid: &Cid, _confidence: u64) -> GatewayResult<MsgLookup> {
        self.log("StateWaitMsg");
        Ok(self.read(|s| MsgLookup {
            message: cid.clone(),
            receipt: MessageReceipt {
                exit_code: s.exit_code,
                gas_used: GAS_USED,
            },
            height: s.head_height,
        }))
    }

    async fn wallet_balance(&self, address: &Address) -> GatewayResult<TokenAmount> {
        self.log("WalletBalance");
        Ok(self.read(|s| s.balances.get(address).cloned().unwrap_or_else(TokenAmount::zero)))
    }
}

// ============================================================================
// Recording Vault
// ============================================================================

/// An in-memory vault that counts how often keys are looked up.
pub struct RecordingVault {
    inner: SqliteKeyVault,
    has_calls: AtomicUsize,
    get_calls: AtomicUsize,
}

impl RecordingVault {
    pub fn new() -> Self {
        let ctx = VaultContext::with_params("integration test seed", &KdfParams::insecure_for_tests())
            .expect("Failed to derive vault key");
        Self {
            inner: SqliteKeyVault::in_memory(Arc::new(ctx)).expect("Failed to open vault"),
            has_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Generate and store a key, returning its address.
    pub fn add_key(&self, sig_type: SignatureType) -> Address {
        let (key_info, address) = generate_key(sig_type);
        self.inner
            .save(&address, &key_info)
            .expect("Failed to store key");
        address
    }

    /// Number of `has` and `get` calls so far.
    pub fn lookups(&self) -> usize {
        self.has_calls.load(Ordering::SeqCst) + self.get_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

impl KeyVault for RecordingVault {
    fn save(&self, address: &Address, key_info: &KeyInfo) -> Result<(), StoreError> {
        self.inner.save(address, key_info)
    }

    fn get(&self, address: &Address) -> Result<KeyInfo, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(address)
    }

    fn delete(&self, address: &Address) -> Result<(), StoreError> {
        self.inner.delete(address)
    }

    fn list_all(&self) -> Result<Vec<StoredKey>, StoreError> {
        self.inner.list_all()
    }

    fn has(&self, address: &Address) -> bool {
        self.has_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.has(address)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// An executor over a fresh mock node and vault.
pub fn executor() -> Executor<MockNode, RecordingVault> {
    Executor::new(MockNode::new(), RecordingVault::new(), GasEstimator::default())
}

/// Miner `f01234` owned by `f01001`, worker `f01002`, control `f01003`.
pub fn miner_info() -> MinerInfo {
    MinerInfo {
        owner: Address::new_id(1001),
        worker: Address::new_id(1002),
        new_worker: None,
        control_addresses: vec![Address::new_id(1003)],
        worker_change_epoch: -1,
        pending_owner_address: None,
    }
}

/// Parse a FIL amount, panicking on malformed input.
pub fn fil(amount: &str) -> TokenAmount {
    TokenAmount::parse_fil(amount).expect("valid FIL amount")
}
