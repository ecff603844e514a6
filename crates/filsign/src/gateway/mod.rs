//! # Node Gateway
//!
//! The chain queries and broadcast calls the executor makes against a
//! Filecoin node.
//!
//! ## Module Structure
//!
//! - [`protocol`] - JSON-RPC 2.0 request and response envelope
//! - [`lotus`] - [`LotusClient`], the HTTP implementation
//! - [`retry`] - [`RetryingGateway`], opt-in retries for read-only calls
//!
//! Every method is a single round trip. [`NodeGateway::state_wait_msg`]
//! blocks until the node has seen the message buried under the requested
//! number of tipsets; there is no client-side timeout on top of it.

pub mod lotus;
pub mod protocol;
pub mod retry;

use async_trait::async_trait;
use filsign_chain::{
    Actor, Address, Cid, MarketBalance, Message, MinerInfo, MsgLookup, SignedMessage, TipSet,
    TokenAmount,
};
use filsign_core::error::GatewayResult;

pub use lotus::LotusClient;
pub use retry::RetryingGateway;

/// Number of tipsets a message must be buried under before it counts as
/// confirmed.
pub const CONFIRMATION_DEPTH: u64 = 3;

/// Chain node operations used by the executor and the CLI.
#[async_trait]
pub trait NodeGateway: Send + Sync {
    /// Next nonce for `address`, counting pending messages in the mpool.
    async fn mpool_get_nonce(&self, address: &Address) -> GatewayResult<u64>;

    /// The message with gas limit, fee cap and premium filled in.
    async fn gas_estimate_message_gas(&self, message: &Message) -> GatewayResult<Message>;

    /// Premium expected to get a message included within `blocks` blocks.
    async fn gas_estimate_gas_premium(
        &self,
        blocks: u64,
        sender: &Address,
        gas_limit: i64,
    ) -> GatewayResult<TokenAmount>;

    /// Fee cap expected to get `message` included within `blocks` blocks.
    async fn gas_estimate_fee_cap(&self, message: &Message, blocks: u64)
        -> GatewayResult<TokenAmount>;

    /// Owner, worker and control addresses of a miner.
    async fn state_miner_info(&self, miner: &Address) -> GatewayResult<MinerInfo>;

    /// Balance a miner can withdraw now.
    async fn state_miner_available_balance(&self, miner: &Address) -> GatewayResult<TokenAmount>;

    /// Storage market escrow and locked funds of `address`.
    async fn state_market_balance(&self, address: &Address) -> GatewayResult<MarketBalance>;

    /// Key address behind an ID address.
    async fn state_account_key(&self, address: &Address) -> GatewayResult<Address>;

    /// ID address of a key or actor address.
    async fn state_lookup_id(&self, address: &Address) -> GatewayResult<Address>;

    /// On-chain actor state.
    async fn state_get_actor(&self, address: &Address) -> GatewayResult<Actor>;

    /// The current heaviest tipset.
    async fn chain_head(&self) -> GatewayResult<TipSet>;

    /// Adds a signed message to the mpool and returns its CID.
    async fn mpool_push(&self, message: &SignedMessage) -> GatewayResult<Cid>;

    /// Blocks until `cid` is included with `confidence` tipsets on top.
    async fn state_wait_msg(&self, cid: &Cid, confidence: u64) -> GatewayResult<MsgLookup>;

    /// Balance of an account.
    async fn wallet_balance(&self, address: &Address) -> GatewayResult<TokenAmount>;
}
