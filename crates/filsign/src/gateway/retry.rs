//! # Opt-in Retries
//!
//! [`RetryingGateway`] wraps another gateway and repeats calls that failed
//! with a transient error (see
//! [`GatewayError::is_transient`](filsign_core::GatewayError::is_transient)). Attempt `n`
//! waits `n * backoff` first.
//!
//! `MpoolPush` is passed through untouched: a push whose response was lost
//! may still have reached the mpool, and pushing again could double-spend
//! the nonce slot. Callers that construct a plain gateway keep fail-fast
//! behavior.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use filsign_chain::{
    Actor, Address, Cid, MarketBalance, Message, MinerInfo, MsgLookup, SignedMessage, TipSet,
    TokenAmount,
};
use filsign_core::config::LotusConfig;
use filsign_core::error::GatewayResult;

use super::NodeGateway;

/// Gateway wrapper that retries transient failures of read-only calls.
#[derive(Debug, Clone)]
pub struct RetryingGateway<G> {
    inner: G,
    attempts: u32,
    backoff: Duration,
}

impl<G: NodeGateway> RetryingGateway<G> {
    /// Wraps `inner`, allowing `attempts` extra tries per call.
    #[must_use]
    pub const fn new(inner: G, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts,
            backoff,
        }
    }

    /// Wraps `inner` with the `[lotus]` retry settings.
    #[must_use]
    pub const fn from_config(inner: G, config: &LotusConfig) -> Self {
        Self::new(
            inner,
            config.retry_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// The wrapped gateway.
    #[must_use]
    pub const fn inner(&self) -> &G {
        &self.inner
    }

    async fn retry<T, F, Fut>(&self, mut call: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = GatewayResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    attempt += 1;
                    tracing::warn!(
                        method = err.method(),
                        attempt,
                        max_attempts = self.attempts,
                        error = %err,
                        "retrying node call"
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                result => return result,
            }
        }
    }
}

#[async_trait]
impl<G: NodeGateway> NodeGateway for RetryingGateway<G> {
    async fn mpool_get_nonce(&self, address: &Address) -> GatewayResult<u64> {
        self.retry(|| self.inner.mpool_get_nonce(address)).await
    }

    async fn gas_estimate_message_gas(&self, message: &Message) -> GatewayResult<Message> {
        self.retry(|| self.inner.gas_estimate_message_gas(message))
            .await
    }

    async fn gas_estimate_gas_premium(
        &self,
        blocks: u64,
        sender: &Address,
        gas_limit: i64,
    ) -> GatewayResult<TokenAmount> {
        self.retry(|| self.inner.gas_estimate_gas_premium(blocks, sender, gas_limit))
            .await
    }

    async fn gas_estimate_fee_cap(
        &self,
        message: &Message,
        blocks: u64,
    ) -> GatewayResult<TokenAmount> {
        self.retry(|| self.inner.gas_estimate_fee_cap(message, blocks))
            .await
    }

    async fn state_miner_info(&self, miner: &Address) -> GatewayResult<MinerInfo> {
        self.retry(|| self.inner.state_miner_info(miner)).await
    }

    async fn state_miner_available_balance(&self, miner: &Address) -> GatewayResult<TokenAmount> {
        self.retry(|| self.inner.state_miner_available_balance(miner))
            .await
    }

    async fn state_market_balance(&self, address: &Address) -> GatewayResult<MarketBalance> {
        self.retry(|| self.inner.state_market_balance(address))
            .await
    }

    async fn state_account_key(&self, address: &Address) -> GatewayResult<Address> {
        self.retry(|| self.inner.state_account_key(address)).await
    }

    async fn state_lookup_id(&self, address: &Address) -> GatewayResult<Address> {
        self.retry(|| self.inner.state_lookup_id(address)).await
    }

    async fn state_get_actor(&self, address: &Address) -> GatewayResult<Actor> {
        self.retry(|| self.inner.state_get_actor(address)).await
    }

    async fn chain_head(&self) -> GatewayResult<TipSet> {
        self.retry(|| self.inner.chain_head()).await
    }

    async fn mpool_push(&self, message: &SignedMessage) -> GatewayResult<Cid> {
        self.inner.mpool_push(message).await
    }

    async fn state_wait_msg(&self, cid: &Cid, confidence: u64) -> GatewayResult<MsgLookup> {
        self.retry(|| self.inner.state_wait_msg(cid, confidence))
            .await
    }

    async fn wallet_balance(&self, address: &Address) -> GatewayResult<TokenAmount> {
        self.retry(|| self.inner.wallet_balance(address)).await
    }
}
