//! # Lotus JSON-RPC Client
//!
//! [`LotusClient`] speaks JSON-RPC 2.0 over HTTP POST to a Lotus node.
//! State queries run against the current head, which Lotus expresses as a
//! `null` tipset key argument.
//!
//! ```no_run
//! use filsign::gateway::{LotusClient, NodeGateway};
//!
//! # async fn run() -> Result<(), filsign_core::GatewayError> {
//! let client = LotusClient::new("http://127.0.0.1:1234/rpc/v0", None)?;
//! let head = client.chain_head().await?;
//! println!("height {}", head.height);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use filsign_chain::{
    Actor, Address, Cid, MarketBalance, Message, MinerInfo, MsgLookup, SignedMessage, TipSet,
    TokenAmount,
};
use filsign_core::config::LotusConfig;
use filsign_core::error::{GatewayError, GatewayResult};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use super::NodeGateway;

/// Longest response body kept in an HTTP error.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the Lotus API.
#[derive(Clone)]
pub struct LotusClient {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl LotusClient {
    /// Creates a client for `url`, authenticating with `token` when given.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, token: Option<String>) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("filsign/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::transport("client", e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Creates a client from the `[lotus]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &LotusConfig) -> GatewayResult<Self> {
        Self::new(config.host.clone(), Some(config.token.clone()))
    }

    /// The endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> GatewayResult<T> {
        let request = JsonRpcRequest::new(method, params);
        tracing::trace!(method, "lotus request");

        let mut builder = self.http.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::transport(method, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(GatewayError::Http {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::decode(method, e.to_string()))?;
        envelope.into_result(method)
    }
}

impl std::fmt::Debug for LotusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LotusClient")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NodeGateway for LotusClient {
    async fn mpool_get_nonce(&self, address: &Address) -> GatewayResult<u64> {
        self.call("MpoolGetNonce", json!([address])).await
    }

    async fn gas_estimate_message_gas(&self, message: &Message) -> GatewayResult<Message> {
        self.call("GasEstimateMessageGas", json!([message, null, null]))
            .await
    }

    async fn gas_estimate_gas_premium(
        &self,
        blocks: u64,
        sender: &Address,
        gas_limit: i64,
    ) -> GatewayResult<TokenAmount> {
        self.call(
            "GasEstimateGasPremium",
            json!([blocks, sender, gas_limit, null]),
        )
        .await
    }

    async fn gas_estimate_fee_cap(
        &self,
        message: &Message,
        blocks: u64,
    ) -> GatewayResult<TokenAmount> {
        self.call("GasEstimateFeeCap", json!([message, blocks, null]))
            .await
    }

    async fn state_miner_info(&self, miner: &Address) -> GatewayResult<MinerInfo> {
        self.call("StateMinerInfo", json!([miner, null])).await
    }

    async fn state_miner_available_balance(&self, miner: &Address) -> GatewayResult<TokenAmount> {
        self.call("StateMinerAvailableBalance", json!([miner, null]))
            .await
    }

    async fn state_market_balance(&self, address: &Address) -> GatewayResult<MarketBalance> {
        self.call("StateMarketBalance", json!([address, null])).await
    }

    async fn state_account_key(&self, address: &Address) -> GatewayResult<Address> {
        self.call("StateAccountKey", json!([address, null])).await
    }

    async fn state_lookup_id(&self, address: &Address) -> GatewayResult<Address> {
        self.call("StateLookupID", json!([address, null])).await
    }

    async fn state_get_actor(&self, address: &Address) -> GatewayResult<Actor> {
        self.call("StateGetActor", json!([address, null])).await
    }

    async fn chain_head(&self) -> GatewayResult<TipSet> {
        self.call("ChainHead", json!([])).await
    }

    async fn mpool_push(&self, message: &SignedMessage) -> GatewayResult<Cid> {
        self.call("MpoolPush", json!([message])).await
    }

    async fn state_wait_msg(&self, cid: &Cid, confidence: u64) -> GatewayResult<MsgLookup> {
        self.call("StateWaitMsg", json!([cid, confidence])).await
    }

    async fn wallet_balance(&self, address: &Address) -> GatewayResult<TokenAmount> {
        self.call("WalletBalance", json!([address])).await
    }
}
