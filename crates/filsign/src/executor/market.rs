//! Storage market escrow withdrawal.

use filsign_chain::params::{market, storage_market_actor, MarketWithdrawBalanceParams};
use filsign_chain::{Message, TokenAmount};
use filsign_core::error::{ExecutionErrorKind, ExecutionResult};
use filsign_core::OperationKind;
use filsign_crypto::KeyVault;

use super::request::{parse_address, parse_amount};
use super::{ExecutionReceipt, Executor, MarketWithdrawRequest, OpContext};
use crate::gateway::NodeGateway;

impl<G: NodeGateway, V: KeyVault> Executor<G, V> {
    /// The escrow holder may be given in either form. The market actor is
    /// addressed with the ID form and the message is signed by the key form.
    pub(super) async fn market_withdraw(
        &self,
        req: &MarketWithdrawRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::MarketWithdraw,
            req.address.as_str(),
            Some(req.amount.as_str()),
            correlation_id,
        );
        let address = parse_address(&req.address).map_err(|e| ctx.fail(e))?;
        let amount = parse_amount(&req.amount).map_err(|e| ctx.fail(e))?;

        let id_addr = self.lookup_id(&ctx, &address).await?;
        let sign_addr = self.account_key(&ctx, &address).await?;

        let balance = self
            .gateway
            .state_market_balance(&id_addr)
            .await
            .map_err(|e| ctx.fail(e))?;
        let available = balance.available();
        if amount > available {
            return Err(ctx.fail(ExecutionErrorKind::InsufficientFunds {
                requested: amount.to_string(),
                available: available.to_string(),
            }));
        }

        tracing::info!(
            address = %id_addr,
            signer = %sign_addr,
            amount = %amount,
            "market withdraw"
        );
        let params = MarketWithdrawBalanceParams {
            provider_or_client: id_addr,
            amount,
        }
        .to_cbor()
        .map_err(|e| ctx.fail(e))?;
        let message = Message::new(
            sign_addr,
            storage_market_actor(),
            market::WITHDRAW_BALANCE,
            TokenAmount::zero(),
            params,
        );
        self.submit(&ctx, message).await
    }
}
