//! Storage miner operations.
//!
//! All of them are signed by the miner's owner. The owner is reported by
//! the node as an ID address and resolved to its key address for signing.

use filsign_chain::params::{
    miner, ChangeOwnerParams, ChangeWorkerAddressParams, MinerWithdrawBalanceParams,
};
use filsign_chain::{Address, Message, TokenAmount};
use filsign_core::error::{ExecutionErrorKind, ExecutionResult};
use filsign_core::OperationKind;
use filsign_crypto::KeyVault;

use super::request::{parse_address, parse_amount};
use super::{
    ChangeOwnerRequest, ChangeWorkerRequest, ConfirmWorkerRequest, ExecutionReceipt, Executor,
    MinerWithdrawRequest, OpContext,
};
use crate::gateway::NodeGateway;

impl<G: NodeGateway, V: KeyVault> Executor<G, V> {
    pub(super) async fn miner_withdraw(
        &self,
        req: &MinerWithdrawRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::MinerWithdraw,
            req.miner.as_str(),
            Some(req.amount.as_str()),
            correlation_id,
        );
        let miner_addr = parse_address(&req.miner).map_err(|e| ctx.fail(e))?;
        let amount = parse_amount(&req.amount).map_err(|e| ctx.fail(e))?;

        let info = self
            .gateway
            .state_miner_info(&miner_addr)
            .await
            .map_err(|e| ctx.fail(e))?;
        let owner = self.account_key(&ctx, &info.owner).await?;

        let available = self
            .gateway
            .state_miner_available_balance(&miner_addr)
            .await
            .map_err(|e| ctx.fail(e))?;
        if amount > available {
            return Err(ctx.fail(ExecutionErrorKind::InsufficientFunds {
                requested: amount.to_string(),
                available: available.to_string(),
            }));
        }

        tracing::info!(miner = %miner_addr, owner = %owner, amount = %amount, "miner withdraw");
        let params = MinerWithdrawBalanceParams { amount }
            .to_cbor()
            .map_err(|e| ctx.fail(e))?;
        let message = Message::new(
            owner,
            miner_addr,
            miner::WITHDRAW_BALANCE,
            TokenAmount::zero(),
            params,
        );
        self.submit(&ctx, message).await
    }

    pub(super) async fn change_owner(
        &self,
        req: &ChangeOwnerRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::MinerChangeOwner,
            req.miner.as_str(),
            None,
            correlation_id,
        );
        let miner_addr = parse_address(&req.miner).map_err(|e| ctx.fail(e))?;
        let new_owner = parse_address(&req.new_owner).map_err(|e| ctx.fail(e))?;
        let from = parse_address(&req.from).map_err(|e| ctx.fail(e))?;

        let new_owner_id = self.lookup_id(&ctx, &new_owner).await?;
        let from_id = self.lookup_id(&ctx, &from).await?;

        let info = self
            .gateway
            .state_miner_info(&miner_addr)
            .await
            .map_err(|e| ctx.fail(e))?;
        if from_id != info.owner && from_id != new_owner_id {
            return Err(ctx.fail(ExecutionErrorKind::Unauthorized {
                reason: format!(
                    "{from} is neither the current owner {} nor the proposed owner {new_owner}",
                    info.owner
                ),
            }));
        }

        let signer = self.account_key(&ctx, &from).await?;
        tracing::info!(
            miner = %miner_addr,
            new_owner = %new_owner_id,
            from = %signer,
            "change owner"
        );
        let params = ChangeOwnerParams {
            new_owner: new_owner_id,
        }
        .to_cbor();
        let message = Message::new(
            signer,
            miner_addr,
            miner::CHANGE_OWNER_ADDRESS,
            TokenAmount::zero(),
            params,
        );
        self.submit(&ctx, message).await
    }

    pub(super) async fn change_worker(
        &self,
        req: &ChangeWorkerRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::MinerChangeWorker,
            req.miner.as_str(),
            None,
            correlation_id,
        );
        let miner_addr = parse_address(&req.miner).map_err(|e| ctx.fail(e))?;
        let requested_worker = req
            .new_worker
            .as_deref()
            .map(parse_address)
            .transpose()
            .map_err(|e| ctx.fail(e))?;
        let requested_controls = req
            .new_control_addresses
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<Vec<Address>, _>>()
            .map_err(|e| ctx.fail(e))?;

        let info = self
            .gateway
            .state_miner_info(&miner_addr)
            .await
            .map_err(|e| ctx.fail(e))?;

        // an empty control list keeps the current set
        let new_worker = requested_worker.unwrap_or(info.worker);
        let new_control_addresses = if requested_controls.is_empty() {
            info.control_addresses.clone()
        } else {
            requested_controls
        };

        let owner = self.account_key(&ctx, &info.owner).await?;
        tracing::info!(
            miner = %miner_addr,
            new_worker = %new_worker,
            controls = new_control_addresses.len(),
            "propose worker change"
        );
        let params = ChangeWorkerAddressParams {
            new_worker,
            new_control_addresses,
        }
        .to_cbor();
        let message = Message::new(
            owner,
            miner_addr,
            miner::CHANGE_WORKER_ADDRESS,
            TokenAmount::zero(),
            params,
        );
        self.submit(&ctx, message).await
    }

    pub(super) async fn confirm_worker(
        &self,
        req: &ConfirmWorkerRequest,
        correlation_id: &str,
    ) -> ExecutionResult<ExecutionReceipt> {
        let ctx = OpContext::new(
            OperationKind::MinerConfirmWorker,
            req.miner.as_str(),
            None,
            correlation_id,
        );
        let miner_addr = parse_address(&req.miner).map_err(|e| ctx.fail(e))?;
        let worker = parse_address(&req.new_worker).map_err(|e| ctx.fail(e))?;

        let info = self
            .gateway
            .state_miner_info(&miner_addr)
            .await
            .map_err(|e| ctx.fail(e))?;
        let worker_id = self.lookup_id(&ctx, &worker).await?;
        if info.new_worker != Some(worker_id) {
            return Err(ctx.fail(ExecutionErrorKind::NoMatchingProposal {
                worker: worker.to_string(),
            }));
        }

        let head = self.gateway.chain_head().await.map_err(|e| ctx.fail(e))?;
        if head.height < info.worker_change_epoch {
            return Err(ctx.fail(ExecutionErrorKind::NotReady {
                height: head.height,
                change_epoch: info.worker_change_epoch,
            }));
        }

        let owner = self.account_key(&ctx, &info.owner).await?;
        tracing::info!(
            miner = %miner_addr,
            worker = %worker_id,
            height = head.height,
            "confirm worker change"
        );
        let message = Message::new(
            owner,
            miner_addr,
            miner::CONFIRM_CHANGE_WORKER_ADDRESS,
            TokenAmount::zero(),
            Vec::new(),
        );
        self.submit(&ctx, message).await
    }
}
