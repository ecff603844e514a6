//! # Actor Info Command
//!
//! `filsign actor info <MINER>` prints the miner's withdrawable balance, its
//! owner, worker and control addresses with their key addresses and
//! balances, and any pending worker or owner change.
//!
//! The signing `actor` subcommands go through
//! [`ExecuteCommand`](super::ExecuteCommand).

use std::io::{self, Write};

use filsign_chain::{Address, MinerInfo};

use super::{write_table, CommandContext, CommandError};
use crate::executor::request::parse_address;
use crate::gateway::NodeGateway;

/// `filsign actor info`.
#[derive(Debug, Clone)]
pub struct ActorInfoCommand {
    miner: String,
}

impl ActorInfoCommand {
    /// Create a new info command.
    #[must_use]
    pub fn new(miner: impl Into<String>) -> Self {
        Self {
            miner: miner.into(),
        }
    }

    /// Query the node and print the summary. The vault is not opened.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed address or if the miner info,
    /// available balance or chain head cannot be fetched.
    pub async fn run(&self, ctx: &CommandContext) -> Result<(), CommandError> {
        let node = ctx.node()?;
        self.run_with(&node, &mut io::stdout().lock()).await
    }

    /// [`run`](Self::run) against a node.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run). Failures looking up a single address
    /// are shown in its row instead.
    pub async fn run_with(
        &self,
        node: &impl NodeGateway,
        out: &mut impl Write,
    ) -> Result<(), CommandError> {
        let miner = parse_address(&self.miner)?;
        let info = node.state_miner_info(&miner).await?;
        let available = node.state_miner_available_balance(&miner).await?;
        let head = node.chain_head().await?;

        writeln!(out, "Miner:     {miner}")?;
        writeln!(out, "Available: {available}")?;
        writeln!(out)?;

        let mut rows = vec![
            address_row(node, "owner", &info.owner, &info).await,
            address_row(node, "worker", &info.worker, &info).await,
        ];
        for (i, control) in info.control_addresses.iter().enumerate() {
            rows.push(address_row(node, &format!("control-{i}"), control, &info).await);
        }
        write_table(out, &["Name", "ID", "Key", "Use", "Balance"], &rows)?;

        if let Some(new_worker) = &info.new_worker {
            writeln!(out)?;
            let status = if head.height >= info.worker_change_epoch {
                "ready to confirm"
            } else {
                "not yet confirmable"
            };
            writeln!(
                out,
                "Pending worker: {new_worker} at epoch {} (chain height {}, {status})",
                info.worker_change_epoch, head.height
            )?;
        }
        if let Some(pending_owner) = &info.pending_owner_address {
            writeln!(out, "Pending owner:  {pending_owner}")?;
        }
        Ok(())
    }
}

async fn address_row(
    node: &impl NodeGateway,
    name: &str,
    address: &Address,
    info: &MinerInfo,
) -> Vec<String> {
    let key = match node.state_account_key(address).await {
        Ok(key) => key.to_string(),
        Err(err) => {
            tracing::debug!(address = %address, error = %err, "no account key");
            address.to_string()
        }
    };
    let balance = match node.state_get_actor(address).await {
        Ok(actor) => actor.balance.to_string(),
        Err(err) => format!("error: {err}"),
    };

    let mut uses = Vec::new();
    if *address == info.worker {
        uses.push("other");
    }
    if info.control_addresses.contains(address) {
        uses.push("post");
    }

    vec![
        name.to_string(),
        address.to_string(),
        key,
        uses.join(" "),
        balance,
    ]
}
