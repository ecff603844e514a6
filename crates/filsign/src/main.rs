//! # filsign
//!
//! Custodial Filecoin signing engine.
//!
//! ## Usage
//!
//! ```bash
//! # Create a key
//! filsign wallet new bls
//!
//! # Preview, then send 1.5 FIL
//! filsign send --from f1... f01001 1.5
//! filsign send --from f1... f01001 1.5 --really-do-it
//!
//! # Withdraw miner balance to the owner
//! filsign withdraw f01234 100 --really-do-it
//!
//! # Show miner addresses
//! filsign actor info f01234
//!
//! # First run: write ~/.filsign/config.toml
//! filsign config init
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::future::Future;

use clap::Parser;
use filsign::cli::commands::{
    ActorInfoCommand, BalanceCommand, BatchCommand, CommandContext, CommandError, ConfigCommand,
    DeleteCommand, ExecuteCommand, ExportCommand, ImportCommand, ListCommand, NewCommand,
    EXIT_ERROR,
};
use filsign::cli::{ActorCommands, Cli, Commands, MarketCommands, MpoolCommands, WalletCommands};
use filsign::executor::{
    ChangeOwnerRequest, ChangeWorkerRequest, ConfirmWorkerRequest, MarketWithdrawRequest,
    MinerWithdrawRequest, MpoolPushRequest, OperationRequest, TransferRequest,
};
use filsign::logging::{init_logging, redact_sensitive, LogConfig};

/// Main entry point for filsign.
fn main() {
    let cli = Cli::parse();

    // needs no seed, so it must not go through CommandContext::load
    if let Commands::Config { action } = cli.command {
        if let Err(e) = ConfigCommand::new(action).run() {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
        return;
    }

    let ctx = match CommandContext::load(cli.config.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let guard = match LogConfig::from_settings(&ctx.config().logging, cli.verbose)
        .and_then(|config| init_logging(&config))
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };
    tracing::debug!(
        log_file = guard.writes_file(),
        host = %ctx.config().lotus.host,
        token = %redact_sensitive(&ctx.config().lotus.token),
        "configuration loaded"
    );

    let result = match cli.command {
        Commands::Wallet { command } => handle_wallet(&ctx, command),
        Commands::Send(args) => {
            let request =
                OperationRequest::Transfer(TransferRequest::new(args.from, args.to, args.amount));
            block_on(ExecuteCommand::new(request, args.really_do_it).run(&ctx))
        }
        Commands::Batch(args) => {
            block_on(BatchCommand::new(args.file, args.really_do_it).run(&ctx))
        }
        Commands::Mpool {
            command: MpoolCommands::Push { message },
        } => {
            // broadcasting a message signed elsewhere signs nothing here
            let request = OperationRequest::MpoolPush(MpoolPushRequest { message });
            block_on(ExecuteCommand::new(request, true).run(&ctx))
        }
        Commands::Withdraw(args) => {
            let request = OperationRequest::MinerWithdraw(MinerWithdrawRequest {
                miner: args.miner,
                amount: args.amount,
            });
            block_on(ExecuteCommand::new(request, args.really_do_it).run(&ctx))
        }
        Commands::Market {
            command:
                MarketCommands::Withdraw {
                    address,
                    amount,
                    really_do_it,
                },
        } => {
            let request =
                OperationRequest::MarketWithdraw(MarketWithdrawRequest { address, amount });
            block_on(ExecuteCommand::new(request, really_do_it).run(&ctx))
        }
        Commands::Actor { command } => handle_actor(&ctx, command),
        Commands::Config { action } => ConfigCommand::new(action).run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Handle wallet subcommands.
fn handle_wallet(ctx: &CommandContext, command: WalletCommands) -> Result<(), CommandError> {
    match command {
        WalletCommands::New { key_type } => NewCommand::new(key_type.into()).run(ctx).map(|_| ()),
        WalletCommands::List { details } => block_on(ListCommand::new(details).run(ctx)),
        WalletCommands::Export { address } => ExportCommand::new(address).run(ctx),
        WalletCommands::Import(args) => ImportCommand::new(args.format, args.input)
            .run(ctx)
            .map(|_| ()),
        WalletCommands::Balance { address } => block_on(BalanceCommand::new(address).run(ctx)),
        WalletCommands::Delete { address, force } => {
            DeleteCommand::new(address, force).run(ctx).map(|_| ())
        }
    }
}

/// Handle actor subcommands.
fn handle_actor(ctx: &CommandContext, command: ActorCommands) -> Result<(), CommandError> {
    let (request, really_do_it) = match command {
        ActorCommands::Info { miner } => return block_on(ActorInfoCommand::new(miner).run(ctx)),
        ActorCommands::SetOwner {
            miner,
            new_owner,
            from,
            really_do_it,
        } => (
            OperationRequest::MinerChangeOwner(ChangeOwnerRequest {
                miner,
                new_owner,
                from,
            }),
            really_do_it,
        ),
        ActorCommands::ProposeChangeWorker {
            miner,
            worker,
            control,
            really_do_it,
        } => (
            OperationRequest::MinerChangeWorker(ChangeWorkerRequest {
                miner,
                new_worker: worker,
                new_control_addresses: (!control.is_empty()).then_some(control),
            }),
            really_do_it,
        ),
        ActorCommands::ConfirmChangeWorker {
            miner,
            worker,
            really_do_it,
        } => (
            OperationRequest::MinerConfirmWorker(ConfirmWorkerRequest {
                miner,
                new_worker: worker,
            }),
            really_do_it,
        ),
    };
    block_on(ExecuteCommand::new(request, really_do_it).run(ctx))
}

/// Drive an async command to completion on a fresh runtime.
fn block_on<F>(future: F) -> Result<(), CommandError>
where
    F: Future<Output = Result<(), CommandError>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}
