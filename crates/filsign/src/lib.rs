//! # filsign
//!
//! Custodial Filecoin signing engine.
//!
//! Keys live in an encrypted local vault. Operations are built into
//! messages, priced against the node's gas estimates, signed with the vault
//! key, broadcast, and followed until they are buried under
//! [`gateway::CONFIRMATION_DEPTH`] tipsets.
//!
//! ## Modules
//!
//! - [`executor`] - Runs transfers, batches, miner and market operations
//! - [`gateway`] - The chain node interface and its Lotus JSON-RPC client
//! - [`gas`] - Gas estimation and the fee ceiling
//! - [`audit`] - Tamper-evident log of every broadcast message
//! - [`logging`] - Structured logging setup and security events
//! - [`cli`] - Command-line interface definitions and handlers
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use filsign::executor::{Executor, OperationRequest, TransferRequest};
//! use filsign::gas::GasEstimator;
//! use filsign::gateway::LotusClient;
//! use filsign_crypto::{SqliteKeyVault, VaultContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let vault = SqliteKeyVault::open(
//!     std::path::Path::new("wallet.db"),
//!     Arc::new(VaultContext::from_seed("seed")?),
//! )?;
//! let node = LotusClient::new("http://127.0.0.1:1234/rpc/v0", None)?;
//! let executor = Executor::new(node, vault, GasEstimator::default());
//!
//! let request = OperationRequest::Transfer(TransferRequest::new("f1...", "f01001", "1.5"));
//! executor.execute(request).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod cli;
pub mod executor;
pub mod gas;
pub mod gateway;
pub mod logging;

// Re-export key logging types for convenience
pub use logging::{
    init_logging, log_security_event, new_correlation_id, operation_span, redact_sensitive,
    verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard,
};

pub use executor::{ExecutionOutcome, ExecutionReceipt, Executor, OperationRequest};
