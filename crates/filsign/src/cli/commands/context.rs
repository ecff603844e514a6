//! Shared command setup.
//!
//! Loads and validates configuration once, then builds the vault, the node
//! client and the executor from it on demand. Commands that only touch the
//! vault never contact the node, and commands that only query the node never
//! derive the vault key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use filsign_core::config::Config;
use filsign_core::config_loader::{default_base_dir, expand_path, load_config};
use filsign_crypto::{KdfParams, SqliteKeyVault, VaultContext};

use super::CommandError;
use crate::audit::AuditLogger;
use crate::executor::Executor;
use crate::gas::GasEstimator;
use crate::gateway::{LotusClient, RetryingGateway};

/// The node client commands use.
///
/// Retries are governed by `[lotus] retry_attempts`; zero attempts makes
/// the wrapper pass every call straight through.
pub type NodeClient = RetryingGateway<LotusClient>;

/// Configuration plus the base directory for on-disk state.
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: Config,
    base_dir: PathBuf,
    kdf: KdfParams,
}

impl CommandContext {
    /// Loads configuration following the usual search order and validates
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] if the file cannot be read or the
    /// configuration is invalid, for example without a seed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CommandError> {
        let config = load_config(explicit)?;
        config.validate()?;
        Ok(Self::new(config, default_base_dir()?))
    }

    /// Wraps an already loaded configuration.
    #[must_use]
    pub fn new(config: Config, base_dir: PathBuf) -> Self {
        Self {
            config,
            base_dir,
            kdf: KdfParams::default(),
        }
    }

    /// Overrides the vault key derivation cost.
    #[must_use]
    pub const fn with_kdf_params(mut self, kdf: KdfParams) -> Self {
        self.kdf = kdf;
        self
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Directory holding the audit key and log.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Derives the master key and opens the vault database.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Config`] for an unusable database path and
    /// [`CommandError::Store`] if key derivation or the database fails.
    pub fn open_vault(&self) -> Result<SqliteKeyVault, CommandError> {
        let path = expand_path(&self.config.database.path)?;
        let ctx = VaultContext::with_params(&self.config.security.seed, &self.kdf)?;
        tracing::debug!(path = %path.display(), "opening vault");
        Ok(SqliteKeyVault::open(&path, Arc::new(ctx))?)
    }

    /// Builds the node client.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Gateway`] if the HTTP client cannot be built.
    pub fn node(&self) -> Result<NodeClient, CommandError> {
        let client = LotusClient::from_config(&self.config.lotus)?;
        Ok(RetryingGateway::from_config(client, &self.config.lotus))
    }

    /// Builds an executor that records every broadcast in the audit log.
    ///
    /// # Errors
    ///
    /// Returns the error of whichever component could not be opened.
    pub fn executor(&self) -> Result<Executor<NodeClient, SqliteKeyVault>, CommandError> {
        let gas = GasEstimator::from_config(&self.config.gas)?;
        let audit = AuditLogger::open(&self.base_dir)?;
        Ok(Executor::new(self.node()?, self.open_vault()?, gas).with_sink(Arc::new(audit)))
    }
}
