//! Configuration types for filsign.
//!
//! Configuration is stored in TOML format, by default at `~/.filsign/config.toml`.
//! The seed and the node token may be supplied through the environment instead
//! of the file (see [`Config::apply_env_overrides`]).
//!
//! # Examples
//!
//! ```
//! use filsign_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.lotus.host, "http://127.0.0.1:1234/rpc/v0");
//! assert_eq!(config.gas.premium_blocks, 10);
//!
//! // The default configuration has no seed and is rejected until one is set.
//! assert!(config.validate().is_err());
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [lotus]
//! host = "http://127.0.0.1:1234/rpc/v0"
//! token = ""
//! retry_attempts = 0
//! retry_backoff_ms = 500
//!
//! [security]
//! seed = ""
//!
//! [database]
//! path = "~/.filsign/wallet.db"
//!
//! [gas]
//! max_fee = "10000000000000000000"
//! overestimation = 1.5
//! premium_blocks = 10
//! fee_cap_blocks = 20
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable overriding `security.seed`.
pub const ENV_SEED: &str = "FILSIGN_SEED";

/// Environment variable overriding `lotus.token`.
pub const ENV_LOTUS_TOKEN: &str = "FILSIGN_LOTUS_TOKEN";

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use filsign_core::config::Config;
///
/// let toml_str = r#"
/// [lotus]
/// host = "https://node.example.com/rpc/v1"
///
/// [security]
/// seed = "correct horse battery staple"
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.lotus.host, "https://node.example.com/rpc/v1");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Chain node connection.
    #[serde(default)]
    pub lotus: LotusConfig,

    /// Vault master key material.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Key database location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Gas estimation parameters.
    #[serde(default)]
    pub gas: GasConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LogSettings,
}

fn default_host() -> String {
    "http://127.0.0.1:1234/rpc/v0".to_string()
}

const fn default_retry_backoff_ms() -> u64 {
    500
}

/// Chain node connection settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotusConfig {
    /// JSON-RPC endpoint URL.
    ///
    /// Default: `http://127.0.0.1:1234/rpc/v0`
    #[serde(default = "default_host")]
    pub host: String,

    /// Bearer token sent in the `Authorization` header. Empty means none.
    #[serde(default)]
    pub token: String,

    /// Number of extra attempts for transport failures on read-only calls.
    ///
    /// Default: 0 (fail fast)
    #[serde(default)]
    pub retry_attempts: u32,

    /// Delay between attempts; attempt `n` waits `n * retry_backoff_ms`.
    ///
    /// Default: 500
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for LotusConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            token: String::new(),
            retry_attempts: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl fmt::Debug for LotusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LotusConfig")
            .field("host", &self.host)
            .field("token", &redacted(&self.token))
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// Vault master key material.
///
/// The seed is the only secret in the configuration. It never appears in
/// `Debug` output.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Seed the vault master key is derived from.
    #[serde(default)]
    pub seed: String,
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("seed", &redacted(&self.seed))
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "[REDACTED]"
    }
}

fn default_db_path() -> String {
    "~/.filsign/wallet.db".to_string()
}

/// Key database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `SQLite` database path. Supports `~` expansion.
    ///
    /// Default: `~/.filsign/wallet.db`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_max_fee() -> String {
    // 10 FIL
    "10000000000000000000".to_string()
}

const fn default_overestimation() -> f64 {
    1.5
}

const fn default_premium_blocks() -> u64 {
    10
}

const fn default_fee_cap_blocks() -> u64 {
    20
}

/// Gas estimation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GasConfig {
    /// Ceiling on `gas_limit * gas_fee_cap`, in attoFIL.
    ///
    /// Default: `10000000000000000000` (10 FIL)
    #[serde(default = "default_max_fee")]
    pub max_fee: String,

    /// Multiplier applied to the node's gas limit estimate.
    ///
    /// Default: 1.5
    #[serde(default = "default_overestimation")]
    pub overestimation: f64,

    /// Inclusion target for the gas premium estimate, in blocks.
    #[serde(default = "default_premium_blocks")]
    pub premium_blocks: u64,

    /// Inclusion target for the fee cap estimate, in blocks.
    #[serde(default = "default_fee_cap_blocks")]
    pub fee_cap_blocks: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_fee: default_max_fee(),
            overestimation: default_overestimation(),
            premium_blocks: default_premium_blocks(),
            fee_cap_blocks: default_fee_cap_blocks(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Logging settings as they appear in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSettings {
    /// Minimum level: `trace`, `debug`, `info`, `warn` or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty`, `json` or `compact`.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Optional log file. Output goes to stderr when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Same as [`Config::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks the settings every command needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if `security.seed` is empty.
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - `lotus.host` is empty
    /// - `database.path` is empty
    /// - `gas.max_fee` is not a decimal integer
    /// - `gas.overestimation` is not finite or is below 1.0
    /// - `logging.format` is unknown
    ///
    /// # Examples
    ///
    /// ```
    /// use filsign_core::config::Config;
    ///
    /// let config = Config::builder().seed("s3cret").build();
    /// assert!(config.validate().is_ok());
    ///
    /// let mut invalid = config.clone();
    /// invalid.lotus.host = String::new();
    /// assert!(invalid.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.seed.is_empty() {
            return Err(ConfigError::missing_field("security.seed"));
        }

        if self.lotus.host.is_empty() {
            return Err(ConfigError::invalid_value("lotus.host", "<empty>"));
        }

        if self.database.path.is_empty() {
            return Err(ConfigError::invalid_value("database.path", "<empty>"));
        }

        if self.gas.max_fee.is_empty() || !self.gas.max_fee.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::invalid_value("gas.max_fee", &self.gas.max_fee));
        }

        if !self.gas.overestimation.is_finite() || self.gas.overestimation < 1.0 {
            return Err(ConfigError::invalid_value(
                "gas.overestimation",
                self.gas.overestimation.to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json" | "compact") {
            return Err(ConfigError::invalid_value(
                "logging.format",
                &self.logging.format,
            ));
        }

        Ok(())
    }

    /// Applies `FILSIGN_SEED` and `FILSIGN_LOTUS_TOKEN` from the process
    /// environment. Set variables win over the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(seed) = lookup(ENV_SEED).filter(|v| !v.is_empty()) {
            self.security.seed = seed;
        }
        if let Some(token) = lookup(ENV_LOTUS_TOKEN).filter(|v| !v.is_empty()) {
            self.lotus.token = token;
        }
    }

    /// The commented template written by `filsign config init`.
    ///
    /// # Examples
    ///
    /// ```
    /// use filsign_core::config::Config;
    ///
    /// let toml = Config::default_toml();
    /// assert!(toml.contains("[lotus]"));
    /// assert!(toml.contains("[security]"));
    /// assert!(toml.contains("[gas]"));
    /// ```
    #[must_use]
    pub fn default_toml() -> String {
        r#"[lotus]
host = "http://127.0.0.1:1234/rpc/v0"
token = ""
# Extra attempts for transport failures on read-only calls (0 = fail fast).
retry_attempts = 0
retry_backoff_ms = 500

[security]
# Required. Can also be supplied through FILSIGN_SEED.
seed = ""

[database]
path = "~/.filsign/wallet.db"

[gas]
# Ceiling on gas_limit * gas_fee_cap in attoFIL (10 FIL).
max_fee = "10000000000000000000"
overestimation = 1.5
premium_blocks = 10
fee_cap_blocks = 20

[logging]
level = "info"
format = "pretty"
# file = "~/.filsign/logs/filsign.log"
"#
        .to_string()
    }

    /// Starts a [`ConfigBuilder`] from the defaults.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Fluent construction of a [`Config`], mostly for tests.
///
/// # Examples
///
/// ```
/// use filsign_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .host("http://lotus:1234/rpc/v0")
///     .token("abc")
///     .seed("seed")
///     .database_path("/var/lib/filsign/wallet.db")
///     .build();
///
/// assert_eq!(config.lotus.host, "http://lotus:1234/rpc/v0");
/// assert_eq!(config.database.path, "/var/lib/filsign/wallet.db");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Builder seeded with [`Config::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the node endpoint.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.lotus.host = host.into();
        self
    }

    /// Sets the node bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.lotus.token = token.into();
        self
    }

    /// Sets the number of retry attempts for read-only calls.
    #[must_use]
    pub const fn retry_attempts(mut self, attempts: u32) -> Self {
        self.config.lotus.retry_attempts = attempts;
        self
    }

    /// Sets the vault seed.
    #[must_use]
    pub fn seed(mut self, seed: impl Into<String>) -> Self {
        self.config.security.seed = seed.into();
        self
    }

    /// Sets the key database path.
    #[must_use]
    pub fn database_path(mut self, path: impl Into<String>) -> Self {
        self.config.database.path = path.into();
        self
    }

    /// Sets the fee ceiling in attoFIL.
    #[must_use]
    pub fn max_fee(mut self, max_fee: impl Into<String>) -> Self {
        self.config.gas.max_fee = max_fee.into();
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}
