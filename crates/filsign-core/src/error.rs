//! Error types for the filsign signing engine.
//!
//! Errors are organized by the component that raises them:
//!
//! - [`ValidationError`] - Malformed caller input (addresses, amounts)
//! - [`CodecError`] - Canonical CBOR encoding/decoding failures
//! - [`SignError`] - Key generation and signing failures
//! - [`StoreError`] - Key vault failures
//! - [`GatewayError`] - Chain node transport and RPC failures
//! - [`ConfigError`] - Configuration failures
//! - [`ExecutionError`] - Terminal failure of an executor operation, with
//!   the operation, address and amount it concerned
//! - [`FilsignError`] - Top-level error that wraps all of the above
//!
//! Every component returns the most specific variant it can. Nothing is
//! downgraded to a generic failure on the way up.
//!
//! # Example
//!
//! ```rust
//! use filsign_core::error::{CodecError, FilsignError};
//!
//! fn decode(data: &[u8]) -> Result<(), FilsignError> {
//!     if data.is_empty() {
//!         return Err(CodecError::TruncatedInput.into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(decode(&[]).is_err());
//! ```

use std::fmt;
use std::io;

use crate::types::OperationKind;

/// Top-level error type for filsign.
///
/// Wraps all domain-specific error types with automatic conversion
/// via the `#[from]` attribute.
#[derive(Debug, thiserror::Error)]
pub enum FilsignError {
    /// Caller input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Canonical encoding or decoding failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Signing operation failed.
    #[error("Signing error: {0}")]
    Sign(#[from] SignError),

    /// Key vault operation failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Chain node request failed.
    #[error("Network error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An executor operation failed.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

// ============================================================================
// ValidationError
// ============================================================================

/// Malformed input supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The address string or bytes could not be parsed.
    #[error("invalid address '{input}': {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The amount could not be parsed as a non-negative token amount.
    #[error("invalid amount '{input}': {reason}")]
    InvalidAmount {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Any other malformed field.
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        /// The field that was rejected.
        field: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ValidationError {
    /// Create an invalid address error.
    #[must_use]
    pub fn invalid_address(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid amount error.
    #[must_use]
    pub fn invalid_amount(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// CodecError
// ============================================================================

/// Errors raised by the canonical CBOR codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A byte string exceeds its hard length cap.
    #[error("byte string too large: {len} bytes exceeds limit of {max}")]
    ParamsTooLarge {
        /// Declared or actual length.
        len: u64,
        /// Maximum permitted length.
        max: u64,
    },

    /// The input is structurally invalid (wrong header, field count, type).
    #[error("malformed encoding: {context}")]
    MalformedEncoding {
        /// Description of what was wrong.
        context: String,
    },

    /// The input ended before a complete value was read.
    #[error("truncated input")]
    TruncatedInput,
}

impl CodecError {
    /// Create a malformed encoding error.
    #[must_use]
    pub fn malformed(context: impl Into<String>) -> Self {
        Self::MalformedEncoding {
            context: context.into(),
        }
    }

    /// Create a params-too-large error.
    #[must_use]
    pub const fn params_too_large(len: u64, max: u64) -> Self {
        Self::ParamsTooLarge { len, max }
    }
}

// ============================================================================
// SignError
// ============================================================================

/// Errors raised during key generation, address derivation and signing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    /// The private key is not valid for its algorithm.
    #[error("invalid key material: {context}")]
    InvalidKey {
        /// Why the key was rejected.
        context: String,
    },

    /// The key generation seed is too short.
    #[error("invalid seed: need at least {min} bytes, got {len}")]
    InvalidSeed {
        /// Supplied seed length.
        len: usize,
        /// Minimum seed length.
        min: usize,
    },

    /// The signature or key type tag is not supported.
    #[error("unsupported algorithm: {tag}")]
    UnsupportedAlgorithm {
        /// The unrecognized tag.
        tag: String,
    },

    /// The signing primitive failed.
    #[error("signature failed: {context}")]
    SignatureFailed {
        /// Additional context.
        context: String,
    },

    /// A signature did not verify against the given address and payload.
    #[error("signature verification failed")]
    VerificationFailed,
}

impl SignError {
    /// Create an invalid key error.
    #[must_use]
    pub fn invalid_key(context: impl Into<String>) -> Self {
        Self::InvalidKey {
            context: context.into(),
        }
    }

    /// Create an unsupported algorithm error.
    #[must_use]
    pub fn unsupported_algorithm(tag: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { tag: tag.into() }
    }

    /// Create a signature failed error.
    #[must_use]
    pub fn signature_failed(context: impl Into<String>) -> Self {
        Self::SignatureFailed {
            context: context.into(),
        }
    }
}

// ============================================================================
// StoreError
// ============================================================================

/// Errors raised by the encrypted key vault.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No key is stored for the address.
    #[error("key not found: {address}")]
    KeyNotFound {
        /// The address that was looked up.
        address: String,
    },

    /// The authentication tag did not verify (tampering or wrong master key).
    #[error("decryption failed (tampered record or wrong seed)")]
    DecryptionFailed,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Master key derivation failed.
    #[error("key derivation failed: {context}")]
    KeyDerivationFailed {
        /// Additional context.
        context: String,
    },

    /// The backing database failed.
    #[error("database error: {context}")]
    Database {
        /// Additional context.
        context: String,
    },

    /// A stored record could not be interpreted.
    #[error("invalid record format: {context}")]
    InvalidFormat {
        /// Additional context.
        context: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Create a key not found error.
    #[must_use]
    pub fn key_not_found(address: impl Into<String>) -> Self {
        Self::KeyNotFound {
            address: address.into(),
        }
    }

    /// Create a database error.
    #[must_use]
    pub fn database(context: impl Into<String>) -> Self {
        Self::Database {
            context: context.into(),
        }
    }

    /// Create an invalid format error.
    #[must_use]
    pub fn invalid_format(context: impl Into<String>) -> Self {
        Self::InvalidFormat {
            context: context.into(),
        }
    }

    /// Create a key derivation error.
    #[must_use]
    pub fn key_derivation(context: impl Into<String>) -> Self {
        Self::KeyDerivationFailed {
            context: context.into(),
        }
    }

    /// Returns `true` if this is a missing-key error.
    #[must_use]
    pub const fn is_key_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

// ============================================================================
// GatewayError
// ============================================================================

/// Chain node request failures.
///
/// All variants belong to the `NetworkError` kind: the request either did
/// not reach the node, or the node refused or garbled the answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be sent or the connection failed.
    #[error("{method}: transport failure: {context}")]
    Transport {
        /// RPC method name.
        method: String,
        /// Underlying error.
        context: String,
    },

    /// The node answered with a non-success HTTP status.
    #[error("{method}: HTTP {status}: {body}")]
    Http {
        /// RPC method name.
        method: String,
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The node returned a JSON-RPC error object.
    #[error("{method}: RPC error {code}: {message}")]
    Rpc {
        /// RPC method name.
        method: String,
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// The response could not be decoded into the expected type.
    #[error("{method}: failed to decode response: {context}")]
    Decode {
        /// RPC method name.
        method: String,
        /// Underlying error.
        context: String,
    },
}

impl GatewayError {
    /// Create a transport error.
    #[must_use]
    pub fn transport(method: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Transport {
            method: method.into(),
            context: context.into(),
        }
    }

    /// Create an RPC error.
    #[must_use]
    pub fn rpc(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(method: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Decode {
            method: method.into(),
            context: context.into(),
        }
    }

    /// Returns `true` for failures that may succeed when repeated
    /// (connection problems and 5xx responses).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            Self::Rpc { .. } | Self::Decode { .. } => false,
        }
    }

    /// The RPC method the failure belongs to.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Transport { method, .. }
            | Self::Http { method, .. }
            | Self::Rpc { method, .. }
            | Self::Decode { method, .. } => method,
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was searched.
        path: String,
    },

    /// Failed to parse configuration.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Additional context.
        context: String,
    },

    /// Invalid configuration value.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name.
        field: String,
        /// The rejected value.
        value: String,
    },

    /// Missing required configuration field.
    #[error("missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// I/O error while reading or writing configuration.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,
}

impl ConfigError {
    /// Create a file not found error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a parse failed error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an I/O error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a no home directory error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }
}

// ============================================================================
// ExecutionError
// ============================================================================

/// Why an executor operation stopped.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionErrorKind {
    /// Malformed address or amount in the request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A message or parameter encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Signing failed.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// The vault failed for a reason other than a missing key.
    #[error(transparent)]
    Store(StoreError),

    /// The chain node request failed.
    #[error(transparent)]
    Network(#[from] GatewayError),

    /// The vault holds no key for the signing address.
    #[error("no key in the vault for {address}")]
    KeyNotFound {
        /// The signing address.
        address: String,
    },

    /// The requested amount exceeds what can be withdrawn.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Requested amount.
        requested: String,
        /// Available amount.
        available: String,
    },

    /// The signing address may not perform the operation.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Why the address was refused.
        reason: String,
    },

    /// No pending worker change matches the requested worker.
    #[error("no matching worker change proposed for {worker}")]
    NoMatchingProposal {
        /// The worker the caller asked to confirm.
        worker: String,
    },

    /// The pending worker change cannot be confirmed yet.
    #[error("worker change not ready: chain height {height} is below change epoch {change_epoch}")]
    NotReady {
        /// Current chain height.
        height: i64,
        /// Epoch at which the change may be confirmed.
        change_epoch: i64,
    },

    /// The message was included but its execution failed.
    #[error("message {cid} failed on chain with exit code {exit_code}")]
    ExecutionFailed {
        /// Message CID.
        cid: String,
        /// Receipt exit code.
        exit_code: i64,
    },

    /// A batch item failed; earlier items were already broadcast.
    #[error("item {index} failed: {source}")]
    BatchItemFailed {
        /// 1-based position of the failing item.
        index: usize,
        /// The item's failure.
        #[source]
        source: Box<ExecutionError>,
    },
}

impl From<StoreError> for ExecutionErrorKind {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::KeyNotFound { address } => Self::KeyNotFound { address },
            other => Self::Store(other),
        }
    }
}

/// Terminal failure of an executor operation.
///
/// Carries the operation, the address it acted for and the amount involved,
/// so a failed operation can be replayed by hand.
#[derive(Debug)]
pub struct ExecutionError {
    operation: OperationKind,
    address: String,
    amount: Option<String>,
    kind: ExecutionErrorKind,
}

impl ExecutionError {
    /// Creates an execution error.
    #[must_use]
    pub fn new(
        operation: OperationKind,
        address: impl Into<String>,
        amount: Option<String>,
        kind: impl Into<ExecutionErrorKind>,
    ) -> Self {
        Self {
            operation,
            address: address.into(),
            amount,
            kind: kind.into(),
        }
    }

    /// The operation that failed.
    #[must_use]
    pub const fn operation(&self) -> OperationKind {
        self.operation
    }

    /// The address the operation acted for.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The amount involved, if any.
    #[must_use]
    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    /// Why the operation stopped.
    #[must_use]
    pub const fn kind(&self) -> &ExecutionErrorKind {
        &self.kind
    }

    /// The innermost failure, looking through batch wrapping.
    #[must_use]
    pub fn root_kind(&self) -> &ExecutionErrorKind {
        match &self.kind {
            ExecutionErrorKind::BatchItemFailed { source, .. } => source.root_kind(),
            kind => kind,
        }
    }

    /// Returns `true` if the operation was refused by a precondition or an
    /// authorization check rather than failing.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(
            self.root_kind(),
            ExecutionErrorKind::InsufficientFunds { .. }
                | ExecutionErrorKind::Unauthorized { .. }
                | ExecutionErrorKind::NoMatchingProposal { .. }
                | ExecutionErrorKind::NotReady { .. }
        )
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.operation, self.address)?;
        if let Some(amount) = &self.amount {
            write!(f, " ({amount})")?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`FilsignError`] as the error type.
pub type Result<T> = std::result::Result<T, FilsignError>;

/// A `Result` type alias for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// A `Result` type alias for signing operations.
pub type SignResult<T> = std::result::Result<T, SignError>;

/// A `Result` type alias for vault operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A `Result` type alias for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A `Result` type alias for executor operations.
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

// ============================================================================
// Unit Tests
// ============================================================================
