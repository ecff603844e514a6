//! # filsign-core
//!
//! Core types, configuration and error definitions shared by every filsign crate.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`types`] - Signature algorithm and operation kind tags
//! - [`config`] - Configuration file schema
//! - [`config_loader`] - Loading, saving and locating configuration files
//!
//! ## Error Handling
//!
//! ```rust
//! use filsign_core::error::{FilsignError, SignError};
//!
//! let err: FilsignError = SignError::unsupported_algorithm("ed25519").into();
//! assert_eq!(err.to_string(), "Signing error: unsupported algorithm: ed25519");
//! ```
//!
//! ## Core Types
//!
//! ```rust
//! use filsign_core::SignatureType;
//!
//! let sig_type: SignatureType = "bls".parse().expect("known tag");
//! assert_eq!(sig_type.as_byte(), 2);
//! assert_eq!(sig_type.to_string(), "bls");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod error;
pub mod types;

pub use error::{
    CodecError, ConfigError, ExecutionError, ExecutionErrorKind, ExecutionResult, FilsignError,
    GatewayError, Result, SignError, StoreError, ValidationError,
};

pub use config::{
    Config, ConfigBuilder, DatabaseConfig, GasConfig, LogSettings, LotusConfig, SecurityConfig,
};

pub use config_loader::{expand_path, load_config, resolve_config_path, ConfigLoader};

pub use types::{OperationKind, SignatureType};
