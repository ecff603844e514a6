//! # filsign-crypto
//!
//! Key material, dual-algorithm signing and the encrypted key vault for
//! filsign.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `filsign`.** The API
//! is unstable and may change between any versions.
//!
//! ## Modules
//!
//! - [`keys`] - Zeroizing private key containers and the export format
//! - [`keypair`] - secp256k1 and BLS12-381 key pairs
//! - [`signer`] - Algorithm dispatch: generate, derive address, sign, verify
//! - [`encryption`] - Master key derivation and AES-256-GCM records
//! - [`vault`] - The `SQLite` key vault
//!
//! ## Supported Algorithms
//!
//! - secp256k1: recoverable ECDSA over blake2b-256, 65-byte signatures
//! - BLS12-381 (min-pk): 48-byte public keys, 96-byte signatures
//!
//! ## Security
//!
//! - No unsafe code allowed
//! - Private keys and the master key are zeroized on drop
//! - `Debug` output never contains key material

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod encryption;
pub mod keypair;
pub mod keys;
pub mod signer;
pub mod vault;

pub use encryption::{KdfParams, VaultContext};
pub use keypair::{BlsKeyPair, KeyPair, Secp256k1KeyPair};
pub use keys::{KeyInfo, SecretKey, SECRET_KEY_LEN};
pub use signer::{derive_address, generate_key, sign, verify, Signer};
pub use vault::{KeyVault, SqliteKeyVault, StoredKey};
