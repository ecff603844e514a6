//! # filsign-chain
//!
//! Filecoin chain primitives for the filsign signing engine.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `filsign`.** The API
//! is unstable and may change between any versions.
//!
//! ## Modules
//!
//! - [`address`] - Addresses, their byte, string and JSON forms
//! - [`amount`] - attoFIL token amounts
//! - [`cbor`] - Canonical CBOR reader and writer
//! - [`cid`] - Content identifiers
//! - [`message`] - Messages, signatures and signed messages
//! - [`params`] - Built-in actor method numbers and parameters
//! - [`api_types`] - Node API response types
//!
//! ## Message Encoding
//!
//! The message CBOR is consensus-critical. Its CID bytes are the payload
//! every signature covers:
//!
//! ```rust
//! use filsign_chain::{Address, Message, TokenAmount};
//!
//! let from: Address = "f1pzrmbh7zfrppecothkiafiskbfnjza3ruommgta".parse().unwrap();
//! let mut msg = Message::new(from, Address::new_id(1234), 0, TokenAmount::from_whole(1), vec![]);
//! msg.nonce = 42;
//! msg.gas_limit = 2_000_000;
//! msg.gas_fee_cap = TokenAmount::from(100_000_u64);
//! msg.gas_premium = TokenAmount::from(1_000_u64);
//!
//! assert_eq!(
//!     msg.cid().unwrap().to_string(),
//!     "bafy2bzacebzxqimg5ynjfn57rdez64efajalcvdixus477neykvqjbthvnuig"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod address;
pub mod amount;
pub mod api_types;
pub mod cbor;
pub mod cid;
pub mod message;
pub mod params;

mod varint;

pub use address::{Address, Network, Protocol};
pub use amount::TokenAmount;
pub use api_types::{Actor, ChainEpoch, MarketBalance, MinerInfo, MsgLookup, TipSet};
pub use cid::Cid;
pub use message::{Message, Signature, SignedMessage, MAX_PARAMS_LEN};
