//! Filecoin addresses.
//!
//! An address is a protocol tag plus a protocol-specific payload:
//!
//! | Protocol | Payload |
//! |---|---|
//! | `0` ID | LEB128 varint of the actor id |
//! | `1` secp256k1 | blake2b-160 of the 65-byte uncompressed public key |
//! | `2` actor | blake2b-160 of actor-specific data |
//! | `3` BLS | 48-byte compressed G1 public key |
//!
//! The string form is the network prefix (`f` or `t`), the protocol digit,
//! and then either the decimal id (ID addresses) or the lowercase unpadded
//! base32 of `payload || checksum`, where the checksum is a 4-byte blake2b
//! over `protocol || payload`.
//!
//! Equality and hashing ignore the network: `f01234` and `t01234` name the
//! same actor.
//!
//! # Example
//!
//! ```
//! use filsign_chain::address::{Address, Protocol};
//!
//! let addr: Address = "f01234".parse().unwrap();
//! assert_eq!(addr.protocol(), Protocol::Id);
//! assert_eq!(addr.id(), Some(1234));
//! assert_eq!(addr.to_bytes(), vec![0x00, 0xd2, 0x09]);
//! assert_eq!(addr.to_string(), "f01234");
//! ```

use crate::cbor::{Decoder, Encoder};
use crate::varint::{read_uvarint, write_uvarint};
use blake2::digest::consts::{U20, U4};
use blake2::{Blake2b, Digest};
use data_encoding::BASE32_NOPAD;
use filsign_core::error::{CodecError, CodecResult, ValidationError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Length of a secp256k1 or actor payload.
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Length of a BLS public key payload.
pub const BLS_PUBLIC_KEY_LEN: usize = 48;

/// Length of the string-form checksum.
pub const CHECKSUM_LEN: usize = 4;

/// Lotus renders an unset address as this string.
pub const EMPTY_ADDRESS_STRING: &str = "<empty>";

/// Upper bound on an encoded address inside CBOR.
const MAX_ADDRESS_BYTES: usize = 128;

/// Network an address string is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Network {
    /// `f` prefix.
    #[default]
    Mainnet,
    /// `t` prefix.
    Testnet,
}

impl Network {
    /// The single-character string prefix.
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Mainnet => 'f',
            Self::Testnet => 't',
        }
    }

    const fn from_prefix(c: char) -> Option<Self> {
        match c {
            'f' => Some(Self::Mainnet),
            't' => Some(Self::Testnet),
            _ => None,
        }
    }
}

/// Address protocol tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Numeric actor id.
    Id,
    /// Hash of a secp256k1 public key.
    Secp256k1,
    /// Hash of actor creation data.
    Actor,
    /// BLS public key.
    Bls,
}

impl Protocol {
    /// The protocol byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Id => 0,
            Self::Secp256k1 => 1,
            Self::Actor => 2,
            Self::Bls => 3,
        }
    }

    const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Id),
            1 => Some(Self::Secp256k1),
            2 => Some(Self::Actor),
            3 => Some(Self::Bls),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Payload {
    Id(u64),
    Secp256k1([u8; PAYLOAD_HASH_LEN]),
    Actor([u8; PAYLOAD_HASH_LEN]),
    Bls([u8; BLS_PUBLIC_KEY_LEN]),
}

/// A Filecoin address.
#[derive(Clone, Copy)]
pub struct Address {
    network: Network,
    payload: Payload,
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.payload.hash(state);
    }
}

fn blake2b_160(data: &[u8]) -> [u8; PAYLOAD_HASH_LEN] {
    Blake2b::<U20>::digest(data).into()
}

fn checksum(protocol: Protocol, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Blake2b::<U4>::new();
    hasher.update([protocol.as_byte()]);
    hasher.update(payload);
    hasher.finalize().into()
}

impl Address {
    /// Creates an ID address.
    #[must_use]
    pub const fn new_id(id: u64) -> Self {
        Self {
            network: Network::Mainnet,
            payload: Payload::Id(id),
        }
    }

    /// Creates a secp256k1 address from a 65-byte uncompressed public key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] if the key is not 65 bytes
    /// starting with `0x04`.
    pub fn new_secp256k1(public_key: &[u8]) -> Result<Self, ValidationError> {
        if public_key.len() != 65 || public_key.first() != Some(&0x04) {
            return Err(ValidationError::invalid_address(
                hex_preview(public_key),
                "secp256k1 public key must be 65 uncompressed bytes",
            ));
        }
        Ok(Self {
            network: Network::Mainnet,
            payload: Payload::Secp256k1(blake2b_160(public_key)),
        })
    }

    /// Creates an actor address by hashing `data`.
    #[must_use]
    pub fn new_actor(data: &[u8]) -> Self {
        Self {
            network: Network::Mainnet,
            payload: Payload::Actor(blake2b_160(data)),
        }
    }

    /// Creates a BLS address from a 48-byte compressed public key.
    #[must_use]
    pub const fn new_bls(public_key: [u8; BLS_PUBLIC_KEY_LEN]) -> Self {
        Self {
            network: Network::Mainnet,
            payload: Payload::Bls(public_key),
        }
    }

    /// Returns the same address rendered for `network`.
    #[must_use]
    pub const fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// The network this address renders for.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// The protocol tag.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self.payload {
            Payload::Id(_) => Protocol::Id,
            Payload::Secp256k1(_) => Protocol::Secp256k1,
            Payload::Actor(_) => Protocol::Actor,
            Payload::Bls(_) => Protocol::Bls,
        }
    }

    /// The actor id, for ID addresses.
    #[must_use]
    pub const fn id(&self) -> Option<u64> {
        match self.payload {
            Payload::Id(id) => Some(id),
            _ => None,
        }
    }

    /// Returns `true` for ID addresses.
    #[must_use]
    pub const fn is_id(&self) -> bool {
        matches!(self.payload, Payload::Id(_))
    }

    /// The BLS public key, for BLS addresses.
    #[must_use]
    pub const fn bls_public_key(&self) -> Option<&[u8; BLS_PUBLIC_KEY_LEN]> {
        match &self.payload {
            Payload::Bls(key) => Some(key),
            _ => None,
        }
    }

    /// The raw payload bytes.
    #[must_use]
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Id(id) => {
                let mut out = Vec::with_capacity(10);
                write_uvarint(&mut out, *id);
                out
            }
            Payload::Secp256k1(hash) | Payload::Actor(hash) => hash.to_vec(),
            Payload::Bls(key) => key.to_vec(),
        }
    }

    /// Byte form: protocol byte followed by the payload.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.protocol().as_byte()];
        out.extend_from_slice(&self.payload_bytes());
        out
    }

    /// Parses the byte form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] for an unknown protocol or a
    /// payload of the wrong length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::invalid_address(hex_preview(bytes), reason);

        let (&tag, payload) = bytes.split_first().ok_or_else(|| invalid("empty"))?;
        let protocol = Protocol::from_byte(tag).ok_or_else(|| invalid("unknown protocol"))?;

        let payload = match protocol {
            Protocol::Id => match read_uvarint(payload) {
                Some((id, used)) if used == payload.len() => Payload::Id(id),
                _ => return Err(invalid("invalid ID payload")),
            },
            Protocol::Secp256k1 => Payload::Secp256k1(
                payload
                    .try_into()
                    .map_err(|_| invalid("secp256k1 payload must be 20 bytes"))?,
            ),
            Protocol::Actor => Payload::Actor(
                payload
                    .try_into()
                    .map_err(|_| invalid("actor payload must be 20 bytes"))?,
            ),
            Protocol::Bls => Payload::Bls(
                payload
                    .try_into()
                    .map_err(|_| invalid("BLS payload must be 48 bytes"))?,
            ),
        };

        Ok(Self {
            network: Network::Mainnet,
            payload,
        })
    }

    /// Writes the address as a CBOR byte string.
    pub fn write_cbor(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.to_bytes());
    }

    /// Reads an address from a CBOR byte string.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the item is not a byte string or does not
    /// hold a valid address.
    pub fn read_cbor(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let bytes = dec.read_field_bytes(MAX_ADDRESS_BYTES, "address")?;
        Self::from_bytes(bytes).map_err(|e| CodecError::malformed(e.to_string()))
    }
}

fn hex_preview(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().take(16).fold(String::from("0x"), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = self.protocol();
        write!(f, "{}{}", self.network.prefix(), protocol.as_byte())?;

        if let Payload::Id(id) = self.payload {
            return write!(f, "{id}");
        }

        let mut data = self.payload_bytes();
        let sum = checksum(protocol, &data);
        data.extend_from_slice(&sum);
        f.write_str(&BASE32_NOPAD.encode(&data).to_ascii_lowercase())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::invalid_address(s, reason);

        let mut chars = s.chars();
        let network = chars
            .next()
            .and_then(Network::from_prefix)
            .ok_or_else(|| invalid("unknown network prefix"))?;
        let protocol = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .and_then(Protocol::from_byte)
            .ok_or_else(|| invalid("unknown protocol"))?;
        let raw = chars.as_str();

        if raw.is_empty() {
            return Err(invalid("missing payload"));
        }

        if protocol == Protocol::Id {
            if raw.len() > 20 || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("ID must be a decimal number"));
            }
            let id = raw.parse::<u64>().map_err(|_| invalid("ID out of range"))?;
            return Ok(Address::new_id(id).with_network(network));
        }

        if raw.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(invalid("payload must be lowercase base32"));
        }
        let decoded = BASE32_NOPAD
            .decode(raw.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid("invalid base32 payload"))?;
        if decoded.len() < CHECKSUM_LEN {
            return Err(invalid("payload too short"));
        }
        let (payload, sum) = decoded.split_at(decoded.len() - CHECKSUM_LEN);
        if checksum(protocol, payload) != sum {
            return Err(invalid("checksum mismatch"));
        }

        let mut bytes = Vec::with_capacity(payload.len() + 1);
        bytes.push(protocol.as_byte());
        bytes.extend_from_slice(payload);
        Address::from_bytes(&bytes)
            .map(|addr| addr.with_network(network))
            .map_err(|_| invalid("payload has the wrong length"))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for optional address fields that Lotus renders as
/// `"<empty>"` when unset.
pub mod optional {
    use super::{Address, EMPTY_ADDRESS_STRING};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `None` as `"<empty>"`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(addr) => serializer.collect_str(addr),
            None => serializer.serialize_str(EMPTY_ADDRESS_STRING),
        }
    }

    /// Deserializes `null`, `""` or `"<empty>"` as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty string is not a valid address.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Address>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() || s == EMPTY_ADDRESS_STRING => Ok(None),
            Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}
