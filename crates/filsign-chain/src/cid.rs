//! Content identifiers.
//!
//! Messages are identified by a CIDv1 with the dag-cbor codec and a
//! blake2b-256 multihash of their canonical encoding. The raw CID bytes are
//! the payload both signature algorithms sign.
//!
//! Node responses also carry CIDs of other codecs (actor code, state heads),
//! so [`Cid`] keeps the codec and multihash code generic.

use crate::varint::{read_uvarint, write_uvarint};
use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use data_encoding::BASE32_NOPAD;
use filsign_core::error::ValidationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Multicodec code for dag-cbor.
pub const DAG_CBOR: u64 = 0x71;

/// Multihash code for blake2b-256.
pub const BLAKE2B_256: u64 = 0xb220;

/// Multibase prefix for lowercase base32.
const BASE32_PREFIX: char = 'b';

const CID_V1: u64 = 1;

/// Longest digest accepted when parsing.
const MAX_DIGEST_LEN: usize = 128;

/// A version 1 content identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Cid {
    codec: u64,
    hash_code: u64,
    digest: Vec<u8>,
}

impl Cid {
    /// CID of dag-cbor `data` under blake2b-256.
    ///
    /// # Example
    ///
    /// ```
    /// use filsign_chain::cid::Cid;
    ///
    /// let cid = Cid::from_cbor_blake2b256(&[0x80]);
    /// assert!(cid.to_string().starts_with("bafy2bzace"));
    /// ```
    #[must_use]
    pub fn from_cbor_blake2b256(data: &[u8]) -> Self {
        Self {
            codec: DAG_CBOR,
            hash_code: BLAKE2B_256,
            digest: Blake2b::<U32>::digest(data).to_vec(),
        }
    }

    /// The content codec.
    #[must_use]
    pub const fn codec(&self) -> u64 {
        self.codec
    }

    /// The multihash digest.
    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Binary form: version, codec, hash code and digest length as varints,
    /// followed by the digest.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.digest.len() + 8);
        write_uvarint(&mut out, CID_V1);
        write_uvarint(&mut out, self.codec);
        write_uvarint(&mut out, self.hash_code);
        write_uvarint(&mut out, self.digest.len() as u64);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Parses the binary form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidInput`] for anything but a
    /// well-formed CIDv1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::invalid_input("cid", reason);

        let mut rest = bytes;
        let mut next = |what: &str| -> Result<u64, ValidationError> {
            let (value, used) = read_uvarint(rest).ok_or_else(|| invalid(what))?;
            rest = rest.get(used..).unwrap_or_default();
            Ok(value)
        };

        if next("missing version")? != CID_V1 {
            return Err(invalid("only CIDv1 is supported"));
        }
        let codec = next("missing codec")?;
        let hash_code = next("missing multihash code")?;
        let len = next("missing digest length")?;

        if len > MAX_DIGEST_LEN as u64 || rest.len() as u64 != len {
            return Err(invalid("digest length mismatch"));
        }
        Ok(Self {
            codec,
            hash_code,
            digest: rest.to_vec(),
        })
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{BASE32_PREFIX}{}",
            BASE32_NOPAD.encode(&self.to_bytes()).to_ascii_lowercase()
        )
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({self})")
    }
}

impl FromStr for Cid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .strip_prefix(BASE32_PREFIX)
            .ok_or_else(|| ValidationError::invalid_input("cid", "expected base32 multibase"))?;
        let bytes = BASE32_NOPAD
            .decode(encoded.to_ascii_uppercase().as_bytes())
            .map_err(|_| ValidationError::invalid_input("cid", "invalid base32"))?;
        Self::from_bytes(&bytes)
    }
}

#[derive(Serialize, Deserialize)]
struct CidJson {
    #[serde(rename = "/")]
    link: String,
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CidJson {
            link: self.to_string(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = CidJson::deserialize(deserializer)?;
        json.link.parse().map_err(serde::de::Error::custom)
    }
}
