//! Messages, signatures and signed messages.
//!
//! The CBOR layout follows the chain's canonical tuple encoding: a message is
//! a 10-element array and a signed message a 2-element array of the message
//! and its signature. These bytes are consensus-critical; the message CID is
//! derived from them and its raw bytes are what gets signed.
//!
//! # Example
//!
//! ```
//! use filsign_chain::address::Address;
//! use filsign_chain::amount::TokenAmount;
//! use filsign_chain::message::Message;
//!
//! let msg = Message::new(
//!     Address::new_id(1000),
//!     Address::new_id(1234),
//!     0,
//!     TokenAmount::from_whole(1),
//!     Vec::new(),
//! );
//! let bytes = msg.to_cbor().unwrap();
//! assert_eq!(bytes[0], 0x8a);
//! assert_eq!(Message::from_cbor(&bytes).unwrap(), msg);
//! ```

use crate::address::Address;
use crate::amount::TokenAmount;
use crate::cbor::{Decoder, Encoder};
use crate::cid::Cid;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use filsign_core::error::{CodecError, CodecResult};
use filsign_core::types::SignatureType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Largest `params` byte string accepted when encoding or decoding.
pub const MAX_PARAMS_LEN: usize = 2 << 20;

/// Number of fields in an encoded [`Message`].
const MESSAGE_FIELDS: u64 = 10;

/// Number of fields in an encoded [`SignedMessage`].
const SIGNED_MESSAGE_FIELDS: u64 = 2;

/// Longest signature byte string (type byte plus a BLS signature).
const MAX_SIGNATURE_BYTES: usize = 1 + 96;

/// An unsigned message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Message format version, always 0.
    pub version: u64,
    /// Recipient.
    pub to: Address,
    /// Sender; pays the fee and signs.
    pub from: Address,
    /// Sender sequence number.
    pub nonce: u64,
    /// Value transferred to `to`.
    pub value: TokenAmount,
    /// Gas units the message may consume.
    pub gas_limit: i64,
    /// Maximum price per gas unit.
    pub gas_fee_cap: TokenAmount,
    /// Priority fee per gas unit paid to the block producer.
    pub gas_premium: TokenAmount,
    /// Actor method number; 0 is a plain send.
    pub method: u64,
    /// CBOR-encoded method parameters.
    #[serde(with = "params_base64", default)]
    pub params: Vec<u8>,
}

impl Message {
    /// Creates a version 0 message with zero nonce and unset gas fields.
    #[must_use]
    pub fn new(from: Address, to: Address, method: u64, value: TokenAmount, params: Vec<u8>) -> Self {
        Self {
            version: 0,
            to,
            from,
            nonce: 0,
            value,
            gas_limit: 0,
            gas_fee_cap: TokenAmount::zero(),
            gas_premium: TokenAmount::zero(),
            method,
            params,
        }
    }

    /// Appends the canonical encoding to `enc`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ParamsTooLarge`] if `params` exceeds
    /// [`MAX_PARAMS_LEN`], or [`CodecError::MalformedEncoding`] if an amount
    /// is too wide to encode.
    pub fn write_cbor(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.write_array_header(MESSAGE_FIELDS as usize);
        enc.write_u64(self.version);
        self.to.write_cbor(enc);
        self.from.write_cbor(enc);
        enc.write_u64(self.nonce);
        self.value.write_cbor(enc)?;
        enc.write_i64(self.gas_limit);
        self.gas_fee_cap.write_cbor(enc)?;
        self.gas_premium.write_cbor(enc)?;
        enc.write_u64(self.method);
        enc.write_bytes_capped(&self.params, MAX_PARAMS_LEN)
    }

    /// Reads one message from `dec`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] on a field-count mismatch, a malformed field,
    /// oversized params or truncated input.
    pub fn read_cbor(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.expect_array(MESSAGE_FIELDS)?;
        Ok(Self {
            version: dec.read_u64()?,
            to: Address::read_cbor(dec)?,
            from: Address::read_cbor(dec)?,
            nonce: dec.read_u64()?,
            value: TokenAmount::read_cbor(dec)?,
            gas_limit: dec.read_i64()?,
            gas_fee_cap: TokenAmount::read_cbor(dec)?,
            gas_premium: TokenAmount::read_cbor(dec)?,
            method: dec.read_u64()?,
            params: dec.read_bytes(MAX_PARAMS_LEN)?.to_vec(),
        })
    }

    /// Canonical CBOR encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ParamsTooLarge`] if `params` exceeds
    /// [`MAX_PARAMS_LEN`].
    pub fn to_cbor(&self) -> CodecResult<Vec<u8>> {
        let mut enc = Encoder::with_capacity(128 + self.params.len());
        self.write_cbor(&mut enc)?;
        Ok(enc.into_bytes())
    }

    /// Decodes a message that must span all of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for any deviation from the canonical form,
    /// including trailing bytes.
    pub fn from_cbor(bytes: &[u8]) -> CodecResult<Self> {
        let mut dec = Decoder::new(bytes);
        let msg = Self::read_cbor(&mut dec)?;
        dec.finish()?;
        Ok(msg)
    }

    /// Content identifier of the canonical encoding.
    ///
    /// # Errors
    ///
    /// Fails only if the message cannot be encoded.
    pub fn cid(&self) -> CodecResult<Cid> {
        Ok(Cid::from_cbor_blake2b256(&self.to_cbor()?))
    }

    /// The payload both signature algorithms sign: the raw CID bytes.
    ///
    /// # Errors
    ///
    /// Fails only if the message cannot be encoded.
    pub fn signing_bytes(&self) -> CodecResult<Vec<u8>> {
        Ok(self.cid()?.to_bytes())
    }

    /// Total fee this message may spend: `gas_limit * gas_fee_cap`.
    ///
    /// A negative gas limit counts as zero.
    #[must_use]
    pub fn max_fee(&self) -> TokenAmount {
        let limit = u64::try_from(self.gas_limit).unwrap_or(0);
        &self.gas_fee_cap * limit
    }
}

/// A typed signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Algorithm that produced the signature.
    pub sig_type: SignatureType,
    /// Raw signature bytes.
    pub data: Vec<u8>,
}

impl Signature {
    /// Creates a secp256k1 signature from its 65 `r || s || v` bytes.
    #[must_use]
    pub const fn new_secp256k1(data: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Secp256k1,
            data,
        }
    }

    /// Creates a BLS signature from its 96 compressed bytes.
    #[must_use]
    pub const fn new_bls(data: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Bls,
            data,
        }
    }

    /// Byte form: the type byte followed by the signature data.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.data.len());
        out.push(self.sig_type.as_byte());
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses the byte form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] for empty input, an unknown
    /// type byte or data of the wrong length for its type.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let (&tag, data) = bytes
            .split_first()
            .ok_or_else(|| CodecError::malformed("empty signature"))?;
        let sig_type = SignatureType::from_byte(tag)
            .ok_or_else(|| CodecError::malformed(format!("unknown signature type {tag}")))?;
        Self::with_checked_len(sig_type, data.to_vec())
    }

    fn with_checked_len(sig_type: SignatureType, data: Vec<u8>) -> CodecResult<Self> {
        if data.len() != sig_type.signature_len() {
            return Err(CodecError::malformed(format!(
                "{sig_type} signature must be {} bytes, got {}",
                sig_type.signature_len(),
                data.len()
            )));
        }
        Ok(Self { sig_type, data })
    }

    /// Writes the signature as a CBOR byte string.
    pub fn write_cbor(&self, enc: &mut Encoder) {
        enc.write_bytes(&self.to_bytes());
    }

    /// Reads a signature from a CBOR byte string.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if the item is not a valid signature.
    pub fn read_cbor(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let bytes = dec.read_field_bytes(MAX_SIGNATURE_BYTES, "signature")?;
        Self::from_bytes(bytes)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignatureJson {
    #[serde(rename = "Type")]
    sig_type: u8,
    data: String,
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SignatureJson {
            sig_type: self.sig_type.as_byte(),
            data: BASE64.encode(&self.data),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let json = SignatureJson::deserialize(deserializer)?;
        let sig_type = SignatureType::from_byte(json.sig_type)
            .ok_or_else(|| D::Error::custom(format!("unknown signature type {}", json.sig_type)))?;
        let data = BASE64.decode(json.data.as_bytes()).map_err(D::Error::custom)?;
        Self::with_checked_len(sig_type, data).map_err(D::Error::custom)
    }
}

/// A message together with its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedMessage {
    /// The signed message.
    pub message: Message,
    /// Signature over the message CID bytes.
    pub signature: Signature,
}

impl SignedMessage {
    /// Pairs a message with its signature.
    #[must_use]
    pub const fn new(message: Message, signature: Signature) -> Self {
        Self { message, signature }
    }

    /// Canonical CBOR encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ParamsTooLarge`] if the message params exceed
    /// [`MAX_PARAMS_LEN`].
    pub fn to_cbor(&self) -> CodecResult<Vec<u8>> {
        let mut enc = Encoder::with_capacity(256 + self.message.params.len());
        enc.write_array_header(SIGNED_MESSAGE_FIELDS as usize);
        self.message.write_cbor(&mut enc)?;
        self.signature.write_cbor(&mut enc);
        Ok(enc.into_bytes())
    }

    /// Decodes a signed message that must span all of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] for any deviation from the canonical form.
    pub fn from_cbor(bytes: &[u8]) -> CodecResult<Self> {
        let mut dec = Decoder::new(bytes);
        dec.expect_array(SIGNED_MESSAGE_FIELDS)?;
        let message = Message::read_cbor(&mut dec)?;
        let signature = Signature::read_cbor(&mut dec)?;
        dec.finish()?;
        Ok(Self { message, signature })
    }

    /// The identifier the node reports for this message.
    ///
    /// BLS-signed messages are identified by the unsigned message, since
    /// their signatures are aggregated in blocks.
    ///
    /// # Errors
    ///
    /// Fails only if the message cannot be encoded.
    pub fn cid(&self) -> CodecResult<Cid> {
        match self.signature.sig_type {
            SignatureType::Bls => self.message.cid(),
            SignatureType::Secp256k1 => Ok(Cid::from_cbor_blake2b256(&self.to_cbor()?)),
        }
    }
}

/// Lotus renders `params` as base64, with empty params as `null`.
mod params_base64 {
    use super::BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(params: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if params.is_empty() {
            serializer.serialize_none()
        } else {
            serializer.serialize_str(&BASE64.encode(params))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(Vec::new()),
            Some(s) => BASE64
                .decode(s.as_bytes())
                .map_err(serde::de::Error::custom),
        }
    }
}
