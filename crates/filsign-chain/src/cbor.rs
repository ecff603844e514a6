//! Canonical CBOR primitives.
//!
//! Only the subset the chain's message format uses is supported: unsigned
//! and negative integers, byte strings and definite-length arrays. Headers
//! are always written in their shortest form, and the reader rejects any
//! header that is not, so a decoded value re-encodes to the same bytes.
//!
//! # Errors
//!
//! The [`Decoder`] distinguishes three failure classes:
//!
//! - [`CodecError::TruncatedInput`] - input ended inside a header or payload
//! - [`CodecError::ParamsTooLarge`] - a byte string declares more than the
//!   caller's cap; reported before anything is allocated
//! - [`CodecError::MalformedEncoding`] - everything else
//!
//! # Example
//!
//! ```
//! use filsign_chain::cbor::{Decoder, Encoder, MajorType};
//!
//! let mut enc = Encoder::new();
//! enc.write_array_header(2);
//! enc.write_u64(500);
//! enc.write_bytes(b"hi");
//! let bytes = enc.into_bytes();
//! assert_eq!(bytes, [0x82, 0x19, 0x01, 0xf4, 0x42, b'h', b'i']);
//!
//! let mut dec = Decoder::new(&bytes);
//! dec.expect_array(2).unwrap();
//! assert_eq!(dec.read_u64().unwrap(), 500);
//! assert_eq!(dec.read_bytes(16).unwrap(), b"hi");
//! dec.finish().unwrap();
//! # let _ = MajorType::Array;
//! ```

use filsign_core::error::{CodecError, CodecResult};

/// CBOR major types used by the message format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorType {
    /// Major type 0.
    UnsignedInt,
    /// Major type 1, value `-1 - n`.
    NegativeInt,
    /// Major type 2.
    ByteString,
    /// Major type 3.
    TextString,
    /// Major type 4.
    Array,
    /// Major type 5.
    Map,
    /// Major type 6.
    Tag,
    /// Major type 7.
    Simple,
}

impl MajorType {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Self::UnsignedInt,
            1 => Self::NegativeInt,
            2 => Self::ByteString,
            3 => Self::TextString,
            4 => Self::Array,
            5 => Self::Map,
            6 => Self::Tag,
            _ => Self::Simple,
        }
    }

    const fn bits(self) -> u8 {
        match self {
            Self::UnsignedInt => 0,
            Self::NegativeInt => 1,
            Self::ByteString => 2,
            Self::TextString => 3,
            Self::Array => 4,
            Self::Map => 5,
            Self::Tag => 6,
            Self::Simple => 7,
        }
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Appends canonical CBOR items to a byte buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Creates an empty encoder.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Creates an encoder with preallocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Writes a header in its shortest form.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write_header(&mut self, major: MajorType, value: u64) {
        let m = major.bits() << 5;
        if value < 24 {
            self.buf.push(m | value as u8);
        } else if value <= u64::from(u8::MAX) {
            self.buf.push(m | 24);
            self.buf.push(value as u8);
        } else if value <= u64::from(u16::MAX) {
            self.buf.push(m | 25);
            self.buf.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= u64::from(u32::MAX) {
            self.buf.push(m | 26);
            self.buf.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buf.push(m | 27);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    /// Writes an unsigned integer.
    pub fn write_u64(&mut self, value: u64) {
        self.write_header(MajorType::UnsignedInt, value);
    }

    /// Writes a signed integer, using major type 1 for negative values.
    pub fn write_i64(&mut self, value: i64) {
        match u64::try_from(value) {
            Ok(v) => self.write_header(MajorType::UnsignedInt, v),
            // -1 - value is non-negative for every negative i64
            Err(_) => self.write_header(MajorType::NegativeInt, (-1 - value).unsigned_abs()),
        }
    }

    /// Writes a byte string.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_header(MajorType::ByteString, data.len() as u64);
        self.buf.extend_from_slice(data);
    }

    /// Writes a byte string after checking it against a length cap.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ParamsTooLarge`] if `data` is longer than `max`.
    pub fn write_bytes_capped(&mut self, data: &[u8], max: usize) -> CodecResult<()> {
        if data.len() > max {
            return Err(CodecError::params_too_large(data.len() as u64, max as u64));
        }
        self.write_bytes(data);
        Ok(())
    }

    /// Writes a definite-length array header.
    pub fn write_array_header(&mut self, len: usize) {
        self.write_header(MajorType::Array, len as u64);
    }

    /// Appends already-encoded CBOR.
    pub fn write_raw(&mut self, encoded: &[u8]) {
        self.buf.extend_from_slice(encoded);
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Reads canonical CBOR items from a byte slice.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder over `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns `true` when all input has been consumed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .ok_or(CodecError::TruncatedInput)?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(CodecError::TruncatedInput)?;
        self.pos = end;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Reads an item header, enforcing the shortest-form rule.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TruncatedInput`] if the header is cut short and
    /// [`CodecError::MalformedEncoding`] for indefinite, reserved or
    /// non-minimal headers.
    pub fn read_header(&mut self) -> CodecResult<(MajorType, u64)> {
        let [initial] = self.take_array::<1>()?;
        let major = MajorType::from_bits(initial >> 5);
        let info = initial & 0x1f;

        let (value, min) = match info {
            0..=23 => return Ok((major, u64::from(info))),
            24 => (u64::from(u8::from_be_bytes(self.take_array()?)), 24),
            25 => (u64::from(u16::from_be_bytes(self.take_array()?)), 0x100),
            26 => (u64::from(u32::from_be_bytes(self.take_array()?)), 0x1_0000),
            27 => (u64::from_be_bytes(self.take_array()?), 0x1_0000_0000),
            31 => return Err(CodecError::malformed("indefinite-length items are not allowed")),
            _ => return Err(CodecError::malformed(format!("reserved additional info {info}"))),
        };

        if value < min {
            return Err(CodecError::malformed("header is not in shortest form"));
        }
        Ok((major, value))
    }

    /// Reads an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] on any other major type.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        match self.read_header()? {
            (MajorType::UnsignedInt, value) => Ok(value),
            (major, _) => Err(CodecError::malformed(format!(
                "expected unsigned integer, found {major:?}"
            ))),
        }
    }

    /// Reads a signed 64-bit integer encoded with major type 0 or 1.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] on overflow or any other major type.
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        match self.read_header()? {
            (MajorType::UnsignedInt, value) => {
                i64::try_from(value).map_err(|_| CodecError::malformed("int64 positive overflow"))
            }
            (MajorType::NegativeInt, value) => i64::try_from(value)
                .map(|v| -1 - v)
                .map_err(|_| CodecError::malformed("int64 negative overflow")),
            (major, _) => Err(CodecError::malformed(format!(
                "expected integer, found {major:?}"
            ))),
        }
    }

    /// Reads a byte string of at most `max` bytes.
    ///
    /// The declared length is compared with `max` before the payload is
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] on any other major type,
    /// [`CodecError::ParamsTooLarge`] if the declared length exceeds `max`
    /// and [`CodecError::TruncatedInput`] if fewer bytes remain than declared.
    pub fn read_bytes(&mut self, max: usize) -> CodecResult<&'a [u8]> {
        let (major, len) = self.read_header()?;
        if major != MajorType::ByteString {
            return Err(CodecError::malformed(format!(
                "expected byte string, found {major:?}"
            )));
        }
        if len > max as u64 {
            return Err(CodecError::params_too_large(len, max as u64));
        }
        let len = usize::try_from(len).map_err(|_| CodecError::TruncatedInput)?;
        self.take(len)
    }

    /// [`read_bytes`](Self::read_bytes) for fixed-purpose fields such as
    /// addresses, amounts and signatures, where an oversize length is a
    /// malformed `field` rather than oversized params.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] for a wrong major type or a
    /// length above `max`, and [`CodecError::TruncatedInput`] for short input.
    pub fn read_field_bytes(&mut self, max: usize, field: &str) -> CodecResult<&'a [u8]> {
        self.read_bytes(max).map_err(|e| match e {
            CodecError::ParamsTooLarge { len, max } => {
                CodecError::malformed(format!("{field} of {len} bytes exceeds {max}"))
            }
            other => other,
        })
    }

    /// Reads an array header and returns its length.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] on any other major type.
    pub fn read_array_header(&mut self) -> CodecResult<u64> {
        match self.read_header()? {
            (MajorType::Array, len) => Ok(len),
            (major, _) => Err(CodecError::malformed(format!(
                "expected array, found {major:?}"
            ))),
        }
    }

    /// Reads an array header that must have exactly `expected` elements.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] on a different type or length.
    pub fn expect_array(&mut self, expected: u64) -> CodecResult<()> {
        let len = self.read_array_header()?;
        if len != expected {
            return Err(CodecError::malformed(format!(
                "expected array of {expected} fields, found {len}"
            )));
        }
        Ok(())
    }

    /// Fails unless all input has been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] if bytes remain.
    pub fn finish(&self) -> CodecResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CodecError::malformed(format!(
                "{} trailing bytes",
                self.data.len() - self.pos
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn encode_u64(value: u64) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_u64(value);
        enc.into_bytes()
    }

    #[test]
    fn test_header_boundaries_use_shortest_form() {
        assert_eq!(encode_u64(0), [0x00]);
        assert_eq!(encode_u64(23), [0x17]);
        assert_eq!(encode_u64(24), [0x18, 0x18]);
        assert_eq!(encode_u64(255), [0x18, 0xff]);
        assert_eq!(encode_u64(256), [0x19, 0x01, 0x00]);
        assert_eq!(encode_u64(65_536), [0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            encode_u64(u64::MAX),
            [0x1b, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_negative_integers() {
        let mut enc = Encoder::new();
        enc.write_i64(-1);
        enc.write_i64(-500);
        enc.write_i64(i64::MIN);
        let bytes = enc.into_bytes();
        assert_eq!(&bytes[..4], &[0x20, 0x39, 0x01, 0xf3]);

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_i64().unwrap(), -1);
        assert_eq!(dec.read_i64().unwrap(), -500);
        assert_eq!(dec.read_i64().unwrap(), i64::MIN);
        dec.finish().unwrap();
    }

    #[test]
    fn test_i64_overflow_is_malformed() {
        let bytes = encode_u64(u64::MAX);
        let err = Decoder::new(&bytes).read_i64().unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }

    #[test]
    fn test_non_minimal_header_rejected() {
        // 5 encoded with a one-byte extension
        let err = Decoder::new(&[0x18, 0x05]).read_u64().unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }

    #[test]
    fn test_indefinite_and_reserved_rejected() {
        assert!(matches!(
            Decoder::new(&[0x5f]).read_header().unwrap_err(),
            CodecError::MalformedEncoding { .. }
        ));
        assert!(matches!(
            Decoder::new(&[0x1c]).read_header().unwrap_err(),
            CodecError::MalformedEncoding { .. }
        ));
    }

    #[test]
    fn test_truncated_header_and_payload() {
        assert_eq!(
            Decoder::new(&[]).read_header().unwrap_err(),
            CodecError::TruncatedInput
        );
        assert_eq!(
            Decoder::new(&[0x19, 0x01]).read_header().unwrap_err(),
            CodecError::TruncatedInput
        );
        // byte string claims 4 bytes, only 2 present
        assert_eq!(
            Decoder::new(&[0x44, 0x01, 0x02]).read_bytes(16).unwrap_err(),
            CodecError::TruncatedInput
        );
    }

    #[test]
    fn test_oversized_byte_string_rejected_before_reading() {
        // claims 2^32 bytes with no payload at all
        let err = Decoder::new(&[0x5b, 0, 0, 0, 1, 0, 0, 0, 0])
            .read_bytes(2_097_152)
            .unwrap_err();
        assert_eq!(err, CodecError::params_too_large(1 << 32, 2_097_152));
    }

    #[test]
    fn test_wrong_major_type_reported_before_length() {
        // text string header claiming 2^32 bytes
        let err = Decoder::new(&[0x7b, 0, 0, 0, 1, 0, 0, 0, 0])
            .read_bytes(16)
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }

    #[test]
    fn test_field_bytes_oversize_is_malformed() {
        let mut enc = Encoder::new();
        enc.write_bytes(&[0u8; 20]);
        let bytes = enc.into_bytes();

        let err = Decoder::new(&bytes)
            .read_field_bytes(16, "address")
            .unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));

        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_field_bytes(20, "address").unwrap(), &[0u8; 20]);
    }

    #[test]
    fn test_write_bytes_capped() {
        let mut enc = Encoder::new();
        assert!(enc.write_bytes_capped(&[0u8; 4], 4).is_ok());
        assert_eq!(
            enc.write_bytes_capped(&[0u8; 5], 4).unwrap_err(),
            CodecError::params_too_large(5, 4)
        );
    }

    #[test]
    fn test_expect_array_length_mismatch() {
        let err = Decoder::new(&[0x83]).expect_array(2).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));

        let err = Decoder::new(&[0x02]).expect_array(2).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }

    #[test]
    fn test_finish_rejects_trailing_bytes() {
        let dec = Decoder::new(&[0x00]);
        assert!(dec.finish().is_err());
    }
}
