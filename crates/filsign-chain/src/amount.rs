//! Token amounts in attoFIL.
//!
//! [`TokenAmount`] is an arbitrary-precision non-negative integer. It
//! carries three representations:
//!
//! - CBOR: a byte string, empty for zero, otherwise a `0x00` sign byte
//!   followed by the big-endian magnitude
//! - JSON: the decimal attoFIL string
//! - Display: whole FIL with trailing zeros trimmed, e.g. `1.5 FIL`
//!
//! # Example
//!
//! ```
//! use filsign_chain::amount::TokenAmount;
//!
//! let amount = TokenAmount::parse_fil("1.5").unwrap();
//! assert_eq!(amount.atto().to_string(), "1500000000000000000");
//! assert_eq!(amount.to_string(), "1.5 FIL");
//! ```

use crate::cbor::{Decoder, Encoder};
use filsign_core::error::{CodecError, CodecResult, ValidationError};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Mul;

/// attoFIL per FIL.
pub const ATTO_PER_FIL: u64 = 1_000_000_000_000_000_000;

/// Number of fractional FIL digits.
pub const FIL_DECIMALS: usize = 18;

/// Cap on an encoded big integer (sign byte plus 128 bytes of magnitude).
const MAX_BIGINT_BYTES: usize = 129;

const BIGINT_FIELD: &str = "token amount";

fn oversize(len: usize) -> CodecError {
    CodecError::malformed(format!(
        "{BIGINT_FIELD} of {len} bytes exceeds {MAX_BIGINT_BYTES}"
    ))
}

/// A non-negative amount of attoFIL.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(BigUint);

impl TokenAmount {
    /// Zero.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Creates an amount from attoFIL.
    #[must_use]
    pub fn from_atto(atto: impl Into<BigUint>) -> Self {
        Self(atto.into())
    }

    /// Creates an amount of whole FIL.
    #[must_use]
    pub fn from_whole(fil: u64) -> Self {
        Self(BigUint::from(fil) * ATTO_PER_FIL)
    }

    /// The amount in attoFIL.
    #[must_use]
    pub const fn atto(&self) -> &BigUint {
        &self.0
    }

    /// Consumes the amount and returns the attoFIL value.
    #[must_use]
    pub fn into_atto(self) -> BigUint {
        self.0
    }

    /// Returns `true` for zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtraction that returns `None` instead of going negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        (self.0 >= other.0).then(|| Self(&self.0 - &other.0))
    }

    /// Subtraction that stops at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: &Self) -> Self {
        self.checked_sub(other).unwrap_or_default()
    }

    /// Integer division. Division by zero yields zero.
    #[must_use]
    pub fn div_floor(&self, divisor: u64) -> Self {
        if divisor == 0 {
            return Self::zero();
        }
        Self(&self.0 / divisor)
    }

    /// Parses a FIL amount such as `1.5`, `0.000001` or `2 FIL`.
    ///
    /// At most 18 fractional digits are accepted. Signs, exponents and
    /// empty input are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] on malformed input.
    pub fn parse_fil(input: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::invalid_amount(input, reason);

        let trimmed = input.trim();
        let number = trimmed
            .strip_suffix("FIL")
            .or_else(|| trimmed.strip_suffix("fil"))
            .unwrap_or(trimmed)
            .trim_end();

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty amount"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("expected a non-negative decimal number"));
        }
        if frac.len() > FIL_DECIMALS {
            return Err(invalid("more than 18 decimal places"));
        }

        let digits = format!("{whole}{frac:0<width$}", width = FIL_DECIMALS);
        let atto = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| invalid("expected a non-negative decimal number"))?;
        Ok(Self(atto))
    }

    /// Parses a plain attoFIL integer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] unless the input is a
    /// non-empty string of decimal digits.
    pub fn parse_atto(input: &str) -> Result<Self, ValidationError> {
        let digits = input.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::invalid_amount(
                input,
                "expected a non-negative integer",
            ));
        }
        BigUint::parse_bytes(digits.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| ValidationError::invalid_amount(input, "expected a non-negative integer"))
    }

    /// Writes the CBOR big-integer form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] if the magnitude is wider
    /// than 128 bytes, the same error [`read_cbor`](Self::read_cbor) raises
    /// for such an item.
    pub fn write_cbor(&self, enc: &mut Encoder) -> CodecResult<()> {
        if self.0.is_zero() {
            enc.write_bytes(&[]);
            return Ok(());
        }
        let magnitude = self.0.to_bytes_be();
        let mut buf = Vec::with_capacity(magnitude.len() + 1);
        buf.push(0x00);
        buf.extend_from_slice(&magnitude);
        if buf.len() > MAX_BIGINT_BYTES {
            return Err(oversize(buf.len()));
        }
        enc.write_bytes(&buf);
        Ok(())
    }

    /// Reads the CBOR big-integer form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedEncoding`] for a negative sign byte,
    /// an unknown sign byte, a zero-padded magnitude or one wider than
    /// 128 bytes.
    pub fn read_cbor(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let bytes = dec.read_field_bytes(MAX_BIGINT_BYTES, BIGINT_FIELD)?;
        let Some((&sign, magnitude)) = bytes.split_first() else {
            return Ok(Self::zero());
        };
        match sign {
            0x00 => {}
            0x01 => return Err(CodecError::malformed("negative token amount")),
            other => {
                return Err(CodecError::malformed(format!(
                    "invalid big integer sign byte {other:#04x}"
                )))
            }
        }
        if magnitude.first().map_or(true, |&b| b == 0) {
            return Err(CodecError::malformed("big integer is not minimally encoded"));
        }
        Ok(Self(BigUint::from_bytes_be(magnitude)))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = BigUint::from(ATTO_PER_FIL);
        let whole = &self.0 / &unit;
        let frac = &self.0 % &unit;

        if frac.is_zero() {
            return write!(f, "{whole} FIL");
        }
        let frac = format!("{:0>width$}", frac.to_string(), width = FIL_DECIMALS);
        write!(f, "{whole}.{} FIL", frac.trim_end_matches('0'))
    }
}

impl From<u64> for TokenAmount {
    fn from(atto: u64) -> Self {
        Self(BigUint::from(atto))
    }
}

impl From<BigUint> for TokenAmount {
    fn from(atto: BigUint) -> Self {
        Self(atto)
    }
}

impl Mul<u64> for &TokenAmount {
    type Output = TokenAmount;

    fn mul(self, rhs: u64) -> TokenAmount {
        TokenAmount(&self.0 * rhs)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_atto(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn cbor(amount: &TokenAmount) -> Vec<u8> {
        let mut enc = Encoder::new();
        amount.write_cbor(&mut enc).unwrap();
        enc.into_bytes()
    }

    #[test]
    fn test_parse_fil() {
        assert_eq!(
            TokenAmount::parse_fil("1").unwrap(),
            TokenAmount::from_whole(1)
        );
        assert_eq!(
            TokenAmount::parse_fil("1.5 FIL").unwrap().atto().to_string(),
            "1500000000000000000"
        );
        assert_eq!(
            TokenAmount::parse_fil("0.000000000000000001").unwrap(),
            TokenAmount::from(1u64)
        );
        assert_eq!(
            TokenAmount::parse_fil(".25fil").unwrap().atto().to_string(),
            "250000000000000000"
        );
        assert_eq!(TokenAmount::parse_fil("0").unwrap(), TokenAmount::zero());
    }

    #[test]
    fn test_parse_fil_rejects() {
        for bad in ["", ".", "-1", "+1", "1e18", "1.2.3", "abc", "1.0000000000000000001"] {
            assert!(TokenAmount::parse_fil(bad).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_parse_atto() {
        assert_eq!(
            TokenAmount::parse_atto("123").unwrap(),
            TokenAmount::from(123u64)
        );
        assert!(TokenAmount::parse_atto("1.5").is_err());
        assert!(TokenAmount::parse_atto("").is_err());
        assert!(TokenAmount::parse_atto("-3").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenAmount::zero().to_string(), "0 FIL");
        assert_eq!(TokenAmount::from_whole(10).to_string(), "10 FIL");
        assert_eq!(TokenAmount::parse_fil("1.5").unwrap().to_string(), "1.5 FIL");
        assert_eq!(
            TokenAmount::from(1u64).to_string(),
            "0.000000000000000001 FIL"
        );
    }

    #[test]
    fn test_cbor_form() {
        assert_eq!(cbor(&TokenAmount::zero()), vec![0x40]);
        assert_eq!(
            hex::encode(cbor(&TokenAmount::from_whole(1))),
            "49000de0b6b3a7640000"
        );
    }

    #[test]
    fn test_cbor_decode_rejects_negative_and_padding() {
        let err = TokenAmount::read_cbor(&mut Decoder::new(&[0x42, 0x01, 0x05])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));

        let err = TokenAmount::read_cbor(&mut Decoder::new(&[0x43, 0x00, 0x00, 0x05])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));

        let err = TokenAmount::read_cbor(&mut Decoder::new(&[0x41, 0x00])).unwrap_err();
        assert!(matches!(err, CodecError::MalformedEncoding { .. }));
    }

    #[test]
    fn test_cbor_decode_positive() {
        let amount = TokenAmount::read_cbor(&mut Decoder::new(&[0x43, 0x00, 0x01, 0x00])).unwrap();
        assert_eq!(amount, TokenAmount::from(256u64));
    }

    #[test]
    fn test_arithmetic() {
        let five = TokenAmount::from(5u64);
        let three = TokenAmount::from(3u64);

        assert_eq!(five.checked_sub(&three), Some(TokenAmount::from(2u64)));
        assert_eq!(three.checked_sub(&five), None);
        assert_eq!(three.saturating_sub(&five), TokenAmount::zero());
        assert_eq!(&five * 3, TokenAmount::from(15u64));
        assert_eq!(five.div_floor(2), TokenAmount::from(2u64));
        assert_eq!(five.div_floor(0), TokenAmount::zero());
    }

    #[test]
    fn test_json_is_decimal_string() {
        let amount = TokenAmount::from_whole(2);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"2000000000000000000\"");
        assert_eq!(serde_json::from_str::<TokenAmount>(&json).unwrap(), amount);
    }
}
