//! Private key types with secure memory handling.
//!
//! - [`SecretKey`] is a fixed 32-byte scalar, zeroized on drop, never
//!   cloned and never printed.
//! - [`KeyInfo`] pairs raw private key bytes with their algorithm. It is
//!   the unit the vault encrypts and the form keys are exported in.
//!
//! # Export Format
//!
//! `KeyInfo` serializes to the node's wallet export JSON:
//!
//! ```text
//! {"Type":"secp256k1","PrivateKey":"<base64>"}
//! ```
//!
//! BLS private keys are stored little-endian.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use filsign_core::error::SignError;
use filsign_core::types::SignatureType;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The length of a private key in bytes, for both algorithms.
pub const SECRET_KEY_LEN: usize = 32;

/// A 32-byte secret scalar with automatic zeroization.
///
/// This type intentionally does not implement `Clone`; key material is
/// moved, not copied.
///
/// # Example
///
/// ```
/// use filsign_crypto::keys::SecretKey;
///
/// let key = SecretKey::generate();
/// assert_eq!(key.as_bytes().len(), 32);
/// assert_eq!(format!("{key:?}"), "SecretKey([REDACTED])");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Wraps raw key bytes. The caller should zeroize its own copy.
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Draws 32 bytes from the operating system RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Parses a byte slice that must be exactly 32 bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] for any other length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignError> {
        let bytes: [u8; SECRET_KEY_LEN] = bytes.try_into().map_err(|_| {
            SignError::invalid_key(format!(
                "private key must be {SECRET_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Exposes the raw bytes for a cryptographic operation.
    ///
    /// The reference must not outlive the operation that needs it.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

// ============================================================================
// KeyInfo
// ============================================================================

/// A private key tagged with its signature algorithm.
///
/// The private key length is not checked here; signing and address
/// derivation reject anything but 32 bytes with [`SignError::InvalidKey`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyInfo {
    #[zeroize(skip)]
    key_type: SignatureType,
    private_key: Vec<u8>,
}

impl KeyInfo {
    /// Creates a key info from raw private key bytes.
    #[must_use]
    pub fn new(key_type: SignatureType, private_key: impl Into<Vec<u8>>) -> Self {
        Self {
            key_type,
            private_key: private_key.into(),
        }
    }

    /// The algorithm this key signs with.
    #[must_use]
    pub const fn key_type(&self) -> SignatureType {
        self.key_type
    }

    /// The raw private key bytes.
    #[must_use]
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Copies the private key into a [`SecretKey`].
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the key is not 32 bytes.
    pub fn secret_key(&self) -> Result<SecretKey, SignError> {
        SecretKey::from_slice(&self.private_key)
    }

    /// Serializes to the export JSON.
    ///
    /// # Errors
    ///
    /// Fails only if serialization itself fails.
    pub fn to_json(&self) -> serde_json::Result<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(self).map(Zeroizing::new)
    }

    /// Parses the export JSON.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON, an unknown `Type` or invalid base64.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl std::fmt::Debug for KeyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyInfo")
            .field("key_type", &self.key_type)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for KeyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type
            && bool::from(self.private_key.as_slice().ct_eq(other.private_key.as_slice()))
    }
}

impl Eq for KeyInfo {}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeyInfoJsonOut<'a> {
    #[serde(rename = "Type")]
    key_type: SignatureType,
    private_key: &'a str,
}

/// `Type` is a string in current exports; older wallets wrote the
/// signature type byte.
#[derive(Deserialize)]
#[serde(untagged)]
enum KeyTypeTag {
    Name(String),
    Byte(u8),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyInfoJsonIn {
    #[serde(rename = "Type")]
    key_type: KeyTypeTag,
    private_key: String,
}

impl Serialize for KeyInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(BASE64.encode(&self.private_key));
        KeyInfoJsonOut {
            key_type: self.key_type,
            private_key: &encoded,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        let mut json = KeyInfoJsonIn::deserialize(deserializer)?;
        let key_type = match json.key_type {
            KeyTypeTag::Name(name) => name.parse().map_err(D::Error::custom)?,
            KeyTypeTag::Byte(byte) => SignatureType::from_byte(byte)
                .ok_or_else(|| D::Error::custom(format!("unknown key type {byte}")))?,
        };
        let private_key = BASE64.decode(json.private_key.as_bytes());
        json.private_key.zeroize();
        let private_key = private_key.map_err(D::Error::custom)?;
        Ok(Self {
            key_type,
            private_key,
        })
    }
}
