//! Key pairs for the two signature algorithms.
//!
//! - [`Secp256k1KeyPair`] - standard accounts (`f1` addresses)
//! - [`BlsKeyPair`] - BLS12-381 accounts (`f3` addresses)
//!
//! Both sign the same payload, the raw CID bytes of the unsigned message.
//! secp256k1 signs a blake2b-256 digest of it; BLS hashes it straight onto
//! G2 with no intermediate digest.
//!
//! # Example
//!
//! ```rust
//! use filsign_crypto::keypair::{BlsKeyPair, KeyPair, Secp256k1KeyPair};
//!
//! let secp = Secp256k1KeyPair::generate();
//! let sig = secp.sign(b"payload").expect("signing failed");
//! assert_eq!(sig.data.len(), 65);
//! assert!(secp.address().to_string().starts_with("f1"));
//!
//! let bls = BlsKeyPair::generate();
//! let sig = bls.sign(b"payload").expect("signing failed");
//! assert_eq!(sig.data.len(), 96);
//! assert!(bls.address().to_string().starts_with("f3"));
//! ```

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use bls12_381::hash_to_curve::{ExpandMsgXmd, HashToCurve};
use bls12_381::{G1Affine, G1Projective, G2Affine, G2Projective, Scalar};
use filsign_chain::address::{Address, BLS_PUBLIC_KEY_LEN};
use filsign_chain::message::Signature;
use filsign_core::error::SignError;
use hkdf::Hkdf;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::keys::{SecretKey, SECRET_KEY_LEN};

/// Domain separation tag for BLS signatures (min-pk, proof of possession
/// not required).
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// HKDF salt for deriving a BLS key from a seed.
pub const BLS_KEYGEN_SALT: &[u8] = b"BLS-SIG-KEYGEN-SALT-";

/// Minimum seed length for BLS key generation.
pub const BLS_MIN_SEED_LEN: usize = 32;

/// Length of a compressed BLS signature.
pub const BLS_SIGNATURE_LEN: usize = 96;

/// Length of a recoverable secp256k1 signature.
pub const SECP256K1_SIGNATURE_LEN: usize = 65;

// ============================================================================
// KeyPair Trait
// ============================================================================

/// A private key together with its derived public key and address.
///
/// # Thread Safety
///
/// Implementations are `Send + Sync` so one key pair can serve concurrent
/// signing calls.
pub trait KeyPair: Send + Sync {
    /// Generates a new random key pair.
    #[must_use]
    fn generate() -> Self
    where
        Self: Sized;

    /// Builds a key pair from the 32-byte private key as stored in a
    /// [`KeyInfo`](crate::keys::KeyInfo).
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the bytes are not a valid key.
    fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Result<Self, SignError>
    where
        Self: Sized;

    /// The private key bytes in storage order.
    fn secret_bytes(&self) -> SecretKey;

    /// The public key in the form the address is derived from.
    fn public_key(&self) -> &[u8];

    /// The account address of this key.
    fn address(&self) -> Address;

    /// Signs `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::SignatureFailed`] if the primitive fails.
    fn sign(&self, payload: &[u8]) -> Result<Signature, SignError>;
}

// ============================================================================
// Secp256k1
// ============================================================================

/// blake2b-256 of `data`.
#[must_use]
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b::<U32>::digest(data));
    out
}

/// secp256k1 key pair.
///
/// Signatures are 65 bytes `r || s || v` with `s` normalized to the lower
/// half of the curve order.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
    /// Uncompressed SEC1 public key (65 bytes).
    public_key: Vec<u8>,
}

impl Secp256k1KeyPair {
    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();
        Self {
            signing_key,
            public_key,
        }
    }
}

impl KeyPair for Secp256k1KeyPair {
    fn generate() -> Self {
        loop {
            let secret = SecretKey::generate();
            // A uniform 32-byte value is zero or above the order with
            // probability ~2^-128.
            if let Ok(pair) = Self::from_bytes(*secret.as_bytes()) {
                return pair;
            }
        }
    }

    fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Result<Self, SignError> {
        let mut bytes = bytes;
        let signing_key = SigningKey::from_bytes((&bytes).into())
            .map_err(|_| SignError::invalid_key("not a valid secp256k1 scalar"));
        bytes.zeroize();
        Ok(Self::from_signing_key(signing_key?))
    }

    fn secret_bytes(&self) -> SecretKey {
        let mut field_bytes = self.signing_key.to_bytes();
        let secret = SecretKey::from_slice(&field_bytes)
            .unwrap_or_else(|_| unreachable!("secp256k1 scalars are 32 bytes"));
        field_bytes.as_mut_slice().zeroize();
        secret
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn address(&self) -> Address {
        Address::new_secp256k1(&self.public_key)
            .unwrap_or_else(|_| unreachable!("k256 always encodes a 65-byte uncompressed key"))
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SignError> {
        let digest = blake2b_256(payload);
        let (signature, recovery_id): (K256Signature, RecoveryId) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|_| SignError::signature_failed("secp256k1 signing failed"))?;

        let normalized = signature.normalize_s();
        let v = if normalized.is_some() {
            recovery_id.to_byte() ^ 1
        } else {
            recovery_id.to_byte()
        };

        let mut data = Vec::with_capacity(SECP256K1_SIGNATURE_LEN);
        data.extend_from_slice(&normalized.unwrap_or(signature).to_bytes());
        data.push(v);
        Ok(Signature::new_secp256k1(data))
    }
}

impl std::fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Recovers the signer's address from a secp256k1 signature.
///
/// # Errors
///
/// Returns [`SignError::VerificationFailed`] if the signature is malformed
/// or no key can be recovered.
pub fn recover_secp256k1_address(payload: &[u8], signature: &[u8]) -> Result<Address, SignError> {
    let (rs, v) = match signature {
        [rs @ .., v] if rs.len() == 64 => (rs, *v),
        _ => return Err(SignError::VerificationFailed),
    };
    let sig = K256Signature::from_slice(rs).map_err(|_| SignError::VerificationFailed)?;
    let recovery_id = RecoveryId::from_byte(v).ok_or(SignError::VerificationFailed)?;

    let key = VerifyingKey::recover_from_prehash(&blake2b_256(payload), &sig, recovery_id)
        .map_err(|_| SignError::VerificationFailed)?;
    Address::new_secp256k1(key.to_encoded_point(false).as_bytes())
        .map_err(|_| SignError::VerificationFailed)
}

// ============================================================================
// BLS
// ============================================================================

/// Reads a little-endian 32-byte private key as a scalar mod the group order.
fn scalar_from_le(bytes: &[u8; SECRET_KEY_LEN]) -> Scalar {
    let mut wide = [0u8; 64];
    wide[..SECRET_KEY_LEN].copy_from_slice(bytes);
    let scalar = Scalar::from_bytes_wide(&wide);
    wide.zeroize();
    scalar
}

fn hash_to_g2(payload: &[u8]) -> G2Projective {
    <G2Projective as HashToCurve<ExpandMsgXmd<bls_sha2::Sha256>>>::hash_to_curve(payload, BLS_DST)
}

/// BLS12-381 key pair with public keys in G1 and signatures in G2.
pub struct BlsKeyPair {
    scalar: Scalar,
    public_key: [u8; BLS_PUBLIC_KEY_LEN],
}

impl BlsKeyPair {
    /// Derives a key from a random seed of at least 32 bytes with
    /// HKDF-SHA256.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidSeed`] if the seed is too short.
    pub fn from_seed(seed: &[u8]) -> Result<Self, SignError> {
        if seed.len() < BLS_MIN_SEED_LEN {
            return Err(SignError::InvalidSeed {
                len: seed.len(),
                min: BLS_MIN_SEED_LEN,
            });
        }

        let mut okm = [0u8; SECRET_KEY_LEN];
        Hkdf::<Sha256>::new(Some(BLS_KEYGEN_SALT), seed)
            .expand(&[], &mut okm)
            .map_err(|_| SignError::signature_failed("HKDF output length rejected"))?;

        let scalar = scalar_from_le(&okm);
        okm.zeroize();
        if scalar == Scalar::zero() {
            return Err(SignError::invalid_key("derived BLS scalar is zero"));
        }
        Ok(Self::from_scalar(scalar))
    }

    fn from_scalar(scalar: Scalar) -> Self {
        let public_key = G1Affine::from(G1Projective::generator() * scalar).to_compressed();
        Self { scalar, public_key }
    }
}

impl KeyPair for BlsKeyPair {
    fn generate() -> Self {
        loop {
            let mut seed = [0u8; BLS_MIN_SEED_LEN];
            rand::rngs::OsRng.fill_bytes(&mut seed);
            let pair = Self::from_seed(&seed);
            seed.zeroize();
            if let Ok(pair) = pair {
                return pair;
            }
        }
    }

    fn from_bytes(bytes: [u8; SECRET_KEY_LEN]) -> Result<Self, SignError> {
        let mut bytes = bytes;
        let scalar = scalar_from_le(&bytes);
        bytes.zeroize();
        if scalar == Scalar::zero() {
            return Err(SignError::invalid_key("BLS private key is zero"));
        }
        Ok(Self::from_scalar(scalar))
    }

    fn secret_bytes(&self) -> SecretKey {
        SecretKey::new(self.scalar.to_bytes())
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn address(&self) -> Address {
        Address::new_bls(self.public_key)
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SignError> {
        let point = hash_to_g2(payload) * self.scalar;
        Ok(Signature::new_bls(
            G2Affine::from(point).to_compressed().to_vec(),
        ))
    }
}

impl Drop for BlsKeyPair {
    fn drop(&mut self) {
        self.scalar = Scalar::zero();
    }
}

impl std::fmt::Debug for BlsKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsKeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Checks a BLS signature against a compressed G1 public key.
///
/// # Errors
///
/// Returns [`SignError::VerificationFailed`] if either point fails to
/// decode or the pairing check does not hold.
pub fn verify_bls(
    public_key: &[u8; BLS_PUBLIC_KEY_LEN],
    payload: &[u8],
    signature: &[u8],
) -> Result<(), SignError> {
    let sig_bytes: &[u8; BLS_SIGNATURE_LEN] = signature
        .try_into()
        .map_err(|_| SignError::VerificationFailed)?;
    let pk: Option<G1Affine> = G1Affine::from_compressed(public_key).into();
    let sig: Option<G2Affine> = G2Affine::from_compressed(sig_bytes).into();
    let (Some(pk), Some(sig)) = (pk, sig) else {
        return Err(SignError::VerificationFailed);
    };

    let hashed = G2Affine::from(hash_to_g2(payload));
    if bls12_381::pairing(&G1Affine::generator(), &sig) == bls12_381::pairing(&pk, &hashed) {
        Ok(())
    } else {
        Err(SignError::VerificationFailed)
    }
}
