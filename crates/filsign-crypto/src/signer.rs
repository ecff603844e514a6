//! Algorithm dispatch over stored keys.
//!
//! [`Signer`] is a closed enum over the two key pair types. Every operation
//! matches on it exhaustively, so adding an algorithm is a compile error
//! until each path handles it.
//!
//! # Example
//!
//! ```rust
//! use filsign_core::SignatureType;
//! use filsign_crypto::signer::{generate_key, sign, verify};
//!
//! let (key_info, address) = generate_key(SignatureType::Secp256k1);
//! let signature = sign(&key_info, b"cid bytes").expect("signing failed");
//! assert!(verify(&address, &signature, b"cid bytes").is_ok());
//! ```

use filsign_chain::address::{Address, Protocol};
use filsign_chain::message::Signature;
use filsign_core::error::SignError;
use filsign_core::types::SignatureType;

use crate::keypair::{recover_secp256k1_address, verify_bls, BlsKeyPair, KeyPair, Secp256k1KeyPair};
use crate::keys::KeyInfo;

/// A loaded key of either algorithm.
#[derive(Debug)]
pub enum Signer {
    /// secp256k1 key.
    Secp256k1(Secp256k1KeyPair),
    /// BLS12-381 key.
    Bls(BlsKeyPair),
}

impl Signer {
    /// Generates a new key of the given algorithm.
    #[must_use]
    pub fn generate(sig_type: SignatureType) -> Self {
        match sig_type {
            SignatureType::Secp256k1 => Self::Secp256k1(Secp256k1KeyPair::generate()),
            SignatureType::Bls => Self::Bls(BlsKeyPair::generate()),
        }
    }

    /// Loads a stored key.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidKey`] if the private key is not 32 bytes
    /// or not valid for its algorithm.
    pub fn from_key_info(key_info: &KeyInfo) -> Result<Self, SignError> {
        let secret = key_info.secret_key()?;
        match key_info.key_type() {
            SignatureType::Secp256k1 => {
                Secp256k1KeyPair::from_bytes(*secret.as_bytes()).map(Self::Secp256k1)
            }
            SignatureType::Bls => BlsKeyPair::from_bytes(*secret.as_bytes()).map(Self::Bls),
        }
    }

    /// The algorithm of this key.
    #[must_use]
    pub const fn sig_type(&self) -> SignatureType {
        match self {
            Self::Secp256k1(_) => SignatureType::Secp256k1,
            Self::Bls(_) => SignatureType::Bls,
        }
    }

    /// The account address of this key.
    #[must_use]
    pub fn address(&self) -> Address {
        match self {
            Self::Secp256k1(pair) => pair.address(),
            Self::Bls(pair) => pair.address(),
        }
    }

    /// The public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        match self {
            Self::Secp256k1(pair) => pair.public_key(),
            Self::Bls(pair) => pair.public_key(),
        }
    }

    /// Exports the private key.
    #[must_use]
    pub fn key_info(&self) -> KeyInfo {
        let secret = match self {
            Self::Secp256k1(pair) => pair.secret_bytes(),
            Self::Bls(pair) => pair.secret_bytes(),
        };
        KeyInfo::new(self.sig_type(), secret.as_bytes().to_vec())
    }

    /// Signs `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::SignatureFailed`] if the primitive fails.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature, SignError> {
        match self {
            Self::Secp256k1(pair) => pair.sign(payload),
            Self::Bls(pair) => pair.sign(payload),
        }
    }
}

/// Generates a key and returns it with its address.
#[must_use]
pub fn generate_key(sig_type: SignatureType) -> (KeyInfo, Address) {
    let signer = Signer::generate(sig_type);
    (signer.key_info(), signer.address())
}

/// Derives the account address of a stored key.
///
/// # Errors
///
/// Returns [`SignError::InvalidKey`] for malformed key material.
pub fn derive_address(key_info: &KeyInfo) -> Result<Address, SignError> {
    Signer::from_key_info(key_info).map(|s| s.address())
}

/// Signs `payload` with a stored key.
///
/// # Errors
///
/// Returns [`SignError::InvalidKey`] for malformed key material and
/// [`SignError::SignatureFailed`] if the primitive fails.
pub fn sign(key_info: &KeyInfo, payload: &[u8]) -> Result<Signature, SignError> {
    Signer::from_key_info(key_info)?.sign(payload)
}

/// Checks that `signature` over `payload` was made by the key behind
/// `address`.
///
/// secp256k1 signatures are checked by recovering the public key and
/// comparing addresses; BLS signatures by the pairing equation against the
/// public key embedded in the address. A signature type that does not match
/// the address protocol always fails.
///
/// # Errors
///
/// Returns [`SignError::VerificationFailed`] when the check fails.
pub fn verify(address: &Address, signature: &Signature, payload: &[u8]) -> Result<(), SignError> {
    match (signature.sig_type, address.protocol()) {
        (SignatureType::Secp256k1, Protocol::Secp256k1) => {
            let recovered = recover_secp256k1_address(payload, &signature.data)?;
            if recovered == *address {
                Ok(())
            } else {
                Err(SignError::VerificationFailed)
            }
        }
        (SignatureType::Bls, Protocol::Bls) => {
            let public_key = address
                .bls_public_key()
                .ok_or(SignError::VerificationFailed)?;
            verify_bls(public_key, payload, &signature.data)
        }
        _ => Err(SignError::VerificationFailed),
    }
}
