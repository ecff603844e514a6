//! Master key derivation and AEAD encryption for vault records.
//!
//! The master key is derived once per process from the configured seed and
//! held in a [`VaultContext`]. Every vault operation takes the context by
//! reference; there is no global key.
//!
//! # Key Derivation
//!
//! ```text
//! salt       = SHA-256(seed)
//! scrypt_key = scrypt(seed, salt, N = 2^17, r = 8, p = 1, 32 bytes)
//! master_key = Argon2id(scrypt_key, salt, t = 3, m = 64 MiB, p = 4, 32 bytes)
//! ```
//!
//! # Record Format
//!
//! ```text
//! ┌─────────────────────────────┐
//! │ nonce: [u8; 12]             │
//! │ ciphertext: [u8; n]         │
//! │ tag: [u8; 16]               │
//! └─────────────────────────────┘
//! ```
//!
//! A fresh random nonce is drawn for every record. A failed tag check is
//! reported as [`StoreError::DecryptionFailed`] and nothing of the plaintext
//! is returned.
//!
//! # Example
//!
//! ```rust
//! use filsign_crypto::encryption::{KdfParams, VaultContext};
//!
//! // cheap parameters; production uses `KdfParams::default()`
//! let ctx = VaultContext::with_params("my seed", &KdfParams::insecure_for_tests()).unwrap();
//! let sealed = ctx.encrypt(b"key info").unwrap();
//! assert_eq!(ctx.decrypt(&sealed).unwrap().as_slice(), b"key info");
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use filsign_core::error::StoreError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

// ============================================================================
// Constants
// ============================================================================

/// Length of the AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Length of the master key in bytes.
pub const MASTER_KEY_LEN: usize = 32;

const SCRYPT_LOG_N: u8 = 17;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

const ARGON2_MEMORY_KIB: u32 = 65536; // 64 MiB
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 4;

// ============================================================================
// KdfParams
// ============================================================================

/// Cost parameters for the two key derivation stages.
///
/// [`Default`] gives the production values. Changing them changes the
/// master key, so an existing vault only opens with the parameters it was
/// written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// scrypt cost as a power of two.
    pub scrypt_log_n: u8,
    /// scrypt block size.
    pub scrypt_r: u32,
    /// scrypt parallelism.
    pub scrypt_p: u32,
    /// Argon2id memory in KiB.
    pub argon2_memory_kib: u32,
    /// Argon2id iterations.
    pub argon2_iterations: u32,
    /// Argon2id lanes.
    pub argon2_parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            scrypt_log_n: SCRYPT_LOG_N,
            scrypt_r: SCRYPT_R,
            scrypt_p: SCRYPT_P,
            argon2_memory_kib: ARGON2_MEMORY_KIB,
            argon2_iterations: ARGON2_ITERATIONS,
            argon2_parallelism: ARGON2_PARALLELISM,
        }
    }
}

impl KdfParams {
    /// Minimal parameters for tests. Never use these for a real vault.
    #[must_use]
    pub const fn insecure_for_tests() -> Self {
        Self {
            scrypt_log_n: 4,
            scrypt_r: 8,
            scrypt_p: 1,
            argon2_memory_kib: 64,
            argon2_iterations: 1,
            argon2_parallelism: 1,
        }
    }
}

/// Derives the 32-byte master key from `seed`.
///
/// # Errors
///
/// Returns [`StoreError::KeyDerivationFailed`] for an empty seed or
/// parameters either KDF rejects.
pub fn derive_master_key(
    seed: &str,
    params: &KdfParams,
) -> Result<Zeroizing<[u8; MASTER_KEY_LEN]>, StoreError> {
    if seed.is_empty() {
        return Err(StoreError::key_derivation("seed is empty"));
    }

    let salt = Sha256::digest(seed.as_bytes());

    let scrypt_params = scrypt::Params::new(
        params.scrypt_log_n,
        params.scrypt_r,
        params.scrypt_p,
        MASTER_KEY_LEN,
    )
    .map_err(|e| StoreError::key_derivation(format!("scrypt parameters: {e}")))?;
    let mut scrypt_key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
    scrypt::scrypt(seed.as_bytes(), &salt, &scrypt_params, &mut scrypt_key[..])
        .map_err(|e| StoreError::key_derivation(format!("scrypt: {e}")))?;

    let argon2_params = Params::new(
        params.argon2_memory_kib,
        params.argon2_iterations,
        params.argon2_parallelism,
        Some(MASTER_KEY_LEN),
    )
    .map_err(|e| StoreError::key_derivation(format!("argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut master_key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
    argon2
        .hash_password_into(&scrypt_key[..], &salt, &mut master_key[..])
        .map_err(|e| StoreError::key_derivation(format!("argon2: {e}")))?;

    Ok(master_key)
}

// ============================================================================
// VaultContext
// ============================================================================

/// The derived master key, built once at startup and shared by reference.
pub struct VaultContext {
    master_key: Zeroizing<[u8; MASTER_KEY_LEN]>,
}

impl VaultContext {
    /// Derives the master key with production parameters.
    ///
    /// This takes on the order of a second.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyDerivationFailed`] for an empty seed.
    pub fn from_seed(seed: &str) -> Result<Self, StoreError> {
        Self::with_params(seed, &KdfParams::default())
    }

    /// Derives the master key with explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KeyDerivationFailed`] for an empty seed or
    /// invalid parameters.
    pub fn with_params(seed: &str, params: &KdfParams) -> Result<Self, StoreError> {
        Ok(Self {
            master_key: derive_master_key(seed, params)?,
        })
    }

    /// Encrypts `plaintext` as `nonce || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EncryptionFailed`] if the cipher fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let cipher = Aes256Gcm::new_from_slice(&self.master_key[..])
            .map_err(|_| StoreError::EncryptionFailed)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|_| StoreError::EncryptionFailed)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypts a record produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidFormat`] if the record is shorter than a nonce
    ///   and tag
    /// - [`StoreError::DecryptionFailed`] if the tag does not verify
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(StoreError::invalid_format(format!(
                "encrypted record is {} bytes, minimum is {}",
                sealed.len(),
                NONCE_LEN + TAG_LEN
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new_from_slice(&self.master_key[..])
            .map_err(|_| StoreError::DecryptionFailed)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| StoreError::DecryptionFailed)
    }
}

impl std::fmt::Debug for VaultContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultContext")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}
