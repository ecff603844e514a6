//! # Key Import
//!
//! `filsign wallet import` reads one key from a file or stdin.
//!
//! ## Input Formats
//!
//! | Format | Content |
//! |--------|---------|
//! | `hex-lotus` | hex of the Lotus key JSON, as printed by `wallet export` |
//! | `json-lotus` | `{"Type": "secp256k1", "PrivateKey": "<base64>"}` |
//! | `gfc-json` | `{"KeyInfo": [{"PrivateKey": "<base64>", "SigType": 1}]}` |
//!
//! For `gfc-json` only the first entry is imported. `SigType` is 1 for
//! secp256k1 and 2 for BLS.
//!
//! The address is derived from the key, never taken from the input.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use filsign_chain::Address;
use filsign_core::SignatureType;
use filsign_crypto::{derive_address, KeyInfo, KeyVault};
use serde::Deserialize;
use zeroize::Zeroizing;

use super::ImportFormat;
use crate::cli::commands::{CommandContext, CommandError};
use crate::logging::log_security_event;

/// `filsign wallet import`.
#[derive(Debug, Clone)]
pub struct ImportCommand {
    format: ImportFormat,
    input: Option<PathBuf>,
}

impl ImportCommand {
    /// Create a new import command. `None` or `-` reads stdin.
    #[must_use]
    pub const fn new(format: ImportFormat, input: Option<PathBuf>) -> Self {
        Self { format, input }
    }

    /// Read, decode and store the key, printing its address.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or decoded, or the
    /// vault cannot be written.
    pub fn run(&self, ctx: &CommandContext) -> Result<Address, CommandError> {
        let raw = self.read_input()?;
        let vault = ctx.open_vault()?;
        self.run_with(&vault, &raw, &mut io::stdout().lock())
    }

    /// [`run`](Self::run) with the input already read.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be decoded or the vault cannot
    /// be written.
    pub fn run_with(
        &self,
        vault: &impl KeyVault,
        raw: &[u8],
        out: &mut impl Write,
    ) -> Result<Address, CommandError> {
        let key_info = parse_key(self.format, raw)?;
        let address = derive_address(&key_info)?;
        vault.save(&address, &key_info)?;

        log_security_event(
            "key_imported",
            &format!("address={address} type={}", key_info.key_type()),
        );
        writeln!(out, "imported key {address}")?;
        Ok(address)
    }

    fn read_input(&self) -> Result<Zeroizing<Vec<u8>>, CommandError> {
        let mut buf = Zeroizing::new(Vec::new());
        match self.input.as_deref() {
            Some(path) if path != Path::new("-") => {
                std::fs::File::open(path)?.read_to_end(&mut buf)?;
            }
            _ => {
                io::stdin().lock().read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }
}

#[derive(Deserialize)]
struct GfcWallet {
    #[serde(rename = "KeyInfo")]
    key_info: Vec<GfcKey>,
}

#[derive(Deserialize)]
struct GfcKey {
    #[serde(rename = "PrivateKey")]
    private_key: String,
    #[serde(rename = "SigType")]
    sig_type: u8,
}

/// Decodes one key in `format`.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`CommandError::InvalidInput`] for input that does not match the
/// format.
pub fn parse_key(format: ImportFormat, raw: &[u8]) -> Result<KeyInfo, CommandError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| CommandError::InvalidInput("key input is not UTF-8".to_string()))?
        .trim();

    match format {
        ImportFormat::HexLotus => {
            let json = Zeroizing::new(
                hex::decode(text)
                    .map_err(|e| CommandError::InvalidInput(format!("invalid hex: {e}")))?,
            );
            KeyInfo::from_json(&json)
                .map_err(|e| CommandError::InvalidInput(format!("invalid key JSON: {e}")))
        }
        ImportFormat::JsonLotus => KeyInfo::from_json(text.as_bytes())
            .map_err(|e| CommandError::InvalidInput(format!("invalid key JSON: {e}"))),
        ImportFormat::GfcJson => {
            let wallet: GfcWallet = serde_json::from_str(text)
                .map_err(|e| CommandError::InvalidInput(format!("invalid GFC wallet JSON: {e}")))?;
            let first = wallet.key_info.into_iter().next().ok_or_else(|| {
                CommandError::InvalidInput("GFC wallet JSON holds no keys".to_string())
            })?;

            let sig_type = SignatureType::from_byte(first.sig_type).ok_or_else(|| {
                CommandError::InvalidInput(format!("unsupported SigType {}", first.sig_type))
            })?;
            let private_key = Zeroizing::new(
                base64::engine::general_purpose::STANDARD
                    .decode(first.private_key.as_bytes())
                    .map_err(|e| CommandError::InvalidInput(format!("invalid base64: {e}")))?,
            );
            Ok(KeyInfo::new(sig_type, private_key.as_slice()))
        }
    }
}
