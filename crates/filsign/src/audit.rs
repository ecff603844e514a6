//! # Audit Trail with HMAC Chain
//!
//! Tamper-evident record of every message the executor broadcasts.
//!
//! Each entry carries an HMAC-SHA256 over its fields and the previous
//! entry's HMAC, so editing, dropping or reordering any historical entry
//! breaks verification from that point on.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/audit.key                 32-byte key, hex, mode 0600
//! <base_dir>/audit/audit.jsonl         current log, one JSON entry per line
//! <base_dir>/audit/audit.jsonl.N.gz    rotated segments, oldest first
//! ```
//!
//! The log rotates once it reaches 10 MiB. The chain continues across
//! segments: the first entry of a fresh segment is chained to the last
//! entry of the previous one, and [`AuditLogger::verify_chain`] walks the
//! segments in order.
//!
//! ## Example
//!
//! ```no_run
//! use filsign::audit::{AuditLogger, SignEvent};
//! use filsign_chain::{Address, Cid, TokenAmount};
//! use filsign_core::{OperationKind, SignatureType};
//! use std::path::Path;
//!
//! let logger = AuditLogger::open(Path::new("/home/user/.filsign"))?;
//!
//! logger.log_sign_event(&SignEvent {
//!     correlation_id: "abc123".to_string(),
//!     operation: OperationKind::Transfer,
//!     from: "f1pzrmbh7zfrppecothkiafiskbfnjza3ruommgta".parse()?,
//!     to: Address::new_id(1234),
//!     nonce: 7,
//!     value: TokenAmount::from_whole(1),
//!     method: 0,
//!     cid: "bafy2bzacebzxqimg5ynjfn57rdez64efajalcvdixus477neykvqjbthvnuig".parse()?,
//!     sig_type: SignatureType::Secp256k1,
//! })?;
//!
//! assert!(logger.verify_chain()?.is_valid());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use chrono::{SecondsFormat, Utc};
use filsign_chain::{Address, Cid, TokenAmount};
use filsign_core::{OperationKind, SignatureType};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type ChainMac = Hmac<Sha256>;

/// 10 MiB.
const ROTATE_AT_BYTES: u64 = 10 << 20;

const LOG_SUBDIR: &str = "audit";
const LOG_FILE: &str = "audit.jsonl";
const KEY_FILE: &str = "audit.key";

/// Separates fields in the HMAC input.
const FIELD_SEPARATOR: &[u8] = b"||";

/// What entry 0 is chained to.
fn genesis_hmac() -> String {
    "0".repeat(64)
}

/// One line of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    /// Position in the chain, starting at 0.
    pub seq: u64,

    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,

    /// Correlation ID of the operation that broadcast the message.
    pub correlation_id: String,

    /// Operation kind (`transfer`, `miner_withdraw`, ...).
    pub operation: String,

    /// Signing address.
    pub from: String,

    /// Recipient.
    pub to: String,

    /// Sender nonce.
    pub nonce: u64,

    /// Value in attoFIL.
    pub value: String,

    /// Actor method number.
    pub method: u64,

    /// CID returned by the node.
    pub cid: String,

    /// `secp256k1` or `bls`.
    pub sig_type: String,

    /// HMAC-SHA256 over this entry and the previous entry's HMAC.
    pub hmac: String,
}

/// A broadcast message, as reported by the executor.
#[derive(Debug, Clone)]
pub struct SignEvent {
    /// Correlation ID of the operation.
    pub correlation_id: String,
    /// Operation kind.
    pub operation: OperationKind,
    /// Signing address.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Sender nonce.
    pub nonce: u64,
    /// Value transferred.
    pub value: TokenAmount,
    /// Actor method number.
    pub method: u64,
    /// CID returned by the node.
    pub cid: Cid,
    /// Algorithm the message was signed with.
    pub sig_type: SignatureType,
}

/// Receiver of [`SignEvent`]s.
///
/// The executor calls [`record`](Self::record) after every successful
/// broadcast. A failing sink does not fail the operation, since the message
/// is already in the mpool by then.
pub trait SignEventSink: Send + Sync {
    /// Records one broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the event could not be persisted.
    fn record(&self, event: &SignEvent) -> Result<(), AuditError>;
}

/// Where and why verification stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBreak {
    /// `seq` field of the offending entry.
    pub seq: u64,
    /// Human-readable cause.
    pub reason: String,
}

/// Outcome of [`AuditLogger::verify_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// Entries that verified before the break, or all of them.
    pub entries_checked: u64,
    /// `None` when every entry verified.
    pub broken: Option<ChainBreak>,
}

impl ChainReport {
    /// Whether the whole chain verified.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.broken.is_none()
    }
}

/// Audit log failures.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// File access failed.
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be serialized or parsed.
    #[error("malformed audit entry: {0}")]
    Serialization(String),

    /// The key file is not a 32-byte key.
    #[error("invalid audit key: {0}")]
    InvalidKey(String),

    /// The existing log does not verify.
    #[error("audit chain broken at seq {}: {}", .0.seq, .0.reason)]
    ChainBroken(ChainBreak),

    /// Compressing the current log failed.
    #[error("audit log rotation failed: {0}")]
    Rotation(String),

    /// A writer panicked while holding the chain state.
    #[error("audit state poisoned")]
    Poisoned,
}

struct ChainState {
    next_seq: u64,
    last_hmac: String,
}

/// Append-only HMAC-chained audit log.
///
/// Appends are serialized through an internal lock, so one logger can be
/// shared between tasks.
pub struct AuditLogger {
    log_dir: PathBuf,
    log_path: PathBuf,
    hmac_key: [u8; 32],
    state: Mutex<ChainState>,
    max_file_size: u64,
}

impl AuditLogger {
    /// Opens the audit log under `base_dir`, creating the key on first use.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the key cannot be read or created, or the
    /// existing log does not verify.
    pub fn open(base_dir: &Path) -> Result<Self, AuditError> {
        let key = load_or_create_key(&base_dir.join(KEY_FILE))?;
        Self::new(&base_dir.join(LOG_SUBDIR), &key)
    }

    /// Creates a logger writing to `log_dir` with an explicit key.
    ///
    /// The existing chain, if any, is verified and continued.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the directory cannot be created or the
    /// existing log does not verify.
    pub fn new(log_dir: &Path, hmac_key: &[u8; 32]) -> Result<Self, AuditError> {
        fs::create_dir_all(log_dir)?;

        let mut logger = Self {
            log_dir: log_dir.to_path_buf(),
            log_path: log_dir.join(LOG_FILE),
            hmac_key: *hmac_key,
            state: Mutex::new(ChainState {
                next_seq: 0,
                last_hmac: genesis_hmac(),
            }),
            max_file_size: ROTATE_AT_BYTES,
        };
        logger.restore_state()?;
        Ok(logger)
    }

    /// Overrides the rotation threshold.
    #[must_use]
    pub const fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Path of the current log segment.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Appends an entry for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if rotation or the write fails.
    #[allow(clippy::significant_drop_tightening)]
    pub fn log_sign_event(&self, event: &SignEvent) -> Result<(), AuditError> {
        let mut state = self.state.lock().map_err(|_| AuditError::Poisoned)?;

        self.rotate_if_needed()?;

        let mut entry = AuditEntry {
            seq: state.next_seq,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            correlation_id: event.correlation_id.clone(),
            operation: event.operation.to_string(),
            from: event.from.to_string(),
            to: event.to.to_string(),
            nonce: event.nonce,
            value: event.value.atto().to_string(),
            method: event.method,
            cid: event.cid.to_string(),
            sig_type: event.sig_type.to_string(),
            hmac: String::new(),
        };
        entry.hmac = entry_hmac(&self.hmac_key, &entry, &state.last_hmac);
        self.append(&entry)?;

        state.next_seq += 1;
        state.last_hmac = entry.hmac;
        Ok(())
    }

    /// Walks every segment, oldest first, and checks sequence numbers and
    /// HMACs.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if a segment cannot be read or a line is not
    /// an entry.
    pub fn verify_chain(&self) -> Result<ChainReport, AuditError> {
        Ok(self.walk_chain()?.0)
    }

    /// Verifies every entry and also returns the HMAC of the last good one.
    fn walk_chain(&self) -> Result<(ChainReport, String), AuditError> {
        let mut last_hmac = genesis_hmac();
        let mut checked = 0;

        for entry in self.entries()? {
            let entry = entry?;
            let reason = if entry.seq != checked {
                Some(format!("expected seq {checked}, found {}", entry.seq))
            } else if entry.hmac != entry_hmac(&self.hmac_key, &entry, &last_hmac) {
                Some("HMAC does not match contents".to_string())
            } else {
                None
            };
            if let Some(reason) = reason {
                let broken = Some(ChainBreak {
                    seq: entry.seq,
                    reason,
                });
                return Ok((
                    ChainReport {
                        entries_checked: checked,
                        broken,
                    },
                    last_hmac,
                ));
            }
            last_hmac = entry.hmac;
            checked += 1;
        }

        let report = ChainReport {
            entries_checked: checked,
            broken: None,
        };
        Ok((report, last_hmac))
    }

    fn restore_state(&mut self) -> Result<(), AuditError> {
        let (report, last_hmac) = self.walk_chain()?;
        if let Some(broken) = report.broken {
            return Err(AuditError::ChainBroken(broken));
        }
        let state = self.state.get_mut().map_err(|_| AuditError::Poisoned)?;
        state.next_seq = report.entries_checked;
        state.last_hmac = last_hmac;
        Ok(())
    }

    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_vec(entry).map_err(|e| AuditError::Serialization(e.to_string()))?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    fn rotated_path(&self, n: u32) -> PathBuf {
        self.log_dir.join(format!("{LOG_FILE}.{n}.gz"))
    }

    fn rotated_segments(&self) -> Vec<PathBuf> {
        (1..)
            .map(|n| self.rotated_path(n))
            .take_while(|path| path.exists())
            .collect()
    }

    /// Entries of every segment, oldest first.
    fn entries(&self) -> Result<impl Iterator<Item = Result<AuditEntry, AuditError>>, AuditError> {
        let mut readers: Vec<Box<dyn Read>> = Vec::new();
        for path in self.rotated_segments() {
            readers.push(Box::new(GzDecoder::new(File::open(path)?)));
        }
        if self.log_path.exists() {
            readers.push(Box::new(File::open(&self.log_path)?));
        }

        Ok(readers
            .into_iter()
            .flat_map(|reader| BufReader::new(reader).lines())
            .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
            .map(|line| {
                let line = line?;
                serde_json::from_str(&line).map_err(|e| AuditError::Serialization(e.to_string()))
            }))
    }

    fn rotate_if_needed(&self) -> Result<(), AuditError> {
        let size = match fs::metadata(&self.log_path) {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        if size < self.max_file_size {
            return Ok(());
        }

        let next = u32::try_from(self.rotated_segments().len() + 1)
            .map_err(|_| AuditError::Rotation("segment count overflow".to_string()))?;
        let segment = self.rotated_path(next);
        let failed = |step: &str, e: std::io::Error| AuditError::Rotation(format!("{step}: {e}"));

        let mut current = File::open(&self.log_path).map_err(|e| failed("open log", e))?;
        let target = File::create(&segment).map_err(|e| failed("create segment", e))?;
        let mut gz = GzEncoder::new(BufWriter::new(target), Compression::default());
        std::io::copy(&mut current, &mut gz).map_err(|e| failed("compress", e))?;
        gz.finish()
            .and_then(|mut out| out.flush())
            .map_err(|e| failed("finish segment", e))?;

        File::create(&self.log_path).map_err(|e| failed("truncate log", e))?;

        tracing::info!(segment = %segment.display(), "audit log rotated");
        Ok(())
    }
}

impl SignEventSink for AuditLogger {
    fn record(&self, event: &SignEvent) -> Result<(), AuditError> {
        self.log_sign_event(event)
    }
}

// hmac_key stays out of the output
impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("dir", &self.log_dir)
            .field("rotate_at", &self.max_file_size)
            .finish_non_exhaustive()
    }
}

/// HMAC over every field except `hmac` itself, then `prev_hmac`.
fn entry_hmac(key: &[u8; 32], entry: &AuditEntry, prev_hmac: &str) -> String {
    let (seq, nonce, method) = (
        entry.seq.to_string(),
        entry.nonce.to_string(),
        entry.method.to_string(),
    );
    let fields: [&str; 11] = [
        &seq,
        &entry.timestamp,
        &entry.correlation_id,
        &entry.operation,
        &entry.from,
        &entry.to,
        &nonce,
        &entry.value,
        &method,
        &entry.cid,
        &entry.sig_type,
    ];

    let mut mac = <ChainMac as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    for field in fields {
        mac.update(field.as_bytes());
        mac.update(FIELD_SEPARATOR);
    }
    mac.update(prev_hmac.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Reads the hex key at `path`, generating it if the file does not exist.
fn load_or_create_key(path: &Path) -> Result<[u8; 32], AuditError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_key(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut key = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut key);
            write_key(path, &key)?;
            tracing::info!(path = %path.display(), "generated audit key");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_key(contents: &str) -> Result<[u8; 32], AuditError> {
    let bytes = hex::decode(contents.trim())
        .map_err(|e| AuditError::InvalidKey(format!("not hex: {e}")))?;
    let len = bytes.len();
    <[u8; 32]>::try_from(bytes)
        .map_err(|_| AuditError::InvalidKey(format!("{len} bytes, need 32")))
}

fn write_key(path: &Path, key: &[u8; 32]) -> Result<(), AuditError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    file.write_all(hex::encode(key).as_bytes())?;
    file.flush()?;

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}
