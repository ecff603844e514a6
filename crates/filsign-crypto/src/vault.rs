//! Encrypted key vault backed by `SQLite`.
//!
//! Each record maps an address string to its [`KeyInfo`], sealed with the
//! master key held by a [`VaultContext`]. The address and key type columns
//! are stored in clear for lookup and listing.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use filsign_core::SignatureType;
//! use filsign_crypto::encryption::{KdfParams, VaultContext};
//! use filsign_crypto::signer::generate_key;
//! use filsign_crypto::vault::{KeyVault, SqliteKeyVault};
//!
//! let ctx = VaultContext::with_params("seed", &KdfParams::insecure_for_tests()).unwrap();
//! let vault = SqliteKeyVault::in_memory(Arc::new(ctx)).unwrap();
//!
//! let (key_info, address) = generate_key(SignatureType::Secp256k1);
//! vault.save(&address, &key_info).unwrap();
//! assert!(vault.has(&address));
//! assert_eq!(vault.get(&address).unwrap(), key_info);
//! ```

use std::path::Path;
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use chrono::{DateTime, Utc};
use filsign_chain::address::{Address, Network};
use filsign_core::error::StoreError;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::encryption::VaultContext;
use crate::keys::KeyInfo;

const POOL_SIZE: u32 = 10;

// ============================================================================
// KeyVault Trait
// ============================================================================

/// Persistent store of private keys, keyed by address.
///
/// Implementations must keep key material encrypted at rest and be safe to
/// share across threads.
pub trait KeyVault: Send + Sync {
    /// Stores `key_info` under `address`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// - `StoreError::EncryptionFailed` if sealing fails
    /// - `StoreError::Database` if the write fails
    fn save(&self, address: &Address, key_info: &KeyInfo) -> Result<(), StoreError>;

    /// Loads the key stored under `address`.
    ///
    /// # Errors
    ///
    /// - `StoreError::KeyNotFound` if there is no record
    /// - `StoreError::DecryptionFailed` if the record does not authenticate
    fn get(&self, address: &Address) -> Result<KeyInfo, StoreError>;

    /// Removes the record for `address`.
    ///
    /// # Errors
    ///
    /// - `StoreError::KeyNotFound` if there is no record
    fn delete(&self, address: &Address) -> Result<(), StoreError>;

    /// Decrypts every record, ordered by address.
    ///
    /// # Errors
    ///
    /// Fails on the first record that cannot be decrypted or parsed; no
    /// partial listing is returned.
    fn list_all(&self) -> Result<Vec<StoredKey>, StoreError>;

    /// Returns `true` if a record exists for `address`. Lookup failures
    /// count as absent.
    fn has(&self, address: &Address) -> bool;
}

/// A decrypted vault record with its metadata.
#[derive(Debug)]
pub struct StoredKey {
    /// The address the key is stored under.
    pub address: Address,
    /// The private key.
    pub key_info: KeyInfo,
    /// When the record was first written.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// SqliteKeyVault
// ============================================================================

/// [`KeyVault`] over an `SQLite` database with pooled connections.
pub struct SqliteKeyVault {
    pool: Pool<SqliteConnectionManager>,
    ctx: Arc<VaultContext>,
}

impl SqliteKeyVault {
    /// Opens (or creates) the vault database at `path`.
    ///
    /// Missing parent directories are created. On Unix the database file is
    /// restricted to mode 0600.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created and
    /// `StoreError::Database` if the database cannot be opened.
    pub fn open(path: &Path, ctx: Arc<VaultContext>) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = Pool::builder().max_size(POOL_SIZE);
        let vault = Self::from_manager(SqliteConnectionManager::file(path), pool, ctx)?;

        #[cfg(unix)]
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;

        Ok(vault)
    }

    /// Creates a vault in memory. Nothing persists past drop.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the schema cannot be created.
    pub fn in_memory(ctx: Arc<VaultContext>) -> Result<Self, StoreError> {
        // every in-memory connection is its own database, so keep exactly one alive
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None);
        Self::from_manager(SqliteConnectionManager::memory(), pool, ctx)
    }

    fn from_manager(
        manager: SqliteConnectionManager,
        builder: r2d2::Builder<SqliteConnectionManager>,
        ctx: Arc<VaultContext>,
    ) -> Result<Self, StoreError> {
        let pool = builder
            .build(manager)
            .map_err(|e| StoreError::database(e.to_string()))?;

        let vault = Self { pool, ctx };
        vault.init_schema()?;
        Ok(vault)
    }

    fn get_conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::database(e.to_string()))
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.get_conn()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wallet_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT UNIQUE NOT NULL,
                key_type TEXT NOT NULL,
                encrypted_key BLOB NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn open_record(&self, sealed: &[u8]) -> Result<KeyInfo, StoreError> {
        let plaintext = self.ctx.decrypt(sealed)?;
        KeyInfo::from_json(&plaintext)
            .map_err(|e| StoreError::invalid_format(format!("key info: {e}")))
    }
}

impl KeyVault for SqliteKeyVault {
    fn save(&self, address: &Address, key_info: &KeyInfo) -> Result<(), StoreError> {
        let plaintext = key_info
            .to_json()
            .map_err(|_| StoreError::EncryptionFailed)?;
        let sealed = self.ctx.encrypt(&plaintext)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO wallet_keys (address, key_type, encrypted_key, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(address) DO UPDATE SET
                key_type = excluded.key_type,
                encrypted_key = excluded.encrypted_key,
                updated_at = excluded.updated_at",
            params![record_key(address), key_info.key_type().as_str(), sealed, now],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn get(&self, address: &Address) -> Result<KeyInfo, StoreError> {
        let conn = self.get_conn()?;
        let sealed: Option<Vec<u8>> = conn
            .query_row(
                "SELECT encrypted_key FROM wallet_keys WHERE address = ?1",
                params![record_key(address)],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        let sealed = sealed.ok_or_else(|| StoreError::key_not_found(address.to_string()))?;
        self.open_record(&sealed)
    }

    fn delete(&self, address: &Address) -> Result<(), StoreError> {
        let conn = self.get_conn()?;
        let removed = conn
            .execute(
                "DELETE FROM wallet_keys WHERE address = ?1",
                params![record_key(address)],
            )
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StoreError::key_not_found(address.to_string()));
        }
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<StoredKey>, StoreError> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT address, encrypted_key, created_at, updated_at
                 FROM wallet_keys ORDER BY address",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Vec<u8>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut keys = Vec::new();
        for row in rows {
            let (address, sealed, created_at, updated_at) = row.map_err(db_err)?;
            let address: Address = address
                .parse()
                .map_err(|e| StoreError::invalid_format(format!("stored address: {e}")))?;
            keys.push(StoredKey {
                key_info: self.open_record(&sealed)?,
                address,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            });
        }
        Ok(keys)
    }

    fn has(&self, address: &Address) -> bool {
        let Ok(conn) = self.get_conn() else {
            return false;
        };
        conn.query_row(
            "SELECT 1 FROM wallet_keys WHERE address = ?1",
            params![record_key(address)],
            |_| Ok(()),
        )
        .is_ok()
    }
}

impl std::fmt::Debug for SqliteKeyVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteKeyVault")
            .field("pool_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

/// Records are keyed by the mainnet form so lookups ignore the network prefix.
fn record_key(address: &Address) -> String {
    address.with_network(Network::Mainnet).to_string()
}

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::database(e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::invalid_format(format!("timestamp '{value}': {e}")))
}
