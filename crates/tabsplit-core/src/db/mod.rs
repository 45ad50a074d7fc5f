//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `receipts` - Receipt aggregate CRUD with optimistic concurrency
//! - `restaurants` - Finalization ledger and per-user restaurant aggregates
//! - `extractions` - Extraction job records

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::debug;

use crate::error::{Error, Result};

mod extractions;
mod receipts;
mod restaurants;


pub use extractions::hash_text;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "TABSPLIT_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the
/// same key regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"tabsplit-salt-v1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Map a JSON column decode failure into a row error
pub(crate) fn json_column<T: serde::de::DeserializeOwned>(
    idx: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open an encrypted database keyed by `TABSPLIT_DB_KEY`
    ///
    /// Returns an error if the variable is not set. Use `new_unencrypted()`
    /// for development without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases.",
                DB_KEY_ENV
            ))),
        }
    }

    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open with an explicit passphrase (`None` for plain SQLite)
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let key_pragma = passphrase
            .map(derive_key)
            .transpose()?
            .map(|key| format!("PRAGMA key = 'x\"{}\"';", key));

        // Key (when encrypted) and foreign keys are per-connection settings
        let manager = manager.with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tabsplit_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        // SQLCipher answers cipher_version when it is linked
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the finalize writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Receipts (aggregate root; people/items/splits as JSON)
            CREATE TABLE IF NOT EXISTS receipts (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                restaurant_name TEXT,
                restaurant_address TEXT,
                receipt_date TEXT,
                people_json TEXT NOT NULL DEFAULT '[]',
                items_json TEXT NOT NULL DEFAULT '[]',
                splits_json TEXT NOT NULL DEFAULT '[]',
                subtotal REAL NOT NULL DEFAULT 0,
                tax REAL NOT NULL DEFAULT 0,
                tip REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL DEFAULT 0,
                tax_distribution TEXT NOT NULL DEFAULT 'proportional',
                tip_distribution TEXT NOT NULL DEFAULT 'proportional',
                extraction_source TEXT NOT NULL DEFAULT 'llm',
                confidence REAL NOT NULL DEFAULT 0,
                is_complete BOOLEAN NOT NULL DEFAULT 0,
                finalized_share REAL,                     -- share committed to the ledger
                ledger_key TEXT,                          -- aggregate name used at finalize
                visit_date DATE,                          -- last_visit contribution
                version INTEGER NOT NULL DEFAULT 1,       -- optimistic concurrency token
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_receipts_user ON receipts(user_id);
            CREATE INDEX IF NOT EXISTS idx_receipts_ledger
                ON receipts(user_id, ledger_key) WHERE is_complete = 1;

            -- Restaurant aggregates (finalized spend per user and restaurant)
            CREATE TABLE IF NOT EXISTS restaurant_aggregates (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                visit_count INTEGER NOT NULL DEFAULT 0 CHECK (visit_count >= 0),
                total_spent REAL NOT NULL DEFAULT 0 CHECK (total_spent >= 0),
                last_visit DATE,
                UNIQUE(user_id, name)
            );

            -- Extraction jobs (one row per orchestrator run)
            CREATE TABLE IF NOT EXISTS extraction_jobs (
                id INTEGER PRIMARY KEY,
                bucket TEXT NOT NULL,
                image_key TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',   -- pending, processing, completed, failed
                source TEXT,                              -- llm, fallback
                confidence REAL,
                error TEXT,
                input_hash TEXT,                          -- sha256 of OCR text
                receipt_id INTEGER REFERENCES receipts(id) ON DELETE SET NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                completed_at DATETIME
            );

            CREATE INDEX IF NOT EXISTS idx_extraction_jobs_status ON extraction_jobs(status);
            CREATE INDEX IF NOT EXISTS idx_extraction_jobs_image ON extraction_jobs(bucket, image_key);
            "#,
        )?;

        debug!(path = %self.db_path, "Database migrations complete");
        Ok(())
    }
}
