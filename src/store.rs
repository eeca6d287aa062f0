//! Hash persistence seam.
//!
//! The pipeline writes `(index, sha1)` rows through the [`HashStore`]
//! trait: one `begin`/`commit` transaction per run, inserts in between.
//! The SQLite implementation is the production backend; the in-memory
//! implementation records rows for tests and enforces the protocol with
//! assertions.
//!
//! # Atomic contract
//! - All rows of a run land in one exclusive transaction.
//! - A store error aborts the run; the transaction is left uncommitted
//!   and SQLite discards it when the connection drops.
//! - Exactly one thread touches the store between `begin` and `commit`.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::errors::StoreError;
use crate::hashing::SHA1_LEN;

/// Write-side interface for persisted hash rows.
pub trait HashStore {
    /// Opens the run's exclusive transaction.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Inserts one row inside the open transaction.
    fn insert(&mut self, index: u64, sha1: &[u8; SHA1_LEN]) -> Result<(), StoreError>;

    /// Commits the run's transaction.
    fn commit(&mut self) -> Result<(), StoreError>;
}

/// SQLite-backed hash store.
///
/// Schema: `hashes("index" INTEGER, sha1 BLOB)`. The `index` column is a
/// per-run position in the path-tracked stream, not a cross-run id.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             CREATE TABLE IF NOT EXISTS hashes (\"index\" INTEGER, sha1 BLOB);",
        )?;
        Ok(Self { conn })
    }

    /// All rows ordered by index, for verification and reporting.
    pub fn rows(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT \"index\", sha1 FROM hashes ORDER BY \"index\"")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as u64, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl HashStore for SqliteStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN EXCLUSIVE")?;
        Ok(())
    }

    fn insert(&mut self, index: u64, sha1: &[u8; SHA1_LEN]) -> Result<(), StoreError> {
        self.conn
            .prepare_cached("INSERT INTO hashes VALUES (?1, ?2)")?
            .execute(params![index as i64, &sha1[..]])?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }
}

/// In-memory store for tests.
///
/// Records inserted rows and asserts the begin/insert/commit protocol so
/// driver bugs fail loudly instead of writing outside a transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<(u64, [u8; SHA1_LEN])>,
    in_txn: bool,
    committed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows inserted so far, in arrival order.
    pub fn rows(&self) -> &[(u64, [u8; SHA1_LEN])] {
        &self.rows
    }

    /// True once `commit` has run.
    pub fn committed(&self) -> bool {
        self.committed
    }
}

impl HashStore for MemoryStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        assert!(!self.in_txn, "begin inside an open transaction");
        self.in_txn = true;
        Ok(())
    }

    fn insert(&mut self, index: u64, sha1: &[u8; SHA1_LEN]) -> Result<(), StoreError> {
        assert!(self.in_txn, "insert outside a transaction");
        self.rows.push((index, *sha1));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        assert!(self.in_txn, "commit without begin");
        self.in_txn = false;
        self.committed = true;
        Ok(())
    }
}
