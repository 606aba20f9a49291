//! Document store handle
//!
//! Owns the `redb` database. The engine is single-writer: `begin_write`
//! blocks while another write transaction is alive. Readers never block and
//! observe the state as of their transaction's start.

use crate::error::StorageResultExt;
use crate::keys::{DOCUMENTS, INDEXES};
use crate::txn::{ReadTxn, WriteTxn};
use redb::backends::InMemoryBackend;
use std::path::{Path, PathBuf};
use suitestore_core::Result;

/// Handle to one database file (or an in-memory database)
pub struct DocumentStore {
    db: redb::Database,
    path: Option<PathBuf>,
    started_empty: bool,
}

impl DocumentStore {
    /// Open the database file at `path`, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let started_empty = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        let db = redb::Database::create(&path).or_unknown("open database")?;
        let store = Self {
            db,
            path: Some(path),
            started_empty,
        };
        store.create_tables()?;
        Ok(store)
    }

    /// Open a fresh database that lives only in memory
    pub fn ephemeral() -> Result<Self> {
        let db = redb::Database::builder()
            .create_with_backend(InMemoryBackend::new())
            .or_unknown("open in-memory database")?;
        let store = Self {
            db,
            path: None,
            started_empty: true,
        };
        store.create_tables()?;
        Ok(store)
    }

    // Read transactions fail on tables that were never created
    fn create_tables(&self) -> Result<()> {
        let txn = self.db.begin_write().or_unknown("begin write")?;
        txn.open_table(DOCUMENTS).or_unknown("create documents")?;
        txn.open_table(INDEXES).or_unknown("create indexes")?;
        txn.commit().or_unknown("commit")
    }

    /// True if the database file did not exist (or was empty) before opening
    pub fn started_empty(&self) -> bool {
        self.started_empty
    }

    /// Database file, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Begin the write transaction, waiting for any other writer to finish
    pub fn begin_write(&self) -> Result<WriteTxn> {
        let txn = self.db.begin_write().or_unknown("begin write")?;
        Ok(WriteTxn::new(txn))
    }

    /// Begin a read-only snapshot
    pub fn begin_read(&self) -> Result<ReadTxn> {
        let txn = self.db.begin_read().or_unknown("begin read")?;
        Ok(ReadTxn::new(txn))
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("path", &self.path)
            .field("started_empty", &self.started_empty)
            .finish()
    }
}
