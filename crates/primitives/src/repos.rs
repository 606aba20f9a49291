//! Repos: every repository over one database
//!
//! Constructed once when the store opens; each repository registers its
//! index definitions against the shared database.

use crate::{AttachmentRepo, CaseRepo, LogRepo, SuiteRepo};
use std::path::Path;
use std::sync::Arc;
use suitestore_core::{Attachment, Result};
use suitestore_engine::{ChangeStream, Database, DatabaseBuilder};
use tracing::info;

/// All repositories of one store
#[derive(Debug, Clone)]
pub struct Repos {
    db: Arc<Database>,
    /// Suites
    pub suites: SuiteRepo,
    /// Cases
    pub cases: CaseRepo,
    /// Log lines
    pub logs: LogRepo,
    /// Attachments
    pub attachments: AttachmentRepo,
}

impl Repos {
    /// Open the store in directory `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_database(Database::open(path)?)
    }

    /// Open an in-memory store
    pub fn ephemeral() -> Result<Self> {
        Self::from_database(Database::ephemeral()?)
    }

    /// Open a store configured by `builder`
    ///
    /// Uses an in-memory store if the builder has no path.
    pub fn with_builder(builder: DatabaseBuilder) -> Result<Self> {
        let db = if builder.has_path() {
            builder.open()?
        } else {
            builder.ephemeral()?
        };
        Self::from_database(db)
    }

    /// Register every repository on an open database
    pub fn from_database(db: Arc<Database>) -> Result<Self> {
        let repos = Self {
            suites: SuiteRepo::register(&db)?,
            cases: CaseRepo::register(&db)?,
            logs: LogRepo::register(&db)?,
            attachments: AttachmentRepo::register(&db)?,
            db,
        };
        info!(
            target: "suitestore::db",
            started_empty = repos.db.started_empty(),
            "Repositories ready"
        );
        Ok(repos)
    }

    /// The shared database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// True if the store file did not exist before this open
    pub fn started_empty(&self) -> bool {
        self.db.started_empty()
    }

    /// Subscribe to changes of every collection committed from now on
    pub fn changes(&self) -> ChangeStream {
        self.db.changes()
    }

    /// Insert a case attachment and link it from its case atomically
    pub fn attach_to_case(&self, attachment: Attachment) -> Result<Attachment> {
        self.attachments
            .attach_to_case(self.cases.collection(), attachment)
    }

    /// Close the store. Idempotent.
    pub fn close(&self) {
        self.db.close();
    }
}
