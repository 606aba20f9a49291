//! suitestore - embedded document store for test-suite results
//!
//! suitestore keeps test suites, cases, log lines and attachments as JSON
//! documents in a single-writer ordered key-value engine, with secondary
//! indexes, cursor pagination, versioning, soft delete, per-collection
//! aggregate counters and a change feed for live updates.
//!
//! # Quick Start
//!
//! ```no_run
//! use suitestore::{Repos, Suite, Timestamp};
//!
//! # fn main() -> suitestore::Result<()> {
//! let repos = Repos::open("/var/lib/suitestore")?;
//! let changes = repos.changes();
//!
//! let id = repos.suites.insert(Suite::new("nightly", Timestamp::now()))?;
//! let page = repos.suites.page(None, 20, false)?;
//! assert_eq!(page.suites[0].entity.id, id);
//!
//! let event = changes.try_recv();
//! assert!(event.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `suitestore-core`: entity types, errors, id generators
//! - `suitestore-storage`: document store and secondary indexes over redb
//! - `suitestore-engine`: database, transactions, pagination, change feed
//! - `suitestore-primitives`: one repository per entity type
//!
//! Transport code should only need the repositories and the change stream.

pub use suitestore_core::{
    Aggregate, Attachment, AttachmentAgg, AttachmentOwner, AttachmentPatch, Case, CaseAgg,
    CasePatch, CaseStatus, Collection, Document, Entity, Error, ErrorKind, IdGenerator, LogAgg,
    LogLevel, LogLine, LogPatch, Patch, Result, SequentialIds, Suite, SuiteAgg, SuitePatch,
    SuiteResult, SuiteStatus, Timestamp, UniqueIds,
};
pub use suitestore_engine::{
    Change, ChangeOp, ChangeStream, CollectionSchema, Database, DatabaseBuilder,
    DocumentCollection, FeedStats, IdStrategy, OverflowPolicy, Page, StoreConfig, WriteContext,
};
pub use suitestore_storage::{IndexDef, IndexValue, StoreView};

pub use suitestore_primitives::{AttachmentRepo, CaseRepo, LogRepo, Repos, SuitePage, SuiteRepo};
