//! Database engine for suitestore
//!
//! This crate orchestrates the storage layer:
//! - Database: open/close, configuration, collection registry
//! - Transaction coordination: one writer at a time, changes published
//!   after commit in commit order
//! - Collections: typed insert/set/delete/page/find over an index schema
//! - Versioning and soft delete
//! - Change feed: bounded queue of committed mutations
//!
//! The engine is the only component that knows about:
//! - The writer critical section (commit + publish)
//! - Aggregate maintenance inside the mutating transaction
//! - Cursor pagination semantics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod coordinator;
pub mod database;
pub mod feed;
pub mod query;
pub mod versioning;

pub use collection::{CollectionSchema, DocumentCollection, DELETED_INDEX};
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{Database, DatabaseBuilder, IdStrategy, StoreConfig, WriteContext};
pub use feed::{Change, ChangeFeed, ChangeOp, ChangeStream, FeedStats, OverflowPolicy};
pub use query::Page;
