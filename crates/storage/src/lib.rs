//! Storage layer for suitestore
//!
//! This crate implements the Document Store and the Secondary Index Manager
//! on top of the `redb` ordered key-value engine:
//! - DocumentStore: database handle (file-backed or in-memory)
//! - ReadTxn / WriteTxn: snapshot reads and the single writer
//! - StoreView: typed reads and index scan primitives (equality, ascending,
//!   descending, descend-from-pivot)
//! - IndexSet / IndexDef: typed extractor-based index definitions with an
//!   order-preserving key encoding
//!
//! Higher layers never touch `redb` directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod index;
pub mod keys;
pub mod store;
pub mod txn;
pub mod view;

pub use error::StorageResultExt;
pub use index::{IndexDef, IndexSet, IndexValue};
pub use store::DocumentStore;
pub use txn::{ReadTxn, WriteTxn};
pub use view::StoreView;
