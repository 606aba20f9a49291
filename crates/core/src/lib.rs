//! Core types and traits for suitestore
//!
//! This crate defines the foundational types used throughout the system:
//! - Error: the three-kind error taxonomy (NotFound, InvalidModel, Unknown)
//! - Timestamp: epoch-millisecond timestamps
//! - IdGenerator: injectable id assignment (sequential or globally unique)
//! - Collection / Entity: collection names and the shared base fields
//! - Traits: Document, Patch, Aggregate
//! - Entity types: Suite, Case, LogLine, Attachment with patches and aggregates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod primitives;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use contract::{IdGenerator, SequentialIds, Timestamp, UniqueIds};
pub use error::{Error, ErrorKind, Result};
pub use traits::{Aggregate, Document, Patch};
pub use types::{Collection, Entity};

pub use primitives::{
    Attachment, AttachmentAgg, AttachmentOwner, AttachmentPatch, Case, CaseAgg, CasePatch,
    CaseStatus, LogAgg, LogLevel, LogLine, LogPatch, Suite, SuiteAgg, SuitePatch, SuiteResult,
    SuiteStatus,
};
