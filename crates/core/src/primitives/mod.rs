//! Entity types for suitestore
//!
//! This module defines the canonical documents stored by the repository
//! facades, their typed patches, and their aggregate rows.
//!
//! ## Design Principle
//!
//! - **suitestore-core** defines the document types (this module)
//! - **suitestore-primitives** provides the typed repository facades
//! - **suitestore-engine** orchestrates transactions, indexes and the change feed
//!
//! All crates share the same type definitions from core.

pub mod attachment;
pub mod case;
pub mod log;
pub mod suite;

// Re-export all types at module level
pub use attachment::{Attachment, AttachmentAgg, AttachmentOwner, AttachmentPatch};
pub use case::{Case, CaseAgg, CasePatch, CaseStatus};
pub use log::{LogAgg, LogLevel, LogLine, LogPatch};
pub use suite::{Suite, SuiteAgg, SuitePatch, SuiteResult, SuiteStatus};
