//! Primitives layer for suitestore
//!
//! Provides one repository per entity type as stateless facades over the
//! Database engine:
//! - **SuiteRepo**: suite runs, pages with live running/finished counts
//! - **CaseRepo**: cases of a suite, start/finish and attachment links
//! - **LogRepo**: log lines of a case
//! - **AttachmentRepo**: attachment metadata owned by a suite or a case
//! - **Repos**: all four over one database
//!
//! ## Design Principle: Stateless Facades
//!
//! Repositories hold only a collection handle (an `Arc<Database>` plus the
//! collection's index schema) and delegate every operation to the
//! transactional engine. Multiple repository instances on the same Database
//! are safe.
//!
//! ## Cross-Collection Transactions
//!
//! Repositories expose their collection so writes to several collections can
//! share one transaction:
//!
//! ```text
//! db.transaction(|ctx| {
//!     let a = repos.attachments.collection().insert_in(ctx, attachment)?;
//!     repos.cases.collection().update_in(ctx, &case_id, |c| {
//!         c.attachments.push(a.entity.id.clone());
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attachment;
pub mod case;
pub mod log;
pub mod repos;
pub mod suite;

pub use attachment::AttachmentRepo;
pub use case::CaseRepo;
pub use log::LogRepo;
pub use repos::Repos;
pub use suite::{SuitePage, SuiteRepo};
