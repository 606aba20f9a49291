//! Contract types shared by every layer
//!
//! - `timestamp`: epoch-millisecond timestamps
//! - `ids`: injectable id generators
//!
//! ## Usage
//!
//! ```
//! use suitestore_core::contract::{IdGenerator, SequentialIds, Timestamp};
//!
//! let ids = SequentialIds::new();
//! assert_eq!(ids.next_id(), "1");
//! let _ = Timestamp::now();
//! ```

pub mod ids;
pub mod timestamp;

// Re-exports
pub use ids::{IdGenerator, SequentialIds, UniqueIds};
pub use timestamp::Timestamp;
