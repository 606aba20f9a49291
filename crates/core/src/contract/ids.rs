//! Id generators
//!
//! Ids are assigned once, at insert, by a generator owned by the database
//! instance. Production uses globally unique ids; tests inject a
//! deterministic counter so assertions can name ids up front.
//!
//! Any `Fn() -> String + Send + Sync` closure is also a generator.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces a unique string id per call
pub trait IdGenerator: Send + Sync {
    /// Return the next id. Must never return the same value twice.
    fn next_id(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn next_id(&self) -> String {
        self()
    }
}

/// Deterministic generator yielding "1", "2", "3", ...
///
/// The counter belongs to the generator, not the process, so two databases
/// opened in the same test never share a sequence.
#[derive(Debug, Default)]
pub struct SequentialIds {
    last: AtomicU64,
}

impl SequentialIds {
    /// Create a generator whose first id is "1"
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a generator whose first id is `last + 1`
    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        (self.last.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

/// Globally unique generator (random UUIDv4, hex without dashes)
#[derive(Debug, Default, Clone, Copy)]
pub struct UniqueIds;

impl IdGenerator for UniqueIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl fmt::Debug for dyn IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdGenerator")
    }
}
