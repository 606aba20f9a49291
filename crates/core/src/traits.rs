//! Core trait definitions
//!
//! - `Document`: an entity type stored in one collection
//! - `Patch`: an explicit typed partial update for a document type
//! - `Aggregate`: denormalized counters kept in step with a collection
//!
//! Layers above core are generic over these traits; nothing below the
//! repository facades knows about suites or cases specifically.

use crate::error::Result;
use crate::types::{Collection, Entity};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// An entity type stored in exactly one collection
pub trait Document: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Collection this type is stored in
    const COLLECTION: Collection;

    /// Typed partial-update record for this type
    type Patch: Patch<Self>;

    /// Aggregate row maintained for this collection
    type Agg: Aggregate<Self>;

    /// Base fields
    fn entity(&self) -> &Entity;

    /// Mutable base fields (used by the versioning layer only)
    fn entity_mut(&mut self) -> &mut Entity;

    /// Reject payloads that must never be written
    fn validate(&self) -> Result<()>;

    /// Text matched by fuzzy find, in addition to the id
    fn search_text(&self) -> &str;

    /// Document id
    fn id(&self) -> &str {
        &self.entity().id
    }

    /// Check whether the document is soft-deleted
    fn is_deleted(&self) -> bool {
        self.entity().deleted
    }
}

/// Typed partial update: named optional fields applied by direct assignment
pub trait Patch<T>: Debug + Send {
    /// True if the patch names no fields
    fn is_empty(&self) -> bool;

    /// Assign every named field onto `doc`
    fn apply_to(self, doc: &mut T);
}

/// Denormalized counters for one collection
///
/// Counters must always equal a full scan of the collection under the same
/// predicate. They are only ever changed by [`Aggregate::account`] inside the
/// write transaction that changes the contributing document.
pub trait Aggregate<T>:
    Serialize + DeserializeOwned + Default + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// Add (`delta = 1`) or remove (`delta = -1`) one document's contribution
    fn account(&mut self, doc: &T, delta: i64);

    /// Row version
    fn version(&self) -> i64;

    /// Overwrite the row version
    fn set_version(&mut self, version: i64);

    /// Recompute counters from scratch (version left at zero)
    fn from_documents<'a, I>(docs: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut agg = Self::default();
        for doc in docs {
            agg.account(doc, 1);
        }
        agg
    }

    /// Counters equal, ignoring the row version
    fn same_counts(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.set_version(0);
        b.set_version(0);
        a == b
    }
}
