//! Core types: collections and the entity base
//!
//! Every stored document carries the same base fields (`Entity`), flattened
//! into its JSON form. The `Collection` names the partition a document lives
//! in and determines its storage key prefix.

use crate::contract::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named partition of documents of one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Test suites
    Suites,
    /// Test cases, owned by a suite
    Cases,
    /// Log lines, owned by a case
    Logs,
    /// Attachments, owned by a suite or a case
    Attachments,
}

impl Collection {
    /// All collections, in registration order
    pub const ALL: [Collection; 4] = [
        Collection::Suites,
        Collection::Cases,
        Collection::Logs,
        Collection::Attachments,
    ];

    /// Stable name used in storage keys
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Suites => "suites",
            Collection::Cases => "cases",
            Collection::Logs => "logs",
            Collection::Attachments => "attachments",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base fields shared by every document
///
/// ## Invariants
///
/// - `id` is assigned once at insert and never changes
/// - `version` starts at [`Entity::INITIAL_VERSION`] and grows by exactly 1
///   per mutating write
/// - `deleted` only ever goes from false to true
/// - `deleted_at` is set exactly once, together with `deleted`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entity {
    /// Assigned by the store's id generator
    #[serde(default)]
    pub id: String,
    /// Mutation counter
    #[serde(default)]
    pub version: i64,
    /// Logical delete marker
    #[serde(default)]
    pub deleted: bool,
    /// When the document was soft-deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Entity {
    /// Version stamped on insert
    pub const INITIAL_VERSION: i64 = 0;

    /// Check whether the document is live (not soft-deleted)
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::Suites.as_str(), "suites");
        assert_eq!(Collection::Cases.as_str(), "cases");
        assert_eq!(Collection::Logs.as_str(), "logs");
        assert_eq!(Collection::Attachments.as_str(), "attachments");
        assert_eq!(Collection::Suites.to_string(), "suites");
    }

    #[test]
    fn test_collection_serde_matches_storage_name() {
        for c in Collection::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
    }

    #[test]
    fn test_entity_default() {
        let e = Entity::default();
        assert!(e.id.is_empty());
        assert_eq!(e.version, Entity::INITIAL_VERSION);
        assert!(e.is_live());
        assert!(e.deleted_at.is_none());
    }

    #[test]
    fn test_entity_omits_unset_deleted_at() {
        let e = Entity {
            id: "1".into(),
            ..Entity::default()
        };
        let json = serde_json::to_value(&e).unwrap();
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["deleted"], false);
    }
}
