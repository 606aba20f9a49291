//! Key layout
//!
//! | Table       | Key                                          | Value        |
//! |-------------|----------------------------------------------|--------------|
//! | `documents` | `{collection}:{id}`                          | document JSON|
//! | `documents` | `{collection}_agg`                           | aggregate JSON|
//! | `indexes`   | `{collection}\0{index}\0{value}{id}`         | id           |
//!
//! Document keys of one collection share the prefix `{collection}:`, so a
//! collection scan is the half-open range `{collection}:` .. `{collection};`.
//! The aggregate key never falls inside that range.

use redb::TableDefinition;
use suitestore_core::Collection;

/// Documents and aggregate rows
pub const DOCUMENTS: TableDefinition<&str, &str> = TableDefinition::new("documents");

/// Secondary index entries
pub const INDEXES: TableDefinition<&[u8], &str> = TableDefinition::new("indexes");

/// Key of one document
pub fn document_key(collection: Collection, id: &str) -> String {
    format!("{}:{}", collection.as_str(), id)
}

/// Key of a collection's aggregate row
pub fn agg_key(collection: Collection) -> String {
    format!("{}_agg", collection.as_str())
}

/// Half-open key range covering every document of a collection
pub fn collection_range(collection: Collection) -> (String, String) {
    (
        format!("{}:", collection.as_str()),
        format!("{};", collection.as_str()),
    )
}
