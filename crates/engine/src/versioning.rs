//! Versioning and soft delete
//!
//! Every document carries a version that starts at
//! [`Entity::INITIAL_VERSION`] and grows by exactly one per mutating write,
//! in the same transaction as the mutation. Soft delete sets `deleted` and
//! `deleted_at` once; deleting again changes nothing.

use suitestore_core::{Document, Entity, Error, Result, Timestamp};

/// Prepare a new document for its first write
///
/// Assigns `id` and the initial version. Documents arriving already
/// deleted are rejected.
pub fn stamp_insert<T: Document>(doc: &mut T, id: String) -> Result<()> {
    let entity = doc.entity_mut();
    if entity.deleted || entity.deleted_at.is_some() {
        return Err(Error::invalid_model(format!(
            "cannot insert a deleted {} document",
            T::COLLECTION
        )));
    }
    entity.id = id;
    entity.version = Entity::INITIAL_VERSION;
    Ok(())
}

/// Count one mutating write
pub fn stamp_update<T: Document>(doc: &mut T) {
    doc.entity_mut().version += 1;
}

/// Soft-delete a document
///
/// Returns false, leaving the document untouched, if it was already deleted.
pub fn mark_deleted<T: Document>(doc: &mut T, at: Timestamp) -> bool {
    let entity = doc.entity_mut();
    if entity.deleted {
        return false;
    }
    entity.deleted = true;
    entity.deleted_at = Some(at);
    entity.version += 1;
    true
}
