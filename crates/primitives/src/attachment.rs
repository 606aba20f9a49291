//! AttachmentRepo: file metadata owned by a suite or a case
//!
//! Indexes: `timestamp` (ordering), `owner_id` (owner collection plus id, so
//! a suite and a case with the same id never collide), `deleted`.

use std::sync::Arc;
use suitestore_core::{
    Attachment, AttachmentAgg, AttachmentOwner, AttachmentPatch, Case, Error, Result, Timestamp,
};
use suitestore_engine::{CollectionSchema, Database, DocumentCollection, Page};
use suitestore_storage::{IndexDef, IndexValue};

/// Ordering index name
pub const TIMESTAMP_INDEX: &str = "timestamp";
/// Owner index name
pub const OWNER_ID_INDEX: &str = "owner_id";

fn timestamp(a: &Attachment) -> Option<IndexValue> {
    Some(a.timestamp.into())
}

fn owner_id(a: &Attachment) -> Option<IndexValue> {
    Some(a.owner.index_key().into())
}

/// Index layout of the attachments collection
pub fn schema() -> CollectionSchema<Attachment> {
    CollectionSchema::new(IndexDef::new(TIMESTAMP_INDEX, timestamp))
        .with_index(IndexDef::new(OWNER_ID_INDEX, owner_id))
}

/// Repository for attachment metadata
#[derive(Debug, Clone)]
pub struct AttachmentRepo {
    attachments: DocumentCollection<Attachment>,
}

impl AttachmentRepo {
    /// Register the attachments collection on `db`
    pub fn register(db: &Arc<Database>) -> Result<Self> {
        Ok(Self {
            attachments: db.register(schema())?,
        })
    }

    /// The underlying collection, for multi-document transactions
    pub fn collection(&self) -> &DocumentCollection<Attachment> {
        &self.attachments
    }

    /// Insert attachment metadata, returning its id
    pub fn insert(&self, attachment: Attachment) -> Result<String> {
        Ok(self.attachments.insert(attachment)?.entity.id)
    }

    /// Insert a case-owned attachment and append it to the case in one
    /// transaction
    ///
    /// Fails with `NotFound` if the owning case does not exist.
    pub fn attach_to_case(
        &self,
        cases: &DocumentCollection<Case>,
        attachment: Attachment,
    ) -> Result<Attachment> {
        let case_id = match &attachment.owner {
            AttachmentOwner::Case(id) => id.clone(),
            AttachmentOwner::Suite(id) => {
                return Err(Error::invalid_model(format!(
                    "attachment is owned by suite {}, not a case",
                    id
                )))
            }
        };
        self.attachments.database().transaction(|ctx| {
            let stored = self.attachments.insert_in(ctx, attachment)?;
            let id = stored.entity.id.clone();
            cases.update_in(ctx, &case_id, |c| {
                c.attachments.push(id);
                Ok(())
            })?;
            Ok(stored)
        })
    }

    /// Apply a partial update
    pub fn save(&self, id: &str, patch: AttachmentPatch) -> Result<Attachment> {
        self.attachments.set(id, patch)
    }

    /// Fetch attachment metadata by id
    pub fn find(&self, id: &str) -> Result<Attachment> {
        self.attachments.get(id)
    }

    /// Substring match over id and filename
    pub fn fuzzy_find(&self, needle: &str, include_deleted: bool) -> Result<Vec<Attachment>> {
        self.attachments.fuzzy_find(needle, include_deleted)
    }

    /// All attachments, live ones first
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<Attachment>> {
        self.attachments.find_all(include_deleted)
    }

    /// Attachments of one owner
    pub fn find_by_owner(&self, owner: &AttachmentOwner, include_deleted: bool) -> Result<Vec<Attachment>> {
        self.attachments
            .find_by(OWNER_ID_INDEX, owner.index_key(), include_deleted)
    }

    /// One page of attachments, newest first
    pub fn page(&self, from_id: Option<&str>, limit: usize, include_deleted: bool) -> Result<Page<Attachment>> {
        self.attachments.page(from_id, limit, include_deleted)
    }

    /// Soft-delete an attachment; false if it was already deleted
    pub fn delete(&self, id: &str, at: Timestamp) -> Result<bool> {
        self.attachments.delete(id, at)
    }

    /// Soft-delete every live attachment, returning how many were deleted
    pub fn delete_all(&self, at: Timestamp) -> Result<usize> {
        self.attachments.delete_all(at)
    }

    /// Stored aggregate row
    pub fn aggregate(&self) -> Result<AttachmentAgg> {
        self.attachments.aggregate()
    }
}
