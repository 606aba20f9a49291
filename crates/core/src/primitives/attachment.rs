//! Attachment documents
//!
//! Attachments are files uploaded by a suite or a case. Only metadata lives
//! in the store; `url` points at wherever the bytes were put.

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::traits::{Aggregate, Document, Patch};
use crate::types::{Collection, Entity};
use serde::{Deserialize, Serialize};

/// Which document an attachment belongs to
///
/// Serialized as `{"suite_id": "..."}` or `{"case_id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentOwner {
    /// Owned by a suite
    #[serde(rename = "suite_id")]
    Suite(String),
    /// Owned by a case
    #[serde(rename = "case_id")]
    Case(String),
}

impl AttachmentOwner {
    /// Id of the owning document
    pub fn id(&self) -> &str {
        match self {
            AttachmentOwner::Suite(id) | AttachmentOwner::Case(id) => id,
        }
    }

    /// Index key: the owner's collection plus its id
    pub fn index_key(&self) -> String {
        match self {
            AttachmentOwner::Suite(id) => format!("suites:{}", id),
            AttachmentOwner::Case(id) => format!("cases:{}", id),
        }
    }
}

/// Metadata for one uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base fields
    #[serde(flatten)]
    pub entity: Entity,
    /// Owning suite or case
    pub owner: AttachmentOwner,
    /// Original file name
    pub filename: String,
    /// MIME type
    #[serde(default)]
    pub content_type: String,
    /// Size in bytes
    #[serde(default)]
    pub size: i64,
    /// Where the content can be fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Upload time; orders attachment pages
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl Attachment {
    /// Create attachment metadata
    pub fn new(
        owner: AttachmentOwner,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        size: i64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            entity: Entity::default(),
            owner,
            filename: filename.into(),
            content_type: content_type.into(),
            size,
            url: None,
            timestamp,
        }
    }
}

impl Document for Attachment {
    const COLLECTION: Collection = Collection::Attachments;
    type Patch = AttachmentPatch;
    type Agg = AttachmentAgg;

    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn validate(&self) -> Result<()> {
        if self.owner.id().is_empty() {
            return Err(Error::invalid_model("attachment must reference an owner"));
        }
        if self.filename.trim().is_empty() {
            return Err(Error::invalid_model("attachment filename must not be empty"));
        }
        if self.size < 0 {
            return Err(Error::invalid_model(format!(
                "attachment size must be non-negative, got {}",
                self.size
            )));
        }
        Ok(())
    }

    fn search_text(&self) -> &str {
        &self.filename
    }
}

/// Partial update for an attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPatch {
    /// New file name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// New MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// New size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// New location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Patch<Attachment> for AttachmentPatch {
    fn is_empty(&self) -> bool {
        self.filename.is_none()
            && self.content_type.is_none()
            && self.size.is_none()
            && self.url.is_none()
    }

    fn apply_to(self, doc: &mut Attachment) {
        if let Some(filename) = self.filename {
            doc.filename = filename;
        }
        if let Some(content_type) = self.content_type {
            doc.content_type = content_type;
        }
        if let Some(size) = self.size {
            doc.size = size;
        }
        if let Some(url) = self.url {
            doc.url = Some(url);
        }
    }
}

/// Aggregate row for attachments; counts live attachments only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentAgg {
    /// Row version
    pub version: i64,
    /// Live attachments
    pub total_count: i64,
    /// Sum of live attachment sizes
    pub total_size: i64,
}

impl Aggregate<Attachment> for AttachmentAgg {
    fn account(&mut self, doc: &Attachment, delta: i64) {
        if doc.entity.deleted {
            return;
        }
        self.total_count += delta;
        self.total_size += delta * doc.size;
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
