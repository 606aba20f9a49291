//! Case documents
//!
//! A case is one test within a suite. It references its owning suite by id
//! and collects the ids of attachments uploaded while it ran.

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::traits::{Aggregate, Document, Patch};
use crate::types::{Collection, Entity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Announced, not started
    #[default]
    Created,
    /// Currently executing
    Running,
    /// Finished successfully
    Passed,
    /// Finished with an assertion failure
    Failed,
    /// Finished with an unexpected error
    Errored,
    /// Not executed
    Skipped,
}

impl CaseStatus {
    /// Stable name, matching the serialized form
    pub const fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Created => "created",
            CaseStatus::Running => "running",
            CaseStatus::Passed => "passed",
            CaseStatus::Failed => "failed",
            CaseStatus::Errored => "errored",
            CaseStatus::Skipped => "skipped",
        }
    }

    /// Check whether the case reached a terminal status
    pub const fn is_finished(&self) -> bool {
        matches!(
            self,
            CaseStatus::Passed | CaseStatus::Failed | CaseStatus::Errored | CaseStatus::Skipped
        )
    }
}

/// A test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Base fields
    #[serde(flatten)]
    pub entity: Entity,
    /// Owning suite
    pub suite_id: String,
    /// Display name
    pub name: String,
    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Position within the suite
    #[serde(default)]
    pub idx: i64,
    /// Parameters the case ran with
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    /// Ids of attachments uploaded by this case
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Lifecycle status
    #[serde(default)]
    pub status: CaseStatus,
    /// When the case was announced; orders case pages
    #[serde(default)]
    pub created_at: Timestamp,
    /// When the case started running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// When the case finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl Case {
    /// Create a case in `created` status
    pub fn new(suite_id: impl Into<String>, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            entity: Entity::default(),
            suite_id: suite_id.into(),
            name: name.into(),
            description: None,
            tags: BTreeSet::new(),
            idx: 0,
            args: BTreeMap::new(),
            attachments: Vec::new(),
            status: CaseStatus::Created,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Set the position within the suite
    pub fn with_idx(mut self, idx: i64) -> Self {
        self.idx = idx;
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: CaseStatus) -> Self {
        self.status = status;
        self
    }

    /// Add one argument
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

impl Document for Case {
    const COLLECTION: Collection = Collection::Cases;
    type Patch = CasePatch;
    type Agg = CaseAgg;

    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn validate(&self) -> Result<()> {
        if self.suite_id.is_empty() {
            return Err(Error::invalid_model("case must reference a suite"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::invalid_model("case name must not be empty"));
        }
        if self.idx < 0 {
            return Err(Error::invalid_model(format!(
                "case idx must be non-negative, got {}",
                self.idx
            )));
        }
        Ok(())
    }

    fn search_text(&self) -> &str {
        &self.name
    }
}

/// Partial update for a case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasePatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement tag set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    /// Start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Finish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Attachment ids appended to the existing list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub append_attachments: Vec<String>,
}

impl Patch<Case> for CasePatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.status.is_none()
            && self.started_at.is_none()
            && self.finished_at.is_none()
            && self.append_attachments.is_empty()
    }

    fn apply_to(self, doc: &mut Case) {
        if let Some(name) = self.name {
            doc.name = name;
        }
        if let Some(description) = self.description {
            doc.description = Some(description);
        }
        if let Some(tags) = self.tags {
            doc.tags = tags;
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(at) = self.started_at {
            doc.started_at = Some(at);
        }
        if let Some(at) = self.finished_at {
            doc.finished_at = Some(at);
        }
        doc.attachments.extend(self.append_attachments);
    }
}

/// Aggregate row for cases; counts live cases only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseAgg {
    /// Row version
    pub version: i64,
    /// Live cases
    pub total_count: i64,
    /// Live cases in `running` status
    pub running_count: i64,
    /// Live cases in a terminal status
    pub finished_count: i64,
}

impl Aggregate<Case> for CaseAgg {
    fn account(&mut self, doc: &Case, delta: i64) {
        if doc.entity.deleted {
            return;
        }
        self.total_count += delta;
        if doc.status == CaseStatus::Running {
            self.running_count += delta;
        } else if doc.status.is_finished() {
            self.finished_count += delta;
        }
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
