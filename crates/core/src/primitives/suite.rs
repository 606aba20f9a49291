//! Suite documents
//!
//! A suite is one run of a test suite as reported by a client. Its status
//! moves through `created -> running -> finished`, or to `disconnected` when
//! the reporting client goes away.

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::traits::{Aggregate, Document, Patch};
use crate::types::{Collection, Entity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle status of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteStatus {
    /// Registered, no case started yet
    #[default]
    Created,
    /// Client connected and reporting
    Running,
    /// All reporting done
    Finished,
    /// Client went away before finishing
    Disconnected,
}

impl SuiteStatus {
    /// Stable name, matching the serialized form
    pub const fn as_str(&self) -> &'static str {
        match self {
            SuiteStatus::Created => "created",
            SuiteStatus::Running => "running",
            SuiteStatus::Finished => "finished",
            SuiteStatus::Disconnected => "disconnected",
        }
    }
}

/// Outcome of a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteResult {
    /// Not decided yet
    #[default]
    Unknown,
    /// Every case passed
    Passed,
    /// At least one case failed
    Failed,
}

/// A test suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    /// Base fields
    #[serde(flatten)]
    pub entity: Entity,
    /// Display name
    pub name: String,
    /// Free-form tags
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Number of cases the client announced
    #[serde(default)]
    pub planned_cases: i64,
    /// Lifecycle status
    #[serde(default)]
    pub status: SuiteStatus,
    /// Outcome
    #[serde(default)]
    pub result: SuiteResult,
    /// When the suite started; orders suite pages
    #[serde(default)]
    pub started_at: Timestamp,
    /// When the suite finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// When the reporting client disconnected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<Timestamp>,
}

impl Suite {
    /// Create a suite in `created` status
    pub fn new(name: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            entity: Entity::default(),
            name: name.into(),
            tags: BTreeSet::new(),
            planned_cases: 0,
            status: SuiteStatus::Created,
            result: SuiteResult::Unknown,
            started_at,
            finished_at: None,
            disconnected_at: None,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: SuiteStatus) -> Self {
        self.status = status;
        self
    }

    /// Add tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the announced case count
    pub fn with_planned_cases(mut self, planned_cases: i64) -> Self {
        self.planned_cases = planned_cases;
        self
    }
}

impl Document for Suite {
    const COLLECTION: Collection = Collection::Suites;
    type Patch = SuitePatch;
    type Agg = SuiteAgg;

    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_model("suite name must not be empty"));
        }
        if self.planned_cases < 0 {
            return Err(Error::invalid_model(format!(
                "planned_cases must be non-negative, got {}",
                self.planned_cases
            )));
        }
        Ok(())
    }

    fn search_text(&self) -> &str {
        &self.name
    }
}

/// Partial update for a suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuitePatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Replacement tag set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// New announced case count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_cases: Option<i64>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SuiteStatus>,
    /// New result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SuiteResult>,
    /// New start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<Timestamp>,
    /// Finish time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
    /// Disconnect time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<Timestamp>,
}

impl Patch<Suite> for SuitePatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tags.is_none()
            && self.planned_cases.is_none()
            && self.status.is_none()
            && self.result.is_none()
            && self.started_at.is_none()
            && self.finished_at.is_none()
            && self.disconnected_at.is_none()
    }

    fn apply_to(self, doc: &mut Suite) {
        if let Some(name) = self.name {
            doc.name = name;
        }
        if let Some(tags) = self.tags {
            doc.tags = tags;
        }
        if let Some(planned_cases) = self.planned_cases {
            doc.planned_cases = planned_cases;
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(result) = self.result {
            doc.result = result;
        }
        if let Some(started_at) = self.started_at {
            doc.started_at = started_at;
        }
        if let Some(at) = self.finished_at {
            doc.finished_at = Some(at);
        }
        if let Some(at) = self.disconnected_at {
            doc.disconnected_at = Some(at);
        }
    }
}

/// Aggregate row for suites; counts live suites only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteAgg {
    /// Row version
    pub version: i64,
    /// Live suites
    pub total_count: i64,
    /// Live suites in `running` status
    pub running_count: i64,
    /// Live suites in `finished` status
    pub finished_count: i64,
}

impl Aggregate<Suite> for SuiteAgg {
    fn account(&mut self, doc: &Suite, delta: i64) {
        if doc.entity.deleted {
            return;
        }
        self.total_count += delta;
        match doc.status {
            SuiteStatus::Running => self.running_count += delta,
            SuiteStatus::Finished => self.finished_count += delta,
            SuiteStatus::Created | SuiteStatus::Disconnected => {}
        }
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}
