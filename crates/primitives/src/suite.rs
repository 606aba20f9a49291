//! SuiteRepo: suite runs and their live status counts
//!
//! ## Indexes
//!
//! - `started_at`: ordering index for pages, newest first
//! - `status`: live suites only, serves the running/finished counts
//! - `deleted`: soft-delete flag, serves `find_all`
//!
//! ## Pages
//!
//! A [`SuitePage`] carries the running/finished counts (equality scans over
//! `status`) and the stored [`SuiteAgg`], read in the same snapshot as the
//! page items.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use suitestore_core::{Result, Suite, SuiteAgg, SuitePatch, SuiteResult, SuiteStatus, Timestamp};
use suitestore_engine::{CollectionSchema, Database, DocumentCollection};
use suitestore_storage::{IndexDef, IndexValue};

/// Ordering index name
pub const STARTED_AT_INDEX: &str = "started_at";
/// Status index name
pub const STATUS_INDEX: &str = "status";

fn started_at(s: &Suite) -> Option<IndexValue> {
    Some(s.started_at.into())
}

fn live_status(s: &Suite) -> Option<IndexValue> {
    if s.entity.deleted {
        None
    } else {
        Some(s.status.as_str().into())
    }
}

/// Index layout of the suites collection
pub fn schema() -> CollectionSchema<Suite> {
    CollectionSchema::new(IndexDef::new(STARTED_AT_INDEX, started_at))
        .with_index(IndexDef::new(STATUS_INDEX, live_status))
}

/// One page of suites plus live counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuitePage {
    /// Suites, newest `started_at` first
    pub suites: Vec<Suite>,
    /// Cursor for the next page; absent on the last page
    pub next_id: Option<String>,
    /// Live suites in `running` status
    pub running_count: u64,
    /// Live suites in `finished` status
    pub finished_count: u64,
    /// Stored aggregate row
    pub agg: SuiteAgg,
}

/// Repository for test suites
#[derive(Debug, Clone)]
pub struct SuiteRepo {
    suites: DocumentCollection<Suite>,
}

impl SuiteRepo {
    /// Register the suites collection on `db`
    pub fn register(db: &Arc<Database>) -> Result<Self> {
        Ok(Self {
            suites: db.register(schema())?,
        })
    }

    /// The underlying collection, for multi-document transactions
    pub fn collection(&self) -> &DocumentCollection<Suite> {
        &self.suites
    }

    /// Insert a suite, returning its id
    pub fn insert(&self, suite: Suite) -> Result<String> {
        Ok(self.suites.insert(suite)?.entity.id)
    }

    /// Apply a partial update
    pub fn save(&self, id: &str, patch: SuitePatch) -> Result<Suite> {
        self.suites.set(id, patch)
    }

    /// Set the status
    pub fn save_status(&self, id: &str, status: SuiteStatus) -> Result<Suite> {
        self.suites.update(id, |s| {
            s.status = status;
            Ok(())
        })
    }

    /// Mark the suite finished with `result`
    pub fn finish(&self, id: &str, result: SuiteResult, at: Timestamp) -> Result<Suite> {
        self.suites.update(id, |s| {
            s.status = SuiteStatus::Finished;
            s.result = result;
            s.finished_at = Some(at);
            Ok(())
        })
    }

    /// Mark the reporting client as gone
    pub fn disconnect(&self, id: &str, at: Timestamp) -> Result<Suite> {
        self.suites.update(id, |s| {
            s.status = SuiteStatus::Disconnected;
            s.disconnected_at = Some(at);
            Ok(())
        })
    }

    /// Fetch a suite by id
    pub fn find(&self, id: &str) -> Result<Suite> {
        self.suites.get(id)
    }

    /// Substring match over id and name
    pub fn fuzzy_find(&self, needle: &str, include_deleted: bool) -> Result<Vec<Suite>> {
        self.suites.fuzzy_find(needle, include_deleted)
    }

    /// All suites, live ones first
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<Suite>> {
        self.suites.find_all(include_deleted)
    }

    /// Live suites in `status`
    pub fn find_by_status(&self, status: SuiteStatus) -> Result<Vec<Suite>> {
        self.suites.find_by(STATUS_INDEX, status.as_str(), false)
    }

    /// One page of suites with counts from the same snapshot
    pub fn page(&self, from_id: Option<&str>, limit: usize, include_deleted: bool) -> Result<SuitePage> {
        self.suites.read(|view| {
            let page = self.suites.page_in(view, from_id, limit, include_deleted)?;
            let running_count =
                self.suites
                    .count_in(view, STATUS_INDEX, &SuiteStatus::Running.as_str().into())?;
            let finished_count =
                self.suites
                    .count_in(view, STATUS_INDEX, &SuiteStatus::Finished.as_str().into())?;
            Ok(SuitePage {
                suites: page.items,
                next_id: page.next_id,
                running_count,
                finished_count,
                agg: self.suites.aggregate_in(view)?,
            })
        })
    }

    /// Soft-delete a suite; false if it was already deleted
    pub fn delete(&self, id: &str, at: Timestamp) -> Result<bool> {
        self.suites.delete(id, at)
    }

    /// Soft-delete every live suite, returning how many were deleted
    pub fn delete_all(&self, at: Timestamp) -> Result<usize> {
        self.suites.delete_all(at)
    }

    /// Stored aggregate row
    pub fn aggregate(&self) -> Result<SuiteAgg> {
        self.suites.aggregate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suitestore_core::SequentialIds;

    fn repo() -> SuiteRepo {
        let db = Database::builder()
            .id_generator(Arc::new(SequentialIds::new()))
            .ephemeral()
            .unwrap();
        SuiteRepo::register(&db).unwrap()
    }

    #[test]
    fn test_status_index_excludes_deleted() {
        let repo = repo();
        let id = repo
            .insert(Suite::new("a", Timestamp::EPOCH).with_status(SuiteStatus::Running))
            .unwrap();
        assert_eq!(repo.find_by_status(SuiteStatus::Running).unwrap().len(), 1);
        repo.delete(&id, Timestamp::from_millis(1)).unwrap();
        assert!(repo.find_by_status(SuiteStatus::Running).unwrap().is_empty());
        assert_eq!(repo.page(None, 10, true).unwrap().running_count, 0);
    }

    #[test]
    fn test_finish_and_disconnect() {
        let repo = repo();
        let a = repo.insert(Suite::new("a", Timestamp::EPOCH)).unwrap();
        let b = repo.insert(Suite::new("b", Timestamp::EPOCH)).unwrap();

        let finished = repo
            .finish(&a, SuiteResult::Passed, Timestamp::from_millis(10))
            .unwrap();
        assert_eq!(finished.status, SuiteStatus::Finished);
        assert_eq!(finished.result, SuiteResult::Passed);
        assert_eq!(finished.finished_at, Some(Timestamp::from_millis(10)));

        let gone = repo.disconnect(&b, Timestamp::from_millis(11)).unwrap();
        assert_eq!(gone.status, SuiteStatus::Disconnected);
        assert_eq!(gone.disconnected_at, Some(Timestamp::from_millis(11)));
        assert_eq!(gone.entity.version, 1);
    }
}
