//! CaseRepo: test cases of a suite
//!
//! Indexes: `created_at` (ordering), `suite_id`, `status` (live cases only)
//! and `deleted`.

use std::sync::Arc;
use suitestore_core::{Case, CaseAgg, CasePatch, CaseStatus, Error, Result, Timestamp};
use suitestore_engine::{CollectionSchema, Database, DocumentCollection, Page};
use suitestore_storage::{IndexDef, IndexValue};

/// Ordering index name
pub const CREATED_AT_INDEX: &str = "created_at";
/// Owning suite index name
pub const SUITE_ID_INDEX: &str = "suite_id";
/// Status index name
pub const STATUS_INDEX: &str = "status";

fn created_at(c: &Case) -> Option<IndexValue> {
    Some(c.created_at.into())
}

fn suite_id(c: &Case) -> Option<IndexValue> {
    Some(c.suite_id.as_str().into())
}

fn live_status(c: &Case) -> Option<IndexValue> {
    if c.entity.deleted {
        None
    } else {
        Some(c.status.as_str().into())
    }
}

/// Index layout of the cases collection
pub fn schema() -> CollectionSchema<Case> {
    CollectionSchema::new(IndexDef::new(CREATED_AT_INDEX, created_at))
        .with_index(IndexDef::new(SUITE_ID_INDEX, suite_id))
        .with_index(IndexDef::new(STATUS_INDEX, live_status))
}

/// Repository for test cases
#[derive(Debug, Clone)]
pub struct CaseRepo {
    cases: DocumentCollection<Case>,
}

impl CaseRepo {
    /// Register the cases collection on `db`
    pub fn register(db: &Arc<Database>) -> Result<Self> {
        Ok(Self {
            cases: db.register(schema())?,
        })
    }

    /// The underlying collection, for multi-document transactions
    pub fn collection(&self) -> &DocumentCollection<Case> {
        &self.cases
    }

    /// Insert a case, returning its id
    pub fn insert(&self, case: Case) -> Result<String> {
        Ok(self.cases.insert(case)?.entity.id)
    }

    /// Apply a partial update
    pub fn save(&self, id: &str, patch: CasePatch) -> Result<Case> {
        self.cases.set(id, patch)
    }

    /// Set the status
    pub fn save_status(&self, id: &str, status: CaseStatus) -> Result<Case> {
        self.cases.update(id, |c| {
            c.status = status;
            Ok(())
        })
    }

    /// Mark the case running
    pub fn start(&self, id: &str, at: Timestamp) -> Result<Case> {
        self.cases.update(id, |c| {
            c.status = CaseStatus::Running;
            c.started_at = Some(at);
            Ok(())
        })
    }

    /// Record the terminal status of the case
    ///
    /// Fails with `InvalidModel` unless `status` is terminal.
    pub fn finish(&self, id: &str, status: CaseStatus, at: Timestamp) -> Result<Case> {
        if !status.is_finished() {
            return Err(Error::invalid_model(format!(
                "'{}' is not a terminal case status",
                status.as_str()
            )));
        }
        self.cases.update(id, |c| {
            c.status = status;
            c.finished_at = Some(at);
            Ok(())
        })
    }

    /// Append attachment ids to the case
    pub fn save_attachments<I, S>(&self, id: &str, attachments: I) -> Result<Case>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patch = CasePatch {
            append_attachments: attachments.into_iter().map(Into::into).collect(),
            ..CasePatch::default()
        };
        self.cases.set(id, patch)
    }

    /// Fetch a case by id
    pub fn find(&self, id: &str) -> Result<Case> {
        self.cases.get(id)
    }

    /// Substring match over id and name
    pub fn fuzzy_find(&self, needle: &str, include_deleted: bool) -> Result<Vec<Case>> {
        self.cases.fuzzy_find(needle, include_deleted)
    }

    /// All cases, live ones first
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<Case>> {
        self.cases.find_all(include_deleted)
    }

    /// Cases of one suite
    pub fn find_by_suite(&self, suite_id: &str, include_deleted: bool) -> Result<Vec<Case>> {
        self.cases.find_by(SUITE_ID_INDEX, suite_id, include_deleted)
    }

    /// Live cases in `status`
    pub fn find_by_status(&self, status: CaseStatus) -> Result<Vec<Case>> {
        self.cases.find_by(STATUS_INDEX, status.as_str(), false)
    }

    /// One page of cases, newest `created_at` first
    pub fn page(&self, from_id: Option<&str>, limit: usize, include_deleted: bool) -> Result<Page<Case>> {
        self.cases.page(from_id, limit, include_deleted)
    }

    /// Soft-delete a case; false if it was already deleted
    pub fn delete(&self, id: &str, at: Timestamp) -> Result<bool> {
        self.cases.delete(id, at)
    }

    /// Soft-delete every live case, returning how many were deleted
    pub fn delete_all(&self, at: Timestamp) -> Result<usize> {
        self.cases.delete_all(at)
    }

    /// Stored aggregate row
    pub fn aggregate(&self) -> Result<CaseAgg> {
        self.cases.aggregate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suitestore_core::SequentialIds;

    fn repo() -> CaseRepo {
        let db = Database::builder()
            .id_generator(Arc::new(SequentialIds::new()))
            .ephemeral()
            .unwrap();
        CaseRepo::register(&db).unwrap()
    }

    #[test]
    fn test_start_then_finish() {
        let repo = repo();
        let id = repo.insert(Case::new("s1", "login", Timestamp::EPOCH)).unwrap();

        let running = repo.start(&id, Timestamp::from_millis(5)).unwrap();
        assert_eq!(running.status, CaseStatus::Running);
        assert_eq!(repo.aggregate().unwrap().running_count, 1);

        let done = repo
            .finish(&id, CaseStatus::Failed, Timestamp::from_millis(8))
            .unwrap();
        assert_eq!(done.finished_at, Some(Timestamp::from_millis(8)));
        assert_eq!(done.entity.version, 2);

        let agg = repo.aggregate().unwrap();
        assert_eq!(agg.running_count, 0);
        assert_eq!(agg.finished_count, 1);
    }

    #[test]
    fn test_finish_requires_terminal_status() {
        let repo = repo();
        let id = repo.insert(Case::new("s1", "x", Timestamp::EPOCH)).unwrap();
        let err = repo
            .finish(&id, CaseStatus::Running, Timestamp::EPOCH)
            .unwrap_err();
        assert!(err.is_invalid_model());
        assert_eq!(repo.find(&id).unwrap().entity.version, 0);
    }

    #[test]
    fn test_save_attachments_appends() {
        let repo = repo();
        let id = repo.insert(Case::new("s1", "x", Timestamp::EPOCH)).unwrap();
        repo.save_attachments(&id, ["a1"]).unwrap();
        let case = repo.save_attachments(&id, ["a2", "a3"]).unwrap();
        assert_eq!(case.attachments, vec!["a1", "a2", "a3"]);
        assert_eq!(case.entity.version, 2);

        let empty: [&str; 0] = [];
        assert!(repo.save_attachments(&id, empty).unwrap_err().is_invalid_model());
    }

    #[test]
    fn test_find_by_suite() {
        let repo = repo();
        repo.insert(Case::new("s1", "a", Timestamp::EPOCH)).unwrap();
        repo.insert(Case::new("s2", "b", Timestamp::EPOCH)).unwrap();
        let c = repo.insert(Case::new("s1", "c", Timestamp::EPOCH)).unwrap();
        repo.delete(&c, Timestamp::from_millis(1)).unwrap();

        let names: Vec<_> = repo
            .find_by_suite("s1", false)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(repo.find_by_suite("s1", true).unwrap().len(), 2);
    }
}
