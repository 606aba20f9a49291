//! LogRepo: log lines reported by running cases
//!
//! Indexes: `timestamp` (ordering), `case_id`, `deleted`. Lines of one case
//! come back from [`LogRepo::find_by_case`] ordered by `seq`.

use std::sync::Arc;
use suitestore_core::{LogAgg, LogLine, LogPatch, Result, Timestamp};
use suitestore_engine::{CollectionSchema, Database, DocumentCollection, Page};
use suitestore_storage::{IndexDef, IndexValue};

/// Ordering index name
pub const TIMESTAMP_INDEX: &str = "timestamp";
/// Owning case index name
pub const CASE_ID_INDEX: &str = "case_id";

fn timestamp(l: &LogLine) -> Option<IndexValue> {
    Some(l.timestamp.into())
}

fn case_id(l: &LogLine) -> Option<IndexValue> {
    Some(l.case_id.as_str().into())
}

/// Index layout of the logs collection
pub fn schema() -> CollectionSchema<LogLine> {
    CollectionSchema::new(IndexDef::new(TIMESTAMP_INDEX, timestamp))
        .with_index(IndexDef::new(CASE_ID_INDEX, case_id))
}

/// Repository for log lines
#[derive(Debug, Clone)]
pub struct LogRepo {
    logs: DocumentCollection<LogLine>,
}

impl LogRepo {
    /// Register the logs collection on `db`
    pub fn register(db: &Arc<Database>) -> Result<Self> {
        Ok(Self {
            logs: db.register(schema())?,
        })
    }

    /// The underlying collection, for multi-document transactions
    pub fn collection(&self) -> &DocumentCollection<LogLine> {
        &self.logs
    }

    /// Insert a log line, returning its id
    pub fn insert(&self, line: LogLine) -> Result<String> {
        Ok(self.logs.insert(line)?.entity.id)
    }

    /// Insert many lines in one transaction, returning their ids in order
    pub fn insert_batch<I>(&self, lines: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = LogLine>,
    {
        self.logs.database().transaction(|ctx| {
            lines
                .into_iter()
                .map(|line| -> Result<String> { Ok(self.logs.insert_in(ctx, line)?.entity.id) })
                .collect()
        })
    }

    /// Apply a partial update
    pub fn save(&self, id: &str, patch: LogPatch) -> Result<LogLine> {
        self.logs.set(id, patch)
    }

    /// Fetch a line by id
    pub fn find(&self, id: &str) -> Result<LogLine> {
        self.logs.get(id)
    }

    /// Substring match over id and line text
    pub fn fuzzy_find(&self, needle: &str, include_deleted: bool) -> Result<Vec<LogLine>> {
        self.logs.fuzzy_find(needle, include_deleted)
    }

    /// All lines, live ones first
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<LogLine>> {
        self.logs.find_all(include_deleted)
    }

    /// Lines of one case, by `seq`
    pub fn find_by_case(&self, case_id: &str, include_deleted: bool) -> Result<Vec<LogLine>> {
        let mut lines = self.logs.find_by(CASE_ID_INDEX, case_id, include_deleted)?;
        lines.sort_by_key(|l| l.seq);
        Ok(lines)
    }

    /// One page of lines, newest first
    pub fn page(&self, from_id: Option<&str>, limit: usize, include_deleted: bool) -> Result<Page<LogLine>> {
        self.logs.page(from_id, limit, include_deleted)
    }

    /// Soft-delete a line; false if it was already deleted
    pub fn delete(&self, id: &str, at: Timestamp) -> Result<bool> {
        self.logs.delete(id, at)
    }

    /// Soft-delete every live line, returning how many were deleted
    pub fn delete_all(&self, at: Timestamp) -> Result<usize> {
        self.logs.delete_all(at)
    }

    /// Stored aggregate row
    pub fn aggregate(&self) -> Result<LogAgg> {
        self.logs.aggregate()
    }
}
