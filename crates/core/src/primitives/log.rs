//! Log line documents

use crate::contract::Timestamp;
use crate::error::{Error, Result};
use crate::traits::{Aggregate, Document, Patch};
use crate::types::{Collection, Entity};
use serde::{Deserialize, Serialize};

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Very verbose
    Trace,
    /// Debugging output
    Debug,
    /// Regular output
    #[default]
    Info,
    /// Something looked wrong
    Warn,
    /// Something failed
    Error,
}

/// One line of output captured from a running case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Base fields
    #[serde(flatten)]
    pub entity: Entity,
    /// Owning case
    pub case_id: String,
    /// Position within the case's output
    #[serde(default)]
    pub seq: i64,
    /// Severity
    #[serde(default)]
    pub level: LogLevel,
    /// The text
    pub line: String,
    /// When the line was emitted; orders log pages
    #[serde(default)]
    pub timestamp: Timestamp,
}

impl LogLine {
    /// Create an `info` line
    pub fn new(
        case_id: impl Into<String>,
        seq: i64,
        line: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            entity: Entity::default(),
            case_id: case_id.into(),
            seq,
            level: LogLevel::Info,
            line: line.into(),
            timestamp,
        }
    }

    /// Set the severity
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

impl Document for LogLine {
    const COLLECTION: Collection = Collection::Logs;
    type Patch = LogPatch;
    type Agg = LogAgg;

    fn entity(&self) -> &Entity {
        &self.entity
    }

    fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    fn validate(&self) -> Result<()> {
        if self.case_id.is_empty() {
            return Err(Error::invalid_model("log line must reference a case"));
        }
        if self.seq < 0 {
            return Err(Error::invalid_model(format!(
                "log seq must be non-negative, got {}",
                self.seq
            )));
        }
        Ok(())
    }

    fn search_text(&self) -> &str {
        &self.line
    }
}

/// Partial update for a log line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPatch {
    /// New severity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// New text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

impl Patch<LogLine> for LogPatch {
    fn is_empty(&self) -> bool {
        self.level.is_none() && self.line.is_none()
    }

    fn apply_to(self, doc: &mut LogLine) {
        if let Some(level) = self.level {
            doc.level = level;
        }
        if let Some(line) = self.line {
            doc.line = line;
        }
    }
}

/// Aggregate row for log lines; counts live lines only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogAgg {
    /// Row version
    pub version: i64,
    /// Live lines
    pub total_count: i64,
    /// Live lines at `error` level
    pub error_count: i64,
}

impl Aggregate<LogLine> for LogAgg {
    fn account(&mut self, doc: &LogLine, delta: i64) {
        if doc.entity.deleted {
            return;
        }
        self.total_count += delta;
        if doc.level == LogLevel::Error {
            self.error_count += delta;
        }
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_validation() {
        assert!(LogLine::new("c1", 0, "hello", Timestamp::EPOCH).validate().is_ok());
        assert!(LogLine::new("", 0, "hello", Timestamp::EPOCH).validate().is_err());
        assert!(LogLine::new("c1", -1, "hello", Timestamp::EPOCH).validate().is_err());
    }

    #[test]
    fn test_log_agg_counts_errors() {
        let a = LogLine::new("c", 0, "ok", Timestamp::EPOCH);
        let b = LogLine::new("c", 1, "boom", Timestamp::EPOCH).with_level(LogLevel::Error);
        let agg = LogAgg::from_documents([&a, &b]);
        assert_eq!(agg.total_count, 2);
        assert_eq!(agg.error_count, 1);
    }

    #[test]
    fn test_log_level_serde() {
        let json = serde_json::to_string(&LogLevel::Warn).unwrap();
        assert_eq!(json, "\"warn\"");
    }
}
